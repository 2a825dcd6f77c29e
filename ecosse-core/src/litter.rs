//! Plant litter inputs
//!
//! Litter can come from two places:
//!
//! - an Excel workbook holding one pre-extracted annual series, used for every coordinate,
//! - a gridded ORCHIDEE dataset of total biomass litter carbon per plant functional type.
//!
//! Gridded values are daily fluxes in gC m⁻² day⁻¹ and are converted to the annual
//! kgC ha⁻¹ yr⁻¹ ECOSSE expects using [`GC_M2_DAY_TO_KGC_HA_YR`].
//!
//! ```rust
//! use ecosse_core::litter::PlantFunctionalType;
//!
//! let pft: PlantFunctionalType = "C3GrassTemperate".parse().unwrap();
//! assert_eq!(pft.code(), "10");
//! assert_eq!(pft.index(), 9);
//! ```

use crate::context::ResolverContext;
use crate::errors::{EcosseError, EcosseResult};
use crate::resolution::{Resolution, SkipReason};
use crate::spatial::{Coordinate, GridAxis, GridCell};
use crate::timeseries::{FloatValue, TimeSeries, Year};
use ndarray::{s, Array4};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Converts gC m⁻² day⁻¹ to kgC ha⁻¹ yr⁻¹: 10000 m² per hectare, 365 days, 1000 g per kg.
pub const GC_M2_DAY_TO_KGC_HA_YR: FloatValue = 10000.0 * 365.0 / 1000.0;

/// ORCHIDEE plant functional types, in dataset order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlantFunctionalType {
    #[default]
    SoilBareGlobal,
    BroadLeavedEvergreenTropical,
    BroadLeavedRaingreenTropical,
    NeedleleafEvergreenTemperate,
    BroadLeavedEvergreenTemperate,
    BroadLeavedSummergreenTemperate,
    NeedleleafEvergreenBoreal,
    BroadLeavedSummergreenBoreal,
    LarixSpBoreal,
    C3GrassTemperate,
    C4GrassTemperate,
    C3AgricultureTemperate,
    C4AgricultureTemperate,
    C3GrassTropical,
    C3GrassBoreal,
}

impl PlantFunctionalType {
    pub const ALL: [PlantFunctionalType; 15] = [
        Self::SoilBareGlobal,
        Self::BroadLeavedEvergreenTropical,
        Self::BroadLeavedRaingreenTropical,
        Self::NeedleleafEvergreenTemperate,
        Self::BroadLeavedEvergreenTemperate,
        Self::BroadLeavedSummergreenTemperate,
        Self::NeedleleafEvergreenBoreal,
        Self::BroadLeavedSummergreenBoreal,
        Self::LarixSpBoreal,
        Self::C3GrassTemperate,
        Self::C4GrassTemperate,
        Self::C3AgricultureTemperate,
        Self::C4AgricultureTemperate,
        Self::C3GrassTropical,
        Self::C3GrassBoreal,
    ];

    /// Position along the PFT dimension of the litter dataset.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Two digit code, `"01"` to `"15"`.
    pub fn code(&self) -> String {
        format!("{:02}", self.index() + 1)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SoilBareGlobal => "SoilBareGlobal",
            Self::BroadLeavedEvergreenTropical => "BroadLeavedEvergreenTropical",
            Self::BroadLeavedRaingreenTropical => "BroadLeavedRaingreenTropical",
            Self::NeedleleafEvergreenTemperate => "NeedleleafEvergreenTemperate",
            Self::BroadLeavedEvergreenTemperate => "BroadLeavedEvergreenTemperate",
            Self::BroadLeavedSummergreenTemperate => "BroadLeavedSummergreenTemperate",
            Self::NeedleleafEvergreenBoreal => "NeedleleafEvergreenBoreal",
            Self::BroadLeavedSummergreenBoreal => "BroadLeavedSummergreenBoreal",
            Self::LarixSpBoreal => "LarixSpBoreal",
            Self::C3GrassTemperate => "C3GrassTemperate",
            Self::C4GrassTemperate => "C4GrassTemperate",
            Self::C3AgricultureTemperate => "C3AgricultureTemperate",
            Self::C4AgricultureTemperate => "C4AgricultureTemperate",
            Self::C3GrassTropical => "C3GrassTropical",
            Self::C3GrassBoreal => "C3GrassBoreal",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let number: usize = code.trim().parse().ok()?;
        number
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index).copied())
    }
}

impl FromStr for PlantFunctionalType {
    type Err = EcosseError;

    /// Accepts either the name or the two digit code.
    fn from_str(s: &str) -> EcosseResult<Self> {
        Self::ALL
            .iter()
            .find(|pft| pft.name() == s.trim())
            .copied()
            .or_else(|| Self::from_code(s))
            .ok_or_else(|| {
                EcosseError::InvalidConfig(format!("unknown plant functional type '{s}'"))
            })
    }
}

impl fmt::Display for PlantFunctionalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Litter for one coordinate, in kgC ha⁻¹ yr⁻¹.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantInputs {
    pub series: TimeSeries,
    pub average: FloatValue,
    /// Lat/lon of the dataset cell used, when taken from a gridded dataset.
    pub source_cell: Option<(f64, f64)>,
}

/// Gridded litter carbon with dimensions `(time, pft, lat, lon)`.
#[derive(Debug, Clone)]
pub struct LitterGrid {
    lats: GridAxis,
    lons: GridAxis,
    start_year: Year,
    /// gC m⁻² day⁻¹
    values: Array4<FloatValue>,
}

impl LitterGrid {
    pub fn new(
        lats: GridAxis,
        lons: GridAxis,
        start_year: Year,
        values: Array4<FloatValue>,
    ) -> EcosseResult<Self> {
        let (ntimes, npfts, nlats, nlons) = values.dim();
        if nlats != lats.len() || nlons != lons.len() {
            return Err(EcosseError::format(
                "TOTAL_BM_LITTER_c",
                format!(
                    "shape ({nlats}, {nlons}) does not match {} lats and {} lons",
                    lats.len(),
                    lons.len()
                ),
            ));
        }
        if ntimes == 0 {
            return Err(EcosseError::format("TOTAL_BM_LITTER_c", "no time steps"));
        }
        if npfts < PlantFunctionalType::ALL.len() {
            warn!(
                npfts,
                "Litter dataset has fewer plant functional types than expected"
            );
        }
        Ok(Self {
            lats,
            lons,
            start_year,
            values,
        })
    }

    pub fn nyears(&self) -> usize {
        self.values.dim().0
    }

    pub fn start_year(&self) -> Year {
        self.start_year
    }

    /// Dataset size, as `lats: N\tlons: M`.
    pub fn extent_summary(&self) -> String {
        format!("lats: {}\tlons: {}", self.lats.len(), self.lons.len())
    }

    /// Nearest grid cell, or `None` when the point is outside the dataset's lat/lon range.
    pub fn nearest_cell(&self, lat: f64, lon: f64) -> Option<GridCell> {
        let inside = (self.lats.min()..=self.lats.max()).contains(&lat)
            && (self.lons.min()..=self.lons.max()).contains(&lon);
        inside.then(|| GridCell::new(self.lats.nearest_index(lat), self.lons.nearest_index(lon)))
    }

    /// Converted litter series at the cell nearest to `coordinate`.
    pub fn plant_inputs(
        &self,
        coordinate: &Coordinate,
        pft: PlantFunctionalType,
    ) -> EcosseResult<Resolution<PlantInputs>> {
        let Some(cell) = self.nearest_cell(coordinate.lat, coordinate.lon) else {
            warn!(
                id = %coordinate.id,
                lat = coordinate.lat,
                lon = coordinate.lon,
                lat_range = %format!("{} {}", self.lats.min(), self.lats.max()),
                lon_range = %format!("{} {}", self.lons.min(), self.lons.max()),
                "Coordinate is outside limits of ORCHIDEE dataset"
            );
            return Ok(Resolution::Skipped(SkipReason::OutOfBounds {
                dataset: "ORCHIDEE".to_string(),
            }));
        };
        if pft.index() >= self.values.dim().1 {
            return Err(EcosseError::format(
                "TOTAL_BM_LITTER_c",
                format!("plant functional type {pft} is not in the dataset"),
            ));
        }

        let values: Vec<FloatValue> = self
            .values
            .slice(s![.., pft.index(), cell.row, cell.col])
            .iter()
            .map(|value| value * GC_M2_DAY_TO_KGC_HA_YR)
            .collect();
        if values.iter().all(|value| value.is_nan()) {
            warn!(id = %coordinate.id, %pft, "No litter values in ORCHIDEE cell");
            return Ok(Resolution::Skipped(SkipReason::NoData {
                what: "litter values".to_string(),
            }));
        }

        let source_cell = (
            self.lats.get(cell.row).unwrap_or(f64::NAN),
            self.lons.get(cell.col).unwrap_or(f64::NAN),
        );
        debug!(
            id = %coordinate.id,
            study = %format!("{} {}", coordinate.lat, coordinate.lon),
            cell = %format!("{} {}", source_cell.0, source_cell.1),
            "Matched ORCHIDEE cell"
        );

        let series = TimeSeries::sequential(self.start_year, values)?;
        Ok(Resolution::Resolved(PlantInputs {
            average: series.mean(),
            series,
            source_cell: Some(source_cell),
        }))
    }
}

/// Where litter inputs are taken from.
#[derive(Debug, Clone)]
pub enum LitterSource {
    /// A single series from a workbook, already in kgC ha⁻¹ yr⁻¹.
    Excel(TimeSeries),
    Gridded(Arc<LitterGrid>),
}

impl LitterSource {
    /// Short description for reports.
    pub fn summary(&self) -> String {
        match self {
            LitterSource::Excel(series) => format!("records: {}", series.len()),
            LitterSource::Gridded(grid) => grid.extent_summary(),
        }
    }
}

/// Resolves the plant inputs of a coordinate.
#[derive(Debug, Clone)]
pub struct LitterResolver {
    source: LitterSource,
}

impl LitterResolver {
    pub fn new(source: LitterSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &LitterSource {
        &self.source
    }

    pub fn resolve(
        &self,
        coordinate: &Coordinate,
        context: &ResolverContext,
    ) -> EcosseResult<Resolution<PlantInputs>> {
        match &self.source {
            LitterSource::Excel(series) => Ok(Resolution::Resolved(PlantInputs {
                series: series.clone(),
                average: series.mean(),
                source_cell: None,
            })),
            LitterSource::Gridded(grid) => grid.plant_inputs(coordinate, context.pft),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResolverContext;
    use is_close::is_close;
    use ndarray::Array4;

    fn grid(value: f64) -> LitterGrid {
        let lats = GridAxis::regular(50.25, 0.5, 4).unwrap();
        let lons = GridAxis::regular(-2.25, 0.5, 3).unwrap();
        let mut values = Array4::<f64>::zeros((3, 15, 4, 3));
        values.slice_mut(s![.., 9, 1, 2]).fill(value);
        LitterGrid::new(lats, lons, 2001, values).unwrap()
    }

    #[test]
    fn conversion_factor() {
        assert_eq!(GC_M2_DAY_TO_KGC_HA_YR, 3650.0);
    }

    #[test]
    fn pft_codes_and_names() {
        assert_eq!(PlantFunctionalType::ALL.len(), 15);
        assert_eq!(PlantFunctionalType::default().code(), "01");
        assert_eq!(PlantFunctionalType::C3GrassBoreal.code(), "15");
        assert_eq!(
            "05".parse::<PlantFunctionalType>().unwrap(),
            PlantFunctionalType::BroadLeavedEvergreenTemperate
        );
        assert_eq!(
            "LarixSpBoreal".parse::<PlantFunctionalType>().unwrap().index(),
            8
        );
        assert!("16".parse::<PlantFunctionalType>().is_err());
        assert!("00".parse::<PlantFunctionalType>().is_err());
        assert!("Cactus".parse::<PlantFunctionalType>().is_err());
    }

    #[test]
    fn gridded_litter_is_converted() {
        let context = ResolverContext::for_tests()
            .with_pft(PlantFunctionalType::C3GrassTemperate);
        let resolver = LitterResolver::new(LitterSource::Gridded(Arc::new(grid(1.0))));
        let inputs = resolver
            .resolve(&Coordinate::new(50.8, -1.3, "a"), &context)
            .unwrap()
            .resolved()
            .unwrap();
        assert_eq!(inputs.series.years(), &[2001, 2002, 2003]);
        assert!(inputs.series.values().iter().all(|v| *v == 3650.0));
        assert!(is_close!(inputs.average, 3650.0));
        assert_eq!(inputs.source_cell, Some((50.75, -1.25)));
    }

    #[test]
    fn outside_dataset_is_out_of_bounds() {
        let context = ResolverContext::for_tests();
        let resolver = LitterResolver::new(LitterSource::Gridded(Arc::new(grid(1.0))));
        let result = resolver
            .resolve(&Coordinate::new(60.0, -1.3, "a"), &context)
            .unwrap();
        assert_eq!(
            result,
            Resolution::Skipped(SkipReason::OutOfBounds {
                dataset: "ORCHIDEE".to_string()
            })
        );
    }

    #[test]
    fn masked_cell_has_no_data() {
        let context = ResolverContext::for_tests()
            .with_pft(PlantFunctionalType::C3GrassTemperate);
        let resolver = LitterResolver::new(LitterSource::Gridded(Arc::new(grid(f64::NAN))));
        let result = resolver
            .resolve(&Coordinate::new(50.8, -1.3, "a"), &context)
            .unwrap();
        assert!(!result.is_resolved());
    }

    #[test]
    fn excel_series_serves_every_coordinate() {
        let series = TimeSeries::sequential(1990, vec![1.0, 3.0]).unwrap();
        let resolver = LitterResolver::new(LitterSource::Excel(series.clone()));
        let context = ResolverContext::for_tests();
        for coordinate in [Coordinate::new(0.0, 0.0, "a"), Coordinate::new(80.0, 170.0, "b")] {
            let inputs = resolver.resolve(&coordinate, &context).unwrap().resolved().unwrap();
            assert_eq!(inputs.series, series);
            assert_eq!(inputs.average, 2.0);
        }
        assert_eq!(resolver.source().summary(), "records: 2");
    }

    #[test]
    fn extent_summary() {
        assert_eq!(grid(0.0).extent_summary(), "lats: 4\tlons: 3");
    }

    #[test]
    fn rejects_mismatched_axes() {
        let lats = GridAxis::regular(0.0, 1.0, 2).unwrap();
        let lons = GridAxis::regular(0.0, 1.0, 2).unwrap();
        assert!(LitterGrid::new(lats, lons, 2000, Array4::zeros((1, 15, 3, 2))).is_err());
    }
}
