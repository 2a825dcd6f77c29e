//! Soil resolution against the Harmonized World Soil Database
//!
//! HWSD identifies each 30 arc-second cell by a map unit (`mu_global`). A map unit is
//! made up of one or more soil components, each covering a share of the unit. For a
//! coordinate the [`SoilResolver`] reads the map units around the point from a
//! [`SoilGrid`], looks up their soil records and reduces them to a single
//! [`SoilRecord`] according to a [`SoilPolicy`].
//!
//! Both policies are deterministic. Map units are visited in ascending `mu_global` order
//! and the first unit with the greatest coverage wins, so ties go to the lowest
//! `mu_global`.

use crate::context::ResolverContext;
use crate::errors::EcosseResult;
use crate::resolution::{Resolution, SkipReason};
use crate::spatial::{BoundingBox, Coordinate, GridCell};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// HWSD map unit identifier.
pub type MuGlobal = u32;

/// Properties of one soil layer, as listed in the HWSD attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SoilLayer {
    /// Organic carbon, % weight
    pub organic_carbon: f64,
    /// Bulk density, kg/dm3
    pub bulk_density: f64,
    pub ph: f64,
    /// Clay fraction, % weight
    pub clay: f64,
    /// Silt fraction, % weight
    pub silt: f64,
    /// Sand fraction, % weight
    pub sand: f64,
}

/// A soil type making up part of a map unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilComponent {
    /// Percentage of the map unit covered by this component.
    pub share: f64,
    /// 0-30 cm layer
    pub topsoil: SoilLayer,
    /// 30-100 cm layer, absent for shallow soils
    pub subsoil: Option<SoilLayer>,
}

/// Soil description of one map unit, weighted by its coverage of the queried area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilRecord {
    pub mu_global: MuGlobal,
    /// Fraction of the queried area covered by this map unit, in `[0, 1]`.
    pub weight: f64,
    pub components: Vec<SoilComponent>,
}

impl SoilRecord {
    /// The component with the largest share; the first listed wins ties.
    pub fn dominant_component(&self) -> Option<&SoilComponent> {
        self.components
            .iter()
            .fold(None, |best: Option<&SoilComponent>, component| match best {
                Some(b) if b.share >= component.share => Some(b),
                _ => Some(component),
            })
    }

    /// A copy of this record holding only its dominant component.
    pub fn with_dominant_component(&self) -> SoilRecord {
        SoilRecord {
            mu_global: self.mu_global,
            weight: self.weight,
            components: self.dominant_component().cloned().into_iter().collect(),
        }
    }
}

/// How several map units found around a coordinate are reduced to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilPolicy {
    /// Keep the unit with the greatest coverage and give it a weight of 1.0.
    #[default]
    Dominant,
    /// Keep the unit with the greatest coverage and give it the summed weight of all units.
    HighestCoverage,
}

impl fmt::Display for SoilPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoilPolicy::Dominant => write!(f, "dominant"),
            SoilPolicy::HighestCoverage => write!(f, "highest_coverage"),
        }
    }
}

/// Soil records for one coordinate, ordered by ascending `mu_global`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SoilRecordSet {
    records: Vec<SoilRecord>,
}

impl SoilRecordSet {
    pub fn new(mut records: Vec<SoilRecord>) -> Self {
        records.sort_by_key(|record| record.mu_global);
        Self { records }
    }

    pub fn records(&self) -> &[SoilRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.records.iter().map(|record| record.weight).sum()
    }

    /// Map unit to weight.
    pub fn weights(&self) -> BTreeMap<MuGlobal, f64> {
        self.records
            .iter()
            .map(|record| (record.mu_global, record.weight))
            .collect()
    }

    fn highest_coverage(&self) -> Option<&SoilRecord> {
        self.records
            .iter()
            .fold(None, |best: Option<&SoilRecord>, record| match best {
                Some(b) if b.weight >= record.weight => Some(b),
                _ => Some(record),
            })
    }

    /// Reduce to a single map unit according to `policy`.
    ///
    /// An empty set stays empty.
    pub fn simplify(&self, policy: SoilPolicy) -> SoilRecordSet {
        let Some(best) = self.highest_coverage() else {
            return SoilRecordSet::default();
        };
        let weight = match policy {
            SoilPolicy::Dominant => 1.0,
            SoilPolicy::HighestCoverage => self.total_weight(),
        };
        SoilRecordSet {
            records: vec![SoilRecord {
                weight,
                ..best.clone()
            }],
        }
    }
}

/// Map units read from the soil raster for a bounding box.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MuGlobalCounts {
    /// Number of raster cells per map unit, excluding no-data cells.
    pub counts: BTreeMap<MuGlobal, usize>,
    /// Total number of raster values read, no-data cells included.
    pub values_read: usize,
    /// Upper-left raster cell of the box.
    pub origin: GridCell,
    pub nrows: usize,
    pub ncols: usize,
}

impl MuGlobalCounts {
    /// Fraction of the values read belonging to each map unit.
    pub fn coverages(&self) -> BTreeMap<MuGlobal, f64> {
        let total = self.values_read.max(1) as f64;
        self.counts
            .iter()
            .map(|(mu_global, count)| (*mu_global, *count as f64 / total))
            .collect()
    }
}

/// Access to a soil map raster and its attribute table.
pub trait SoilGrid: Send + Sync {
    /// Count the map units of every raster cell inside `bbox`.
    fn read_bbox_mu_globals(&self, bbox: &BoundingBox) -> EcosseResult<MuGlobalCounts>;

    /// Soil records for the given map units and coverages.
    ///
    /// Units missing from the attribute table are left out.
    fn soil_records(&self, coverages: &BTreeMap<MuGlobal, f64>) -> EcosseResult<Vec<SoilRecord>>;
}

/// Soil for one coordinate after simplification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSoil {
    pub records: SoilRecordSet,
    /// Raster cell holding the coordinate.
    pub grid_cell: GridCell,
    pub values_read: usize,
}

/// Resolves the soil records of a coordinate.
pub struct SoilResolver {
    grid: Arc<dyn SoilGrid>,
}

impl SoilResolver {
    pub fn new(grid: Arc<dyn SoilGrid>) -> Self {
        Self { grid }
    }

    /// Resolve the soil at a single point.
    ///
    /// Returns [`SkipReason::NoData`] when no map unit covers the point and
    /// [`SkipReason::NoRecords`] when none of the map units found have soil records.
    pub fn resolve(
        &self,
        coordinate: &Coordinate,
        context: &ResolverContext,
    ) -> EcosseResult<Resolution<ResolvedSoil>> {
        let bbox = BoundingBox::point(coordinate.lat, coordinate.lon);
        let counts = self.grid.read_bbox_mu_globals(&bbox)?;
        if counts.counts.is_empty() {
            return Ok(Resolution::Skipped(SkipReason::NoData {
                what: "soil map units".to_string(),
            }));
        }
        debug!(
            id = %coordinate.id,
            values_read = counts.values_read,
            nrows = counts.nrows,
            ncols = counts.ncols,
            mu_globals = counts.counts.len(),
            "Read HWSD map units"
        );

        let records = self.grid.soil_records(&counts.coverages())?;
        let records = SoilRecordSet::new(
            records
                .iter()
                .map(SoilRecord::with_dominant_component)
                .collect(),
        );
        if records.is_empty() {
            return Ok(Resolution::Skipped(SkipReason::NoRecords {
                what: "soil map units".to_string(),
            }));
        }

        Ok(Resolution::Resolved(ResolvedSoil {
            records: records.simplify(context.soil_policy),
            grid_cell: counts.origin,
            values_read: counts.values_read,
        }))
    }
}
