//! Access to gridded weather resources
//!
//! A weather resource holds monthly precipitation and mean air temperature on a
//! latitude/longitude grid, split into a historic and a future period. Values are
//! returned in the resource's native units; [`super::ResourceFamily::convert`] turns
//! them into mm/month and °C.

use crate::errors::{EcosseError, EcosseResult};
use crate::spatial::{BoundingBox, GridAxis, GridCell};
use crate::timeseries::{Year, YearRange};
use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Historic,
    Future,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Historic => write!(f, "historic"),
            Period::Future => write!(f, "future"),
        }
    }
}

/// Inclusive index ranges of a block of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    pub rows: (usize, usize),
    pub cols: (usize, usize),
}

impl GridWindow {
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (self.rows.0..=self.rows.1)
            .flat_map(move |row| (self.cols.0..=self.cols.1).map(move |col| GridCell::new(row, col)))
    }

    pub fn len(&self) -> usize {
        (self.rows.1 - self.rows.0 + 1) * (self.cols.1 - self.cols.0 + 1)
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Grid windows enclosing an area of interest in each period's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AoiIndices {
    pub future: GridWindow,
    pub historic: GridWindow,
}

impl AoiIndices {
    pub fn window(&self, period: Period) -> GridWindow {
        match period {
            Period::Historic => self.historic,
            Period::Future => self.future,
        }
    }
}

/// Monthly values at one grid cell in the resource's native units.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCellSeries {
    pub lat: f64,
    pub lon: f64,
    pub precipitation: Vec<f64>,
    pub temperature: Vec<f64>,
}

/// Everything read from one period for a grid window.
///
/// Series start in January of `start_year`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClimate {
    pub start_year: Year,
    pub cells: BTreeMap<GridCell, RawCellSeries>,
}

/// A named weather resource.
pub trait ClimateDataset: Send + Sync {
    fn name(&self) -> &str;

    /// Area covered by every period of the resource.
    fn declared_extent(&self) -> BoundingBox;

    /// Years held for `period`.
    fn period_years(&self, period: Period) -> YearRange;

    /// Windows of each period's grid enclosing `bbox`.
    fn grid_indices(&self, bbox: &BoundingBox) -> EcosseResult<AoiIndices>;

    fn read_period(&self, period: Period, window: &GridWindow) -> EcosseResult<RawClimate>;
}

/// One period of monthly climate held in memory, with dimensions `(month, lat, lon)`.
#[derive(Debug, Clone)]
pub struct ClimateGrid {
    lats: GridAxis,
    lons: GridAxis,
    start_year: Year,
    precipitation: Array3<f64>,
    temperature: Array3<f64>,
}

impl ClimateGrid {
    pub fn new(
        lats: GridAxis,
        lons: GridAxis,
        start_year: Year,
        precipitation: Array3<f64>,
        temperature: Array3<f64>,
    ) -> EcosseResult<Self> {
        let expected = (precipitation.dim().0, lats.len(), lons.len());
        if precipitation.dim() != expected || temperature.dim() != expected {
            return Err(EcosseError::format(
                "climate",
                format!(
                    "precipitation {:?} and temperature {:?} must both have shape {:?}",
                    precipitation.dim(),
                    temperature.dim(),
                    expected
                ),
            ));
        }
        let nmonths = expected.0;
        if nmonths == 0 || nmonths % 12 != 0 {
            return Err(EcosseError::format(
                "climate",
                format!("{nmonths} months is not a whole number of years"),
            ));
        }
        Ok(Self {
            lats,
            lons,
            start_year,
            precipitation,
            temperature,
        })
    }

    pub fn extent(&self) -> BoundingBox {
        BoundingBox::new(self.lons.min(), self.lats.min(), self.lons.max(), self.lats.max())
    }

    pub fn years(&self) -> YearRange {
        let nyears = (self.precipitation.dim().0 / 12) as Year;
        YearRange {
            start: self.start_year,
            end: self.start_year + nyears - 1,
        }
    }

    pub fn window(&self, bbox: &BoundingBox) -> GridWindow {
        GridWindow {
            rows: self.lats.enclosing(bbox.lat_min, bbox.lat_max),
            cols: self.lons.enclosing(bbox.lon_min, bbox.lon_max),
        }
    }

    pub fn read(&self, window: &GridWindow) -> EcosseResult<RawClimate> {
        if window.rows.1 >= self.lats.len() || window.cols.1 >= self.lons.len() {
            return Err(EcosseError::Error(format!(
                "grid window {window:?} exceeds a {}x{} grid",
                self.lats.len(),
                self.lons.len()
            )));
        }
        let cells = window
            .cells()
            .map(|cell| {
                let series = RawCellSeries {
                    lat: self.lats.values()[cell.row],
                    lon: self.lons.values()[cell.col],
                    precipitation: self.precipitation.slice(s![.., cell.row, cell.col]).to_vec(),
                    temperature: self.temperature.slice(s![.., cell.row, cell.col]).to_vec(),
                };
                (cell, series)
            })
            .collect();
        Ok(RawClimate {
            start_year: self.start_year,
            cells,
        })
    }
}

/// A weather resource whose grids are held in memory.
///
/// Resources shipping a single dataset for both periods have no historic grid; their
/// historic period is served from the future grid.
#[derive(Debug, Clone)]
pub struct GriddedClimateDataset {
    name: String,
    future: ClimateGrid,
    historic: Option<ClimateGrid>,
}

impl GriddedClimateDataset {
    pub fn new(name: impl Into<String>, future: ClimateGrid, historic: Option<ClimateGrid>) -> Self {
        Self {
            name: name.into(),
            future,
            historic,
        }
    }

    fn grid(&self, period: Period) -> &ClimateGrid {
        match (period, &self.historic) {
            (Period::Historic, Some(historic)) => historic,
            _ => &self.future,
        }
    }
}

impl ClimateDataset for GriddedClimateDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_extent(&self) -> BoundingBox {
        let future = self.future.extent();
        match &self.historic {
            // Disjoint grids leave an empty extent at the future grid's corner
            Some(historic) => future
                .intersection(&historic.extent())
                .unwrap_or(BoundingBox::point(future.lat_min, future.lon_min)),
            None => future,
        }
    }

    fn period_years(&self, period: Period) -> YearRange {
        self.grid(period).years()
    }

    fn grid_indices(&self, bbox: &BoundingBox) -> EcosseResult<AoiIndices> {
        Ok(AoiIndices {
            future: self.future.window(bbox),
            historic: self.grid(Period::Historic).window(bbox),
        })
    }

    fn read_period(&self, period: Period, window: &GridWindow) -> EcosseResult<RawClimate> {
        self.grid(period).read(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(start_year: Year, first_lat: f64) -> ClimateGrid {
        let lats = GridAxis::regular(first_lat, 0.5, 4).unwrap();
        let lons = GridAxis::regular(10.25, 0.5, 4).unwrap();
        let precipitation = Array3::from_shape_fn((24, 4, 4), |(m, r, c)| (m + 10 * r + 100 * c) as f64);
        let temperature = Array3::from_elem((24, 4, 4), 5.0);
        ClimateGrid::new(lats, lons, start_year, precipitation, temperature).unwrap()
    }

    #[test]
    fn years_from_month_count() {
        assert_eq!(grid(2020, 0.25).years(), YearRange::new(2020, 2021).unwrap());
    }

    #[test]
    fn window_encloses_area_of_interest() {
        let grid = grid(2020, 0.25);
        let window = grid.window(&BoundingBox::around(0.8, 10.8, 0.01));
        assert_eq!(window, GridWindow { rows: (1, 1), cols: (1, 1) });
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn read_returns_cell_series() {
        let grid = grid(2020, 0.25);
        let window = GridWindow { rows: (1, 2), cols: (3, 3) };
        let raw = grid.read(&window).unwrap();
        assert_eq!(raw.cells.len(), 2);
        let cell = &raw.cells[&GridCell::new(2, 3)];
        assert_eq!(cell.lat, 1.25);
        assert_eq!(cell.lon, 11.75);
        assert_eq!(cell.precipitation[1], 321.0);
        assert_eq!(cell.precipitation.len(), 24);
    }

    #[test]
    fn read_outside_grid_is_an_error() {
        let window = GridWindow { rows: (0, 4), cols: (0, 0) };
        assert!(grid(2020, 0.25).read(&window).is_err());
    }

    #[test]
    fn rejects_partial_years() {
        let lats = GridAxis::regular(0.0, 1.0, 1).unwrap();
        let lons = GridAxis::regular(0.0, 1.0, 1).unwrap();
        let values = Array3::zeros((13, 1, 1));
        assert!(ClimateGrid::new(lats, lons, 2000, values.clone(), values).is_err());
    }

    #[test]
    fn single_dataset_serves_historic_period() {
        let dataset = GriddedClimateDataset::new("EObs", grid(1990, 0.25), None);
        assert_eq!(
            dataset.period_years(Period::Historic),
            dataset.period_years(Period::Future)
        );
        assert_eq!(dataset.declared_extent(), BoundingBox::new(10.25, 0.25, 11.75, 1.75));
    }

    #[test]
    fn declared_extent_is_common_to_both_grids() {
        let dataset = GriddedClimateDataset::new("CRU", grid(2020, 0.25), Some(grid(1980, 0.75)));
        assert_eq!(dataset.declared_extent(), BoundingBox::new(10.25, 0.75, 11.75, 1.75));
        assert_eq!(dataset.period_years(Period::Historic).start, 1980);
    }
}
