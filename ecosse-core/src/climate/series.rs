use crate::climate::dataset::Period;
use crate::spatial::{Coordinate, GridCell};
use crate::timeseries::{Year, YearRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monthly climate at one grid cell, starting in January of `start_year`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSeries {
    pub lat: f64,
    pub lon: f64,
    pub start_year: Year,
    /// mm/month
    pub precipitation: Vec<f64>,
    /// °C
    pub temperature: Vec<f64>,
}

impl CellSeries {
    pub fn nyears(&self) -> usize {
        self.precipitation.len() / 12
    }

    pub fn years(&self) -> Option<YearRange> {
        (self.nyears() > 0).then(|| YearRange {
            start: self.start_year,
            end: self.start_year + self.nyears() as Year - 1,
        })
    }

    /// True when any value is missing.
    pub fn has_missing(&self) -> bool {
        self.precipitation
            .iter()
            .chain(self.temperature.iter())
            .any(|value| value.is_nan())
    }

    /// Keep only the months of years within `range`.
    pub fn trimmed(&self, range: YearRange) -> Option<CellSeries> {
        let overlap = self.years()?.intersect(&range)?;
        let first = (overlap.start - self.start_year) as usize * 12;
        let last = first + overlap.len() * 12;
        Some(CellSeries {
            lat: self.lat,
            lon: self.lon,
            start_year: overlap.start,
            precipitation: self.precipitation[first..last].to_vec(),
            temperature: self.temperature[first..last].to_vec(),
        })
    }

    /// Mean over all months of precipitation and temperature.
    pub fn means(&self) -> (f64, f64) {
        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len().max(1) as f64;
        (mean(&self.precipitation), mean(&self.temperature))
    }
}

/// Converted climate for every cell of a grid window in one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSeries {
    pub period: Period,
    pub cells: BTreeMap<GridCell, CellSeries>,
}

impl PeriodSeries {
    /// The cell whose centre is closest to the point; the lowest grid cell wins ties.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<(&GridCell, &CellSeries)> {
        self.cells
            .iter()
            .fold(None, |best: Option<(f64, (&GridCell, &CellSeries))>, (cell, series)| {
                let distance = (series.lat - lat).powi(2) + (series.lon - lon).powi(2);
                match best {
                    Some((best_distance, _)) if best_distance <= distance => best,
                    _ => Some((distance, (cell, series))),
                }
            })
            .map(|(_, found)| found)
    }

    /// Keep only the years within `range`; cells without any such year are dropped.
    pub fn trimmed(&self, range: YearRange) -> PeriodSeries {
        PeriodSeries {
            period: self.period,
            cells: self
                .cells
                .iter()
                .filter_map(|(cell, series)| series.trimmed(range).map(|s| (*cell, s)))
                .collect(),
        }
    }
}

/// Historic and future climate around one coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateBundle {
    pub resource: String,
    pub historic: PeriodSeries,
    pub future: PeriodSeries,
}

/// Climate for the grid cell associated with a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellClimate {
    pub resource: String,
    pub grid_cell: GridCell,
    pub historic: CellSeries,
    pub future: CellSeries,
}

impl ClimateBundle {
    /// Pick the climate of the grid cell nearest to `coordinate`.
    ///
    /// Returns `None` when either period has no cell or the chosen cell has missing
    /// values, as happens over sea in masked datasets.
    pub fn associate(&self, coordinate: &Coordinate) -> Option<CellClimate> {
        let (grid_cell, future) = self.future.nearest(coordinate.lat, coordinate.lon)?;
        let (_, historic) = self.historic.nearest(coordinate.lat, coordinate.lon)?;
        if future.has_missing() || historic.has_missing() {
            return None;
        }
        Some(CellClimate {
            resource: self.resource.clone(),
            grid_cell: *grid_cell,
            historic: historic.clone(),
            future: future.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(lat: f64, lon: f64, start_year: Year, nyears: usize) -> CellSeries {
        CellSeries {
            lat,
            lon,
            start_year,
            precipitation: (0..nyears * 12).map(|m| m as f64).collect(),
            temperature: vec![8.0; nyears * 12],
        }
    }

    fn period(period: Period, cells: Vec<(GridCell, CellSeries)>) -> PeriodSeries {
        PeriodSeries {
            period,
            cells: cells.into_iter().collect(),
        }
    }

    #[test]
    fn trimming_keeps_whole_years() {
        let trimmed = series(0.0, 0.0, 2000, 5)
            .trimmed(YearRange::new(2002, 2010).unwrap())
            .unwrap();
        assert_eq!(trimmed.start_year, 2002);
        assert_eq!(trimmed.nyears(), 3);
        assert_eq!(trimmed.precipitation[0], 24.0);
        assert!(series(0.0, 0.0, 2000, 5)
            .trimmed(YearRange::new(1990, 1999).unwrap())
            .is_none());
    }

    #[test]
    fn nearest_cell_is_chosen() {
        let future = period(
            Period::Future,
            vec![
                (GridCell::new(0, 0), series(50.25, 0.25, 2020, 1)),
                (GridCell::new(0, 1), series(50.25, 0.75, 2020, 1)),
            ],
        );
        let (cell, _) = future.nearest(50.3, 0.7).unwrap();
        assert_eq!(*cell, GridCell::new(0, 1));
        let (cell, _) = future.nearest(50.25, 0.5).unwrap();
        assert_eq!(*cell, GridCell::new(0, 0));
    }

    #[test]
    fn association_requires_both_periods() {
        let bundle = ClimateBundle {
            resource: "CRU".to_string(),
            historic: period(Period::Historic, vec![]),
            future: period(Period::Future, vec![(GridCell::new(0, 0), series(1.0, 1.0, 2020, 1))]),
        };
        assert!(bundle.associate(&Coordinate::new(1.0, 1.0, "a")).is_none());
    }

    #[test]
    fn association_rejects_masked_cells() {
        let mut masked = series(1.0, 1.0, 2020, 1);
        masked.temperature[3] = f64::NAN;
        let bundle = ClimateBundle {
            resource: "CRU".to_string(),
            historic: period(Period::Historic, vec![(GridCell::new(0, 0), series(1.0, 1.0, 1990, 1))]),
            future: period(Period::Future, vec![(GridCell::new(0, 0), masked)]),
        };
        assert!(bundle.associate(&Coordinate::new(1.0, 1.0, "a")).is_none());
    }

    #[test]
    fn association_returns_cell_climate() {
        let bundle = ClimateBundle {
            resource: "CRU".to_string(),
            historic: period(Period::Historic, vec![(GridCell::new(3, 4), series(1.0, 1.0, 1990, 2))]),
            future: period(Period::Future, vec![(GridCell::new(5, 6), series(1.0, 1.0, 2020, 3))]),
        };
        let climate = bundle.associate(&Coordinate::new(1.0, 1.0, "a")).unwrap();
        assert_eq!(climate.grid_cell, GridCell::new(5, 6));
        assert_eq!(climate.historic.nyears(), 2);
        assert_eq!(climate.future.means().1, 8.0);
    }
}
