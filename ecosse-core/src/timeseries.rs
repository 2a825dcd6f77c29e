//! Annual time series and simulation windows.
//!
//! Plant litter inputs arrive as a `(year → value)` series whose span rarely matches
//! the simulation period chosen for a study. [`TimeSeries::align`] resizes such a
//! series onto a [`YearRange`], holding the first value before the series starts and
//! the last value after it ends.
//!
//! ```rust
//! use ecosse_core::timeseries::{TimeSeries, YearRange};
//!
//! let series = TimeSeries::new(vec![2000, 2001, 2002], vec![1.0, 2.0, 3.0]).unwrap();
//! let aligned = series.align(YearRange::new(1998, 2004).unwrap());
//! assert_eq!(aligned.values(), &[1.0, 1.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
//! ```

use crate::errors::{EcosseError, EcosseResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

pub type Year = i32;
pub type FloatValue = f64;

/// Inclusive range of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeParts", into = "RangeParts")]
pub struct YearRange {
    pub start: Year,
    pub end: Year,
}

#[derive(Serialize, Deserialize)]
struct RangeParts {
    start: Year,
    end: Year,
}

impl TryFrom<RangeParts> for YearRange {
    type Error = EcosseError;

    fn try_from(parts: RangeParts) -> EcosseResult<Self> {
        YearRange::new(parts.start, parts.end)
    }
}

impl From<YearRange> for RangeParts {
    fn from(range: YearRange) -> Self {
        RangeParts {
            start: range.start,
            end: range.end,
        }
    }
}

impl YearRange {
    pub fn new(start: Year, end: Year) -> EcosseResult<Self> {
        if start > end {
            return Err(EcosseError::InvalidSeries(format!(
                "start year {start} is after end year {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of years in the range.
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, year: Year) -> bool {
        self.start <= year && year <= self.end
    }

    pub fn years(&self) -> RangeInclusive<Year> {
        self.start..=self.end
    }

    /// Years common to both ranges, if any.
    pub fn intersect(&self, other: &YearRange) -> Option<YearRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(YearRange { start, end })
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// An annual series of values with strictly increasing years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesParts", into = "SeriesParts")]
pub struct TimeSeries {
    years: Vec<Year>,
    values: Vec<FloatValue>,
}

#[derive(Serialize, Deserialize)]
struct SeriesParts {
    years: Vec<Year>,
    values: Vec<FloatValue>,
}

impl TryFrom<SeriesParts> for TimeSeries {
    type Error = EcosseError;

    fn try_from(parts: SeriesParts) -> EcosseResult<Self> {
        TimeSeries::new(parts.years, parts.values)
    }
}

impl From<TimeSeries> for SeriesParts {
    fn from(series: TimeSeries) -> Self {
        SeriesParts {
            years: series.years,
            values: series.values,
        }
    }
}

impl TimeSeries {
    /// Create a series, checking that years and values pair up and years strictly increase.
    pub fn new(years: Vec<Year>, values: Vec<FloatValue>) -> EcosseResult<Self> {
        if years.len() != values.len() {
            return Err(EcosseError::InvalidSeries(format!(
                "{} years but {} values",
                years.len(),
                values.len()
            )));
        }
        if years.is_empty() {
            return Err(EcosseError::InvalidSeries("series is empty".to_string()));
        }
        if let Some(pair) = years.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(EcosseError::InvalidSeries(format!(
                "years must be strictly increasing, found {} followed by {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { years, values })
    }

    /// Create a series of consecutive years beginning at `start_year`.
    pub fn sequential(start_year: Year, values: Vec<FloatValue>) -> EcosseResult<Self> {
        let years = (0..values.len()).map(|i| start_year + i as Year).collect();
        Self::new(years, values)
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn values(&self) -> &[FloatValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn first_year(&self) -> Year {
        self.years[0]
    }

    pub fn last_year(&self) -> Year {
        self.years[self.years.len() - 1]
    }

    pub fn year_range(&self) -> YearRange {
        YearRange {
            start: self.first_year(),
            end: self.last_year(),
        }
    }

    /// Value recorded for exactly `year`, if any.
    pub fn value_at(&self, year: Year) -> Option<FloatValue> {
        self.years
            .binary_search(&year)
            .ok()
            .map(|index| self.values[index])
    }

    /// Arithmetic mean of the values.
    pub fn mean(&self) -> FloatValue {
        self.values.iter().sum::<FloatValue>() / self.values.len() as FloatValue
    }

    /// Multiply every value by `factor`.
    pub fn scaled(&self, factor: FloatValue) -> Self {
        Self {
            years: self.years.clone(),
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    /// Relabel the years as consecutive years starting from the first listed year.
    ///
    /// The year values recorded after the first are discarded, so `[1990, 1995, 2000]`
    /// becomes `[1990, 1991, 1992]`.
    pub fn renumbered(&self) -> Self {
        let first = self.first_year();
        Self {
            years: (0..self.len()).map(|i| first + i as Year).collect(),
            values: self.values.clone(),
        }
    }

    /// Resize the series onto `window`, one value per year.
    ///
    /// Years before the series use its first value, years after it use its last value.
    /// Inside the series the value for the year is used; if the series skips that year
    /// the most recent earlier value is held.
    pub fn align(&self, window: YearRange) -> TimeSeries {
        let first_value = self.values[0];
        let last_value = self.values[self.values.len() - 1];

        let values = window
            .years()
            .map(|year| {
                if year < self.first_year() {
                    first_value
                } else if year > self.last_year() {
                    last_value
                } else {
                    self.held_value(year)
                }
            })
            .collect();

        TimeSeries {
            years: window.years().collect(),
            values,
        }
    }

    fn held_value(&self, year: Year) -> FloatValue {
        // Number of recorded years not after `year`; at least one since year >= first_year
        let count = self.years.partition_point(|&y| y <= year);
        let index = count.saturating_sub(1).min(self.values.len() - 1);
        self.values[index]
    }
}

/// Resize `series` to cover `sim_start..=sim_end`.
pub fn align(sim_start: Year, sim_end: Year, series: &TimeSeries) -> EcosseResult<TimeSeries> {
    Ok(series.align(YearRange::new(sim_start, sim_end)?))
}
