use crate::cftime::CfCalendar;
use crate::climate::dataset::{Period, RawCellSeries};
use crate::climate::series::CellSeries;
use crate::timeseries::Year;
use serde::{Deserialize, Serialize};
use std::fmt;

const SECONDS_PER_DAY: f64 = 86400.0;
const KELVIN_OFFSET: f64 = 273.15;

/// Unit of precipitation stored by a weather resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecipitationUnit {
    /// kg m⁻² s⁻¹
    FluxPerSecond,
    MillimetresPerDay,
    MillimetresPerMonth,
}

/// The closed set of weather resource families.
///
/// Each family reads and converts its data differently; the family is worked out once
/// from the configured resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFamily {
    Harmonie,
    EObs,
    /// AMMA-2050 bias-corrected GCM runs
    Ewembi,
    Cru,
}

impl ResourceFamily {
    /// Family of the named resource.
    ///
    /// Names in `ewembi_gcms` are EWEMBI runs; anything not otherwise recognised is CRU.
    pub fn resolve(resource: &str, ewembi_gcms: &[String]) -> Self {
        match resource {
            "HARMONIE" => ResourceFamily::Harmonie,
            "EObs" => ResourceFamily::EObs,
            name if ewembi_gcms.iter().any(|gcm| gcm == name) => ResourceFamily::Ewembi,
            _ => ResourceFamily::Cru,
        }
    }

    pub fn calendar(&self) -> CfCalendar {
        match self {
            ResourceFamily::Ewembi => CfCalendar::NoLeap,
            _ => CfCalendar::Standard,
        }
    }

    /// True for families shipping a single dataset that covers both periods.
    pub fn historic_uses_future_grid(&self) -> bool {
        matches!(self, ResourceFamily::Harmonie | ResourceFamily::EObs)
    }

    /// Grid read for `period`.
    pub fn source_period(&self, period: Period) -> Period {
        match period {
            Period::Historic if self.historic_uses_future_grid() => Period::Future,
            other => other,
        }
    }

    pub fn precipitation_unit(&self) -> PrecipitationUnit {
        match self {
            ResourceFamily::Harmonie | ResourceFamily::Ewembi => PrecipitationUnit::FluxPerSecond,
            ResourceFamily::EObs => PrecipitationUnit::MillimetresPerDay,
            ResourceFamily::Cru => PrecipitationUnit::MillimetresPerMonth,
        }
    }

    pub fn temperature_in_kelvin(&self) -> bool {
        matches!(self, ResourceFamily::Harmonie | ResourceFamily::Ewembi)
    }

    /// Precipitation for one month in mm.
    pub fn precipitation_mm(&self, value: f64, year: Year, month: u32) -> f64 {
        let days = self.calendar().days_in_month(year, month) as f64;
        match self.precipitation_unit() {
            PrecipitationUnit::FluxPerSecond => value * SECONDS_PER_DAY * days,
            PrecipitationUnit::MillimetresPerDay => value * days,
            PrecipitationUnit::MillimetresPerMonth => value,
        }
    }

    pub fn temperature_celsius(&self, value: f64) -> f64 {
        if self.temperature_in_kelvin() {
            value - KELVIN_OFFSET
        } else {
            value
        }
    }

    /// Convert a raw monthly series read from the dataset to mm/month and °C.
    pub fn convert(&self, raw: &RawCellSeries, start_year: Year) -> CellSeries {
        let month_of = |index: usize| {
            (
                start_year + (index / 12) as Year,
                (index % 12) as u32 + 1,
            )
        };
        let precipitation = raw
            .precipitation
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let (year, month) = month_of(index);
                self.precipitation_mm(*value, year, month)
            })
            .collect();
        let temperature = raw
            .temperature
            .iter()
            .map(|value| self.temperature_celsius(*value))
            .collect();
        CellSeries {
            lat: raw.lat,
            lon: raw.lon,
            start_year,
            precipitation,
            temperature,
        }
    }
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceFamily::Harmonie => "HARMONIE",
            ResourceFamily::EObs => "EObs",
            ResourceFamily::Ewembi => "EWEMBI",
            ResourceFamily::Cru => "CRU",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn gcms() -> Vec<String> {
        vec!["GFDL-ESM2M".to_string(), "MIROC5".to_string()]
    }

    #[test]
    fn resolve_families() {
        assert_eq!(ResourceFamily::resolve("HARMONIE", &gcms()), ResourceFamily::Harmonie);
        assert_eq!(ResourceFamily::resolve("EObs", &gcms()), ResourceFamily::EObs);
        assert_eq!(ResourceFamily::resolve("MIROC5", &gcms()), ResourceFamily::Ewembi);
        assert_eq!(ResourceFamily::resolve("CRU", &gcms()), ResourceFamily::Cru);
        assert_eq!(ResourceFamily::resolve("anything", &[]), ResourceFamily::Cru);
    }

    #[test]
    fn historic_grid_source() {
        assert_eq!(
            ResourceFamily::Harmonie.source_period(Period::Historic),
            Period::Future
        );
        assert_eq!(ResourceFamily::Cru.source_period(Period::Historic), Period::Historic);
        assert_eq!(ResourceFamily::Ewembi.source_period(Period::Future), Period::Future);
    }

    #[test]
    fn precipitation_conversions() {
        // February 2000 has 29 days in the standard calendar and 28 without leap years
        let flux = 1.0 / SECONDS_PER_DAY;
        assert!(is_close!(ResourceFamily::Harmonie.precipitation_mm(flux, 2000, 2), 29.0));
        assert!(is_close!(ResourceFamily::Ewembi.precipitation_mm(flux, 2000, 2), 28.0));
        assert!(is_close!(ResourceFamily::EObs.precipitation_mm(2.0, 2001, 1), 62.0));
        assert_eq!(ResourceFamily::Cru.precipitation_mm(55.0, 2001, 1), 55.0);
    }

    #[test]
    fn temperature_conversions() {
        assert!(is_close!(ResourceFamily::Ewembi.temperature_celsius(283.15), 10.0));
        assert_eq!(ResourceFamily::EObs.temperature_celsius(10.0), 10.0);
    }

    #[test]
    fn convert_walks_months() {
        let raw = RawCellSeries {
            lat: 1.0,
            lon: 2.0,
            precipitation: vec![1.0; 14],
            temperature: vec![273.15; 14],
        };
        let series = ResourceFamily::EObs.convert(&raw, 2003);
        assert_eq!(series.precipitation[0], 31.0);
        assert_eq!(series.precipitation[1], 28.0);
        assert_eq!(series.precipitation[13], 29.0);
        assert_eq!(series.temperature[0], 273.15);
        let series = ResourceFamily::Harmonie.convert(&raw, 2003);
        assert!(is_close!(series.temperature[5], 0.0));
    }
}
