//! CF convention time decoding
//!
//! NetCDF time coordinates are stored as offsets from a reference date, described by a
//! `units` attribute such as `days since 1850-01-01 00:00:00` and a `calendar` attribute.
//! Only the calendar date of a time value is needed here, to find the first year of a
//! litter or climate series. The reference time and the Gregorian calendars go through
//! chrono; the model calendars (`noleap`, `all_leap`, `360_day`, `julian`) have no
//! chrono equivalent and are counted in whole days.
//!
//! ```rust
//! use ecosse_core::cftime::{CfCalendar, CfTimeUnits};
//!
//! let units = CfTimeUnits::parse("days since 2000-01-01").unwrap();
//! let date = units.date_at(366.0, CfCalendar::NoLeap).unwrap();
//! assert_eq!((date.year, date.month, date.day), (2001, 1, 2));
//! ```

use crate::errors::{EcosseError, EcosseResult};
use crate::timeseries::Year;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendars defined by the CF conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CfCalendar {
    #[default]
    Standard,
    /// Every year has 365 days.
    NoLeap,
    /// Every year has 366 days.
    AllLeap,
    /// Twelve months of 30 days.
    Day360,
    Julian,
    ProlepticGregorian,
}

impl FromStr for CfCalendar {
    type Err = EcosseError;

    fn from_str(s: &str) -> EcosseResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Self::Standard),
            "noleap" | "no_leap" | "365_day" => Ok(Self::NoLeap),
            "all_leap" | "allleap" | "366_day" => Ok(Self::AllLeap),
            "360_day" => Ok(Self::Day360),
            "julian" => Ok(Self::Julian),
            "proleptic_gregorian" => Ok(Self::ProlepticGregorian),
            other => Err(EcosseError::format(
                "time",
                format!("unsupported calendar '{other}'"),
            )),
        }
    }
}

impl fmt::Display for CfCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::NoLeap => "noleap",
            Self::AllLeap => "all_leap",
            Self::Day360 => "360_day",
            Self::Julian => "julian",
            Self::ProlepticGregorian => "proleptic_gregorian",
        };
        write!(f, "{name}")
    }
}

impl CfCalendar {
    pub fn is_leap_year(&self, year: Year) -> bool {
        match self {
            Self::NoLeap | Self::Day360 => false,
            Self::AllLeap => true,
            Self::Julian => year.rem_euclid(4) == 0,
            Self::Standard | Self::ProlepticGregorian => {
                (year.rem_euclid(4) == 0 && year.rem_euclid(100) != 0) || year.rem_euclid(400) == 0
            }
        }
    }

    /// Number of days in `month` (1 to 12) of `year`.
    pub fn days_in_month(&self, year: Year, month: u32) -> u32 {
        if *self == Self::Day360 {
            return 30;
        }
        match month {
            2 if self.is_leap_year(year) => 29,
            2 => 28,
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    pub fn days_in_year(&self, year: Year) -> u32 {
        (1..=12).map(|month| self.days_in_month(year, month)).sum()
    }
}

/// A calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CfDate {
    pub year: Year,
    pub month: u32,
    pub day: u32,
}

impl CfDate {
    fn day_of_year(&self, calendar: CfCalendar) -> i64 {
        let before: u32 = (1..self.month)
            .map(|month| calendar.days_in_month(self.year, month))
            .sum();
        (before + self.day - 1) as i64
    }

    /// The date `days` days after this one (before it, when negative).
    pub fn add_days(&self, days: i64, calendar: CfCalendar) -> CfDate {
        let mut year = self.year;
        let mut remaining = self.day_of_year(calendar) + days;
        while remaining < 0 {
            year -= 1;
            remaining += calendar.days_in_year(year) as i64;
        }
        while remaining >= calendar.days_in_year(year) as i64 {
            remaining -= calendar.days_in_year(year) as i64;
            year += 1;
        }

        let mut month = 1;
        loop {
            let length = calendar.days_in_month(year, month) as i64;
            if remaining < length || month == 12 {
                break;
            }
            remaining -= length;
            month += 1;
        }
        CfDate {
            year,
            month,
            day: remaining as u32 + 1,
        }
    }
}

impl fmt::Display for CfDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeStep {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeStep {
    fn seconds(&self, value: f64) -> f64 {
        match self {
            TimeStep::Seconds => value,
            TimeStep::Minutes => value * 60.0,
            TimeStep::Hours => value * 3600.0,
            TimeStep::Days => value * 86400.0,
        }
    }
}

const SECONDS_PER_DAY: f64 = 86400.0;
/// Offsets beyond a million years are not dates any dataset holds.
const MAX_MODEL_DAYS: f64 = 3.66e8;

fn parse_reference(reference: &str) -> Option<NaiveDateTime> {
    let reference = reference.trim().trim_end_matches('Z').trim();
    NaiveDateTime::parse_from_str(reference, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(reference, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(reference, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(reference, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(reference, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(reference, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
        })
}

/// Parsed `"<step> since <reference>"` units attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct CfTimeUnits {
    step: TimeStep,
    reference: NaiveDateTime,
}

impl CfTimeUnits {
    pub fn parse(units: &str) -> EcosseResult<Self> {
        let invalid = || EcosseError::format("time", format!("cannot parse time units '{units}'"));

        let (step, reference) = units.split_once(" since ").ok_or_else(invalid)?;
        let step = match step.trim().to_lowercase().as_str() {
            "second" | "seconds" | "s" => TimeStep::Seconds,
            "minute" | "minutes" | "min" => TimeStep::Minutes,
            "hour" | "hours" | "h" | "hr" => TimeStep::Hours,
            "day" | "days" | "d" => TimeStep::Days,
            _ => return Err(invalid()),
        };
        let reference = parse_reference(reference).ok_or_else(invalid)?;

        Ok(Self { step, reference })
    }

    pub fn reference(&self) -> CfDate {
        let date = self.reference.date();
        CfDate {
            year: date.year() as Year,
            month: date.month(),
            day: date.day(),
        }
    }

    /// Calendar date of a time coordinate value.
    ///
    /// Gregorian calendars are handled by chrono, the model calendars by counting days.
    pub fn date_at(&self, value: f64, calendar: CfCalendar) -> EcosseResult<CfDate> {
        let out_of_range = || {
            EcosseError::format(
                "time",
                format!("time value {value} is out of range for reference {}", self.reference),
            )
        };
        if !value.is_finite() {
            return Err(out_of_range());
        }
        let seconds = self.step.seconds(value);

        match calendar {
            CfCalendar::Standard | CfCalendar::ProlepticGregorian => {
                let millis = (seconds * 1000.0).floor();
                if millis.abs() >= i64::MAX as f64 {
                    return Err(out_of_range());
                }
                let date = Duration::try_milliseconds(millis as i64)
                    .and_then(|offset| self.reference.checked_add_signed(offset))
                    .ok_or_else(out_of_range)?
                    .date();
                Ok(CfDate {
                    year: date.year() as Year,
                    month: date.month(),
                    day: date.day(),
                })
            }
            _ => {
                let elapsed = self.reference.time().num_seconds_from_midnight() as f64;
                let days = ((elapsed + seconds) / SECONDS_PER_DAY).floor();
                if days.abs() > MAX_MODEL_DAYS {
                    return Err(out_of_range());
                }
                Ok(self.reference().add_days(days as i64, calendar))
            }
        }
    }

    /// Year of a time coordinate value.
    pub fn year_at(&self, value: f64, calendar: CfCalendar) -> EcosseResult<Year> {
        Ok(self.date_at(value, calendar)?.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_calendars() {
        assert_eq!("gregorian".parse::<CfCalendar>().unwrap(), CfCalendar::Standard);
        assert_eq!("365_day".parse::<CfCalendar>().unwrap(), CfCalendar::NoLeap);
        assert_eq!("360_day".parse::<CfCalendar>().unwrap(), CfCalendar::Day360);
        assert!("lunar".parse::<CfCalendar>().is_err());
    }

    #[test]
    fn leap_years() {
        let standard = CfCalendar::Standard;
        assert!(standard.is_leap_year(2000));
        assert!(!standard.is_leap_year(1900));
        assert!(CfCalendar::Julian.is_leap_year(1900));
        assert_eq!(standard.days_in_year(2004), 366);
        assert_eq!(CfCalendar::NoLeap.days_in_year(2004), 365);
        assert_eq!(CfCalendar::Day360.days_in_year(2004), 360);
    }

    #[test]
    fn decode_orchidee_style_units() {
        // Mid-year time_centered value of the first year
        let units = CfTimeUnits::parse("seconds since 1850-01-01 00:00:00").unwrap();
        let date = units.date_at(182.5 * 86400.0, CfCalendar::NoLeap).unwrap();
        assert_eq!(date.year, 1850);
        assert_eq!(date.month, 7);
    }

    #[test]
    fn decode_across_leap_years() {
        let units = CfTimeUnits::parse("days since 2000-01-01").unwrap();
        let date = |value, calendar| units.date_at(value, calendar).unwrap().to_string();
        assert_eq!(date(366.0, CfCalendar::Standard), "2001-01-01");
        assert_eq!(date(366.0, CfCalendar::ProlepticGregorian), "2001-01-01");
        assert_eq!(date(366.0, CfCalendar::NoLeap), "2001-01-02");
        assert_eq!(date(360.0, CfCalendar::Day360), "2001-01-01");
        assert_eq!(date(366.0, CfCalendar::AllLeap), "2001-01-01");
        assert_eq!(date(-1.0, CfCalendar::Standard), "1999-12-31");
    }

    #[test]
    fn reference_time_of_day_is_counted() {
        let units = CfTimeUnits::parse("hours since 1990-12-31T12:00:00").unwrap();
        assert_eq!(units.year_at(12.0, CfCalendar::Standard).unwrap(), 1991);
        assert_eq!(units.year_at(11.0, CfCalendar::Standard).unwrap(), 1990);
        assert_eq!(units.year_at(12.0, CfCalendar::NoLeap).unwrap(), 1991);
    }

    #[test]
    fn rejects_bad_units() {
        assert!(CfTimeUnits::parse("days after 2000-01-01").is_err());
        assert!(CfTimeUnits::parse("fortnights since 2000-01-01").is_err());
        assert!(CfTimeUnits::parse("days since 2000-13-01").is_err());
        assert!(CfTimeUnits::parse("days since 2001-02-29").is_err());
    }

    #[test]
    fn reference_formats() {
        let cases = [
            "days since 1850-01-01",
            "days since 1850-1-1",
            "days since 1850-01-01 00:00:00",
            "days since 1850-01-01 00:00:00.0",
            "days since 1850-01-01T00:00:00Z",
            "days since 1850-01-01 00:00",
        ];
        for units in cases {
            let parsed = CfTimeUnits::parse(units).unwrap();
            assert_eq!(parsed.reference().to_string(), "1850-01-01", "{units}");
        }
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let units = CfTimeUnits::parse("days since 2000-01-01").unwrap();
        assert!(units.date_at(f64::NAN, CfCalendar::Standard).is_err());
        assert!(units.date_at(f64::INFINITY, CfCalendar::NoLeap).is_err());
        assert!(units.date_at(1.0e300, CfCalendar::Standard).is_err());
    }
}
