//! Plant litter workbooks
//!
//! A pre-extracted litter series is kept in the `Plant litter_timeseries` sheet with a
//! `time` column and a `Plant litter input (Aggregate)` column in kgC ha⁻¹ yr⁻¹.

use crate::excel::{cell_f64, header_index, read_sheet, source_name};
use calamine::{Data, Range};
use ecosse_core::errors::{EcosseError, EcosseResult};
use ecosse_core::timeseries::{TimeSeries, Year};
use std::path::Path;
use tracing::info;

pub const LITTER_SHEET: &str = "Plant litter_timeseries";
pub const TIME_COLUMN: &str = "time";
pub const PLANT_INPUT_COLUMN: &str = "Plant litter input (Aggregate)";

/// Litter read from a workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcelLitter {
    /// Years renumbered consecutively from the first listed year.
    pub series: TimeSeries,
    /// Number of rows read.
    pub records: usize,
}

pub fn read_litter_workbook(path: &Path) -> EcosseResult<ExcelLitter> {
    let range = read_sheet(path, Some(LITTER_SHEET))?;
    let litter = litter_from_range(&range, &source_name(path))?;
    info!(path = %path.display(), records = litter.records, "Read plant litter workbook");
    Ok(litter)
}

/// Litter series from a sheet whose first row holds the column headers.
///
/// Only the first listed year is used; the series is renumbered so rows follow on
/// year by year.
pub fn litter_from_range(range: &Range<Data>, source: &str) -> EcosseResult<ExcelLitter> {
    let (Some(time_col), Some(value_col)) = (
        header_index(range, TIME_COLUMN),
        header_index(range, PLANT_INPUT_COLUMN),
    ) else {
        return Err(EcosseError::format(
            source,
            format!("columns {TIME_COLUMN} and {PLANT_INPUT_COLUMN} must be in {LITTER_SHEET}"),
        ));
    };

    let mut years = Vec::new();
    let mut values = Vec::new();
    for (index, row) in range.rows().enumerate().skip(1) {
        let (Some(year), Some(value)) = (cell_f64(row.get(time_col)), cell_f64(row.get(value_col)))
        else {
            if row.iter().all(|cell| *cell == Data::Empty) {
                continue;
            }
            return Err(EcosseError::format(
                source,
                format!("row {} has no numeric {TIME_COLUMN} or plant input", index + 1),
            ));
        };
        years.push(year as Year);
        values.push(value);
    }

    let Some(first_year) = years.first().copied() else {
        return Err(EcosseError::format(source, format!("{LITTER_SHEET} has no records")));
    };
    let records = values.len();
    Ok(ExcelLitter {
        series: TimeSeries::sequential(first_year, values)?,
        records,
    })
}
