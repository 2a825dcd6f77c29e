//! Shared helpers for reading workbooks with calamine.

use calamine::{open_workbook_auto, Data, Range, Reader};
use ecosse_core::errors::{EcosseError, EcosseResult};
use std::path::Path;

pub(crate) fn source_name(path: &Path) -> String {
    path.display().to_string()
}

/// Open `path` and read one worksheet, or the first one when `sheet` is `None`.
pub(crate) fn read_sheet(path: &Path, sheet: Option<&str>) -> EcosseResult<Range<Data>> {
    if !path.is_file() {
        return Err(EcosseError::MissingFile(path.to_path_buf()));
    }
    let source = source_name(path);
    let mut workbook =
        open_workbook_auto(path).map_err(|e| EcosseError::format(&source, e.to_string()))?;

    let sheet = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(EcosseError::format(
                    &source,
                    format!("sheet {name} must be in workbook"),
                ));
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| EcosseError::format(&source, "workbook has no sheets"))?,
    };

    workbook
        .worksheet_range(&sheet)
        .map_err(|e| EcosseError::format(&source, format!("failed to read sheet '{sheet}': {e}")))
}

/// Column positions of the named headers in the first row.
pub(crate) fn header_index(range: &Range<Data>, name: &str) -> Option<usize> {
    range
        .rows()
        .next()?
        .iter()
        .position(|cell| cell_string(cell).is_some_and(|header| header.trim() == name))
}

pub(crate) fn cell_f64(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Float(value) => Some(*value),
        Data::Int(value) => Some(*value as f64),
        Data::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn cell_string(cell: &Data) -> Option<String> {
    match cell {
        Data::String(value) => Some(value.clone()),
        Data::Float(value) if value.fract() == 0.0 => Some(format!("{}", *value as i64)),
        Data::Float(value) => Some(value.to_string()),
        Data::Int(value) => Some(value.to_string()),
        Data::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn range_from_rows(rows: &[Vec<Data>]) -> Range<Data> {
    let ncols = rows.iter().map(|row| row.len()).max().unwrap_or(1);
    let mut range = Range::new((0, 0), (rows.len() as u32 - 1, ncols as u32 - 1));
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            range.set_value((r as u32, c as u32), cell.clone());
        }
    }
    range
}
