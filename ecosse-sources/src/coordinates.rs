//! Coordinate tables
//!
//! The coordinates to simulate are listed in the first sheet of a workbook with columns
//! `Lattitude-N`, `Longitude-E` and `Unique identifier` (spelling as used by the
//! tables in circulation). Blank or non-numeric positions are read as NaN so the batch
//! can skip them.

use crate::excel::{cell_f64, cell_string, header_index, read_sheet, source_name};
use calamine::{Data, Range};
use ecosse_core::errors::{EcosseError, EcosseResult};
use ecosse_core::spatial::Coordinate;
use std::path::Path;
use tracing::info;

pub const LATITUDE_COLUMN: &str = "Lattitude-N";
pub const LONGITUDE_COLUMN: &str = "Longitude-E";
pub const IDENTIFIER_COLUMN: &str = "Unique identifier";

/// Read every coordinate listed in a workbook.
pub fn read_coordinates(path: &Path) -> EcosseResult<Vec<Coordinate>> {
    let range = read_sheet(path, None)?;
    let coordinates = coordinates_from_range(&range, &source_name(path))?;
    info!(
        path = %path.display(),
        records = coordinates.len(),
        "Valid coordinates file"
    );
    Ok(coordinates)
}

/// Coordinates from a sheet whose first row holds the column headers.
///
/// Rows without an identifier are given their 1-based row number.
pub fn coordinates_from_range(range: &Range<Data>, source: &str) -> EcosseResult<Vec<Coordinate>> {
    let (Some(lat_col), Some(lon_col)) = (
        header_index(range, LATITUDE_COLUMN),
        header_index(range, LONGITUDE_COLUMN),
    ) else {
        return Err(EcosseError::format(
            source,
            format!("invalid coordinates file - must have {LATITUDE_COLUMN} and {LONGITUDE_COLUMN} fields"),
        ));
    };
    let id_col = header_index(range, IDENTIFIER_COLUMN);

    Ok(range
        .rows()
        .enumerate()
        .skip(1)
        .filter(|(_, row)| row.iter().any(|cell| *cell != Data::Empty))
        .map(|(index, row)| {
            let id = id_col
                .and_then(|col| row.get(col))
                .and_then(cell_string)
                .unwrap_or_else(|| index.to_string());
            Coordinate::new(
                cell_f64(row.get(lat_col)).unwrap_or(f64::NAN),
                cell_f64(row.get(lon_col)).unwrap_or(f64::NAN),
                id,
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::range_from_rows;

    fn header() -> Vec<Data> {
        vec![
            Data::String(IDENTIFIER_COLUMN.to_string()),
            Data::String(LATITUDE_COLUMN.to_string()),
            Data::String(LONGITUDE_COLUMN.to_string()),
        ]
    }

    #[test]
    fn reads_coordinates() {
        let range = range_from_rows(&[
            header(),
            vec![Data::String("site-a".to_string()), Data::Float(52.1), Data::Float(-3.5)],
            vec![Data::Int(42), Data::Float(51.0), Data::Int(0)],
        ]);
        let coords = coordinates_from_range(&range, "coords.xlsx").unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[0], Coordinate::new(52.1, -3.5, "site-a"));
        assert_eq!(coords[1].id, "42");
        assert_eq!(coords[1].lon, 0.0);
    }

    #[test]
    fn blank_positions_become_nan() {
        let range = range_from_rows(&[
            header(),
            vec![Data::String("a".to_string()), Data::Empty, Data::Float(1.0)],
        ]);
        let coords = coordinates_from_range(&range, "coords.xlsx").unwrap();
        assert!(coords[0].is_nan());
    }

    #[test]
    fn missing_identifier_uses_row_number() {
        let range = range_from_rows(&[
            vec![
                Data::String(LATITUDE_COLUMN.to_string()),
                Data::String(LONGITUDE_COLUMN.to_string()),
            ],
            vec![Data::Float(1.0), Data::Float(2.0)],
            vec![Data::Empty, Data::Empty],
            vec![Data::Float(3.0), Data::Float(4.0)],
        ]);
        let coords = coordinates_from_range(&range, "coords.xlsx").unwrap();
        let ids: Vec<_> = coords.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn requires_position_columns() {
        let range = range_from_rows(&[vec![Data::String("Latitude".to_string())]]);
        let result = coordinates_from_range(&range, "coords.xlsx");
        assert!(matches!(result, Err(EcosseError::FormatError { .. })));
    }
}
