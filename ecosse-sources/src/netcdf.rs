//! NetCDF litter and climate grids
//!
//! Grids are read whole into memory when a batch starts. Litter comes from ORCHIDEE
//! output (`TOTAL_BM_LITTER_c` with dimensions `(time_centered, pft, lat, lon)`) and
//! monthly climate from files holding `precip` and `tas` on `(time, lat, lon)`.

use ecosse_core::cftime::{CfCalendar, CfTimeUnits};
use ecosse_core::climate::{ClimateGrid, GriddedClimateDataset, ResourceFamily};
use ecosse_core::config::ClimateFiles;
use ecosse_core::errors::{EcosseError, EcosseResult};
use ecosse_core::litter::LitterGrid;
use ecosse_core::spatial::GridAxis;
use ecosse_core::timeseries::Year;
use ndarray::{Array3, Array4};
use netcdf::AttributeValue;
use std::path::Path;
use tracing::info;

pub const LITTER_VARIABLE: &str = "TOTAL_BM_LITTER_c";
pub const LITTER_TIME: &str = "time_centered";
pub const PRECIPITATION_VARIABLE: &str = "precip";
pub const TEMPERATURE_VARIABLE: &str = "tas";

/// Values at or above this magnitude are unset cells written with the library default
/// fill value.
const DEFAULT_FILL_THRESHOLD: f64 = 9.0e36;

struct Dataset {
    file: netcdf::File,
    source: String,
}

impl Dataset {
    fn open(path: &Path) -> EcosseResult<Self> {
        if !path.is_file() {
            return Err(EcosseError::MissingFile(path.to_path_buf()));
        }
        let source = path.display().to_string();
        let file = netcdf::open(path).map_err(|e| EcosseError::format(&source, e.to_string()))?;
        Ok(Self { file, source })
    }

    fn variable(&self, name: &str) -> EcosseResult<netcdf::Variable<'_>> {
        self.file.variable(name).ok_or_else(|| {
            EcosseError::format(&self.source, format!("variable {name} must be in dataset"))
        })
    }

    fn shape(&self, name: &str) -> EcosseResult<Vec<usize>> {
        Ok(self
            .variable(name)?
            .dimensions()
            .iter()
            .map(|d| d.len())
            .collect())
    }

    /// Every value of a variable with fill values replaced by NaN.
    fn values(&self, name: &str) -> EcosseResult<Vec<f64>> {
        let var = self.variable(name)?;
        let fill = ["_FillValue", "missing_value"]
            .iter()
            .find_map(|attr| var.attribute(attr).and_then(|a| a.value().ok()))
            .and_then(|value| attribute_f64(&value));
        let mut values = var
            .get_values::<f64, _>(..)
            .map_err(|e| EcosseError::format(&self.source, format!("{name}: {e}")))?;
        for value in values.iter_mut() {
            if fill.is_some_and(|fill| *value == fill) || value.abs() >= DEFAULT_FILL_THRESHOLD {
                *value = f64::NAN;
            }
        }
        Ok(values)
    }

    fn string_attribute(&self, variable: &str, name: &str) -> EcosseResult<Option<String>> {
        Ok(self
            .variable(variable)?
            .attribute(name)
            .and_then(|a| a.value().ok())
            .and_then(|value| match value {
                AttributeValue::Str(s) => Some(s),
                _ => None,
            }))
    }

    fn axis(&self, name: &str) -> EcosseResult<GridAxis> {
        GridAxis::new(self.values(name)?)
            .map_err(|e| EcosseError::format(&self.source, format!("{name}: {e}")))
    }

    /// Year of the first time coordinate.
    fn start_year(&self, time: &str, default_calendar: CfCalendar) -> EcosseResult<Year> {
        let units = self.string_attribute(time, "units")?.ok_or_else(|| {
            EcosseError::format(&self.source, format!("{time} has no units attribute"))
        })?;
        let calendar = match self.string_attribute(time, "calendar")? {
            Some(calendar) => calendar.parse()?,
            None => default_calendar,
        };
        let first = self
            .values(time)?
            .first()
            .copied()
            .ok_or_else(|| EcosseError::format(&self.source, format!("{time} is empty")))?;
        CfTimeUnits::parse(&units)?.year_at(first, calendar)
    }
}

fn attribute_f64(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Double(v) => Some(*v),
        AttributeValue::Float(v) => Some(f64::from(*v)),
        AttributeValue::Int(v) => Some(f64::from(*v)),
        AttributeValue::Short(v) => Some(f64::from(*v)),
        _ => None,
    }
}

fn shape_error(source: &str, name: &str, shape: &[usize], expected: &str) -> EcosseError {
    EcosseError::format(
        source,
        format!("{name} has shape {shape:?}, expected {expected}"),
    )
}

/// Load an ORCHIDEE litter file.
pub fn load_litter_grid(path: &Path) -> EcosseResult<LitterGrid> {
    let dataset = Dataset::open(path)?;
    let lats = dataset.axis("lat")?;
    let lons = dataset.axis("lon")?;
    let start_year = dataset.start_year(LITTER_TIME, CfCalendar::Standard)?;

    let shape = dataset.shape(LITTER_VARIABLE)?;
    let [ntimes, npfts, nlats, nlons] = shape[..] else {
        return Err(shape_error(
            &dataset.source,
            LITTER_VARIABLE,
            &shape,
            "(time, pft, lat, lon)",
        ));
    };
    let values = Array4::from_shape_vec(
        (ntimes, npfts, nlats, nlons),
        dataset.values(LITTER_VARIABLE)?,
    )
    .map_err(|e| EcosseError::format(&dataset.source, e.to_string()))?;

    let grid = LitterGrid::new(lats, lons, start_year, values)?;
    info!(
        path = %path.display(),
        start_year,
        extent = %grid.extent_summary(),
        "Loaded litter grid"
    );
    Ok(grid)
}

/// Load one period of monthly climate.
pub fn load_climate_grid(path: &Path, default_calendar: CfCalendar) -> EcosseResult<ClimateGrid> {
    let dataset = Dataset::open(path)?;
    let lats = dataset.axis("lat")?;
    let lons = dataset.axis("lon")?;
    let start_year = dataset.start_year("time", default_calendar)?;

    let mut fields = Vec::with_capacity(2);
    for name in [PRECIPITATION_VARIABLE, TEMPERATURE_VARIABLE] {
        let shape = dataset.shape(name)?;
        let [nmonths, nlats, nlons] = shape[..] else {
            return Err(shape_error(&dataset.source, name, &shape, "(time, lat, lon)"));
        };
        let values = Array3::from_shape_vec((nmonths, nlats, nlons), dataset.values(name)?)
            .map_err(|e| EcosseError::format(&dataset.source, e.to_string()))?;
        fields.push(values);
    }
    let (Some(temperature), Some(precipitation)) = (fields.pop(), fields.pop()) else {
        return Err(EcosseError::format(&dataset.source, "climate variables missing"));
    };

    let grid = ClimateGrid::new(lats, lons, start_year, precipitation, temperature)?;
    info!(
        path = %path.display(),
        years = %grid.years(),
        "Loaded climate grid"
    );
    Ok(grid)
}

/// Load the configured files of a weather resource.
///
/// Resources that serve the historic period from their future files only need a
/// future file.
pub fn load_climate_dataset(
    name: &str,
    files: &ClimateFiles,
    family: ResourceFamily,
) -> EcosseResult<GriddedClimateDataset> {
    let future = load_climate_grid(&files.future, family.calendar())?;
    let historic = match (&files.historic, family.historic_uses_future_grid()) {
        (_, true) => None,
        (Some(path), false) => Some(load_climate_grid(path, family.calendar())?),
        (None, false) => {
            return Err(EcosseError::InvalidConfig(format!(
                "weather resource {name} needs a historic dataset file"
            )))
        }
    };
    Ok(GriddedClimateDataset::new(name, future, historic))
}
