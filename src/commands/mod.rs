pub mod check;
pub mod init;
pub mod pfts;
pub mod run;

use anyhow::{Context, Result};
use ecosse_core::config::{LitterSourceKind, RunConfig};
use ecosse_core::litter::LitterSource;
use std::path::Path;

pub fn load_config(path: &Path) -> Result<RunConfig> {
    let config = RunConfig::load(path)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Read the configured litter source.
pub fn litter_source(config: &RunConfig) -> Result<LitterSource> {
    let path = config.litter.file();
    match config.litter.source {
        LitterSourceKind::Excel => {
            let litter = ecosse_sources::excel_litter::read_litter_workbook(path)?;
            Ok(LitterSource::Excel(litter.series))
        }
        LitterSourceKind::NetCdf => gridded_litter(path),
    }
}

#[cfg(feature = "netcdf")]
fn gridded_litter(path: &Path) -> Result<LitterSource> {
    let grid = ecosse_sources::netcdf::load_litter_grid(path)?;
    Ok(LitterSource::Gridded(std::sync::Arc::new(grid)))
}

#[cfg(not(feature = "netcdf"))]
fn gridded_litter(path: &Path) -> Result<LitterSource> {
    anyhow::bail!(
        "cannot read NetCDF litter {}: built without the netcdf feature",
        path.display()
    )
}
