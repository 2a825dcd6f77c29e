use super::{litter_source, load_config};
use anyhow::{bail, Context, Result};
use clap::Args;
use ecosse_core::assembler::CellAssembler;
use ecosse_core::climate::{ClimateDataset, ClimateResolver};
use ecosse_core::config::RunConfig;
use ecosse_core::litter::LitterResolver;
use ecosse_core::soil::SoilResolver;
use ecosse_core::spatial::BoundingBox;
use ecosse_sources::coordinates::read_coordinates;
use ecosse_sources::hwsd::HwsdGrid;
use ecosse_sources::json_writer::JsonCellWriter;
use ecosse_sources::study::write_study_definition;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args)]
pub struct RunArgs {
    /// Study configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Number of worker threads, overriding the configuration
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Stop starting new coordinates after this many seconds, overriding the configuration
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

/// Set `token` once `limit` has elapsed.
fn cancel_after(token: Arc<AtomicBool>, limit: Duration) -> JoinHandle<()> {
    std::thread::spawn(move || {
        std::thread::sleep(limit);
        if !token.swap(true, Ordering::SeqCst) {
            warn!(seconds = limit.as_secs(), "Run timed out, finishing coordinates in progress");
        }
    })
}

#[cfg(feature = "netcdf")]
fn climate_dataset(config: &RunConfig) -> Result<Arc<dyn ClimateDataset>> {
    let files = config.weather.files()?;
    let dataset = ecosse_sources::netcdf::load_climate_dataset(
        &config.weather.resource,
        files,
        config.weather.family(),
    )?;
    Ok(Arc::new(dataset))
}

#[cfg(not(feature = "netcdf"))]
fn climate_dataset(config: &RunConfig) -> Result<Arc<dyn ClimateDataset>> {
    bail!(
        "cannot read climate for {}: built without the netcdf feature",
        config.weather.resource
    )
}

pub fn execute(args: RunArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(workers) = args.workers {
        config.run.workers = workers;
        config.validate()?;
    }
    if let Some(timeout) = args.timeout {
        config.run.timeout_secs = timeout;
    }

    let coordinates = read_coordinates(&config.study.coords_file)?;
    let Some(bbox) = BoundingBox::enclosing(&coordinates) else {
        bail!(
            "no coordinates with a position in {}",
            config.study.coords_file.display()
        );
    };

    let soil = HwsdGrid::open(&config.soil.hwsd_dir)
        .with_context(|| format!("failed to open HWSD in {}", config.soil.hwsd_dir.display()))?;
    let litter = litter_source(&config)?;
    let climate = ClimateResolver::new(climate_dataset(&config)?, config.weather.family());
    let (simulation, historic) = climate.windows(config.weather.future, config.weather.historic)?;
    let context = config.resolver_context(simulation, historic);
    info!(
        resource = %config.weather.resource,
        family = %climate.family(),
        %simulation,
        %historic,
        "Simulation windows"
    );

    let cancellation = Arc::new(AtomicBool::new(false));
    if config.run.timeout_secs > 0 {
        // Detached; the process exits once the batch is written
        cancel_after(
            cancellation.clone(),
            Duration::from_secs(config.run.timeout_secs),
        );
    }

    let assembler = CellAssembler::new(
        config.study_settings(),
        SoilResolver::new(Arc::new(soil)),
        LitterResolver::new(litter),
        climate,
        Arc::new(JsonCellWriter::new(config.study_dir())),
    )
    .with_workers(config.run.workers)
    .with_soil_no_data(config.run.on_soil_no_data)
    .with_cancellation(cancellation);

    let result = assembler.run(&coordinates, &context)?;
    let definition = write_study_definition(&config, &bbox, env!("CARGO_PKG_VERSION"))?;
    println!("Wrote study definition file {}", definition.display());
    println!("{result}");
    if result.aborted {
        bail!("batch stopped at a coordinate without soil data");
    }
    if result.cancelled {
        bail!(
            "batch stopped after {} seconds, rerun to complete the remaining coordinates",
            config.run.timeout_secs
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_sets_the_token() {
        let token = Arc::new(AtomicBool::new(false));
        cancel_after(token.clone(), Duration::from_millis(10))
            .join()
            .unwrap();
        assert!(token.load(Ordering::SeqCst));
    }

    #[cfg(not(feature = "netcdf"))]
    #[test]
    fn climate_needs_the_netcdf_feature() {
        let config = RunConfig::default_for("wales");
        let err = climate_dataset(&config).err().unwrap();
        assert_eq!(
            err.to_string(),
            "cannot read climate for CRU: built without the netcdf feature"
        );
    }
}
