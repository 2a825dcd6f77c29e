use super::{litter_source, load_config};
use anyhow::Result;
use clap::Args;
use ecosse_core::litter::{LitterResolver, LitterSource};
use ecosse_core::resolution::Resolution;
use ecosse_sources::coordinates::read_coordinates;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct CheckArgs {
    /// Study configuration file
    #[arg(short, long)]
    pub config: PathBuf,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let config = load_config(&args.config)?;

    let coordinates = read_coordinates(&config.study.coords_file)?;
    let unusable = coordinates.iter().filter(|c| c.is_nan()).count();
    println!(
        "Coordinates: {} records, {} without a position",
        coordinates.len(),
        unusable
    );

    let source = litter_source(&config)?;
    println!("Litter: {}", source.summary());
    if let LitterSource::Excel(series) = &source {
        println!("Average value: {:.2}", series.mean());
        return Ok(());
    }

    let resolver = LitterResolver::new(source);
    let context = config.resolver_context(config.weather.future, config.weather.historic);
    for coordinate in coordinates.iter().filter(|c| !c.is_nan()) {
        match resolver.resolve(coordinate, &context)? {
            Resolution::Resolved(inputs) => {
                if let Some((lat, lon)) = inputs.source_cell {
                    info!(
                        id = %coordinate.id,
                        study_lat = coordinate.lat,
                        study_lon = coordinate.lon,
                        cell_lat = lat,
                        cell_lon = lon,
                        "Litter cell"
                    );
                }
                println!("{}\tAverage value: {:.2}", coordinate.id, inputs.average);
            }
            Resolution::Skipped(reason) => println!("{}\tNo plant inputs: {reason}", coordinate.id),
        }
    }
    Ok(())
}
