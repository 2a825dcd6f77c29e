//! ECOSSE limited-data cell assembler
//!
//! Gathers soil, plant litter and climate for every coordinate of a study and writes
//! the inputs of one ECOSSE simulation per coordinate.
//!
//! # Usage
//!
//! ```bash
//! ecosse-cells init wales --config wales.toml
//! ecosse-cells check --config wales.toml
//! ecosse-cells run --config wales.toml --timeout 3600
//! ecosse-cells pfts
//! ```
//!
//! Litter and climate grids are NetCDF files, so `run` needs a build with the `netcdf`
//! feature (`cargo install --features netcdf`, with libnetcdf available). Without it
//! only Excel litter can be checked and `run` fails before any cell is assembled.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "ecosse-cells")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Assemble per-cell ECOSSE simulation inputs", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration for a new study
    Init(commands::init::InitArgs),
    /// Validate the coordinates and litter files of a study
    Check(commands::check::CheckArgs),
    /// Assemble simulation inputs for every coordinate (requires the netcdf feature)
    Run(commands::run::RunArgs),
    /// List the ORCHIDEE plant functional types
    Pfts,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init(args) => commands::init::execute(args),
        Commands::Check(args) => commands::check::execute(args),
        Commands::Run(args) => commands::run::execute(args),
        Commands::Pfts => commands::pfts::execute(),
    }
}
