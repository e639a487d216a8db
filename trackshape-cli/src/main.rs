/// Trackshape - MSTS track shape command line tool
///
/// Inspects text shapes, toggles compression through ffeditc, prints the
/// routes of track shapes from tsection.dat and moves rail geometry to new
/// lateral offsets from the track.
use anyhow::Result;
use clap::Parser;
use trackshape_cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    trackshape_cli::run(cli)
}
