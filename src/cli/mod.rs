//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod config;
pub mod locate;
pub mod lookup;

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::Result;
use crate::geo::{get_geocoder, get_ip_locator, nominatim::NominatimBackend};
use crate::location::providers::{FixedLocationProvider, IpLocationProvider};
use crate::location::LocationSource;
use clap::{ArgAction, Parser, Subcommand};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

/// Find where you are and search for places nearby
#[derive(Parser)]
#[command(name = "place-lookup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the current location to a place
    Locate(locate::LocateArgs),

    /// Search nearby places interactively and pick one
    Lookup(lookup::LookupArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Locate(args) => locate::run(args).await,
        Commands::Lookup(args) => lookup::run(args).await,
        Commands::Config(args) => config::run(args),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Fixed position from `--lat/--lng`, otherwise IP-based positioning
pub(crate) fn location_source(
    config: &Config,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Result<LocationSource> {
    let source = match (lat, lng) {
        (Some(lat), Some(lng)) => {
            let coordinate = Coordinate::new(lat, lng);
            coordinate.validate()?;
            LocationSource::new(FixedLocationProvider::new(coordinate))
        }
        _ => LocationSource::new(IpLocationProvider::new(
            get_ip_locator(),
            config.poll_interval(),
        )),
    };
    Ok(source.with_single_fix(config.location.single_fix))
}

pub(crate) fn geocoder(config: &Config) -> Result<Arc<NominatimBackend>> {
    Ok(Arc::new(get_geocoder(
        &config.provider.nominatim_url,
        &config.provider.user_agent,
        config.search.max_results,
    )?))
}

/// Wait up to `timeout` for the source to have a fix
pub(crate) async fn wait_for_fix(
    location: &LocationSource,
    timeout: Duration,
) -> Option<Coordinate> {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    let _sub = location.on_update(move |coordinate| {
        let mut slot = tx.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(tx) = slot.take() {
            let _ = tx.send(*coordinate);
        }
    });

    if let Some(coordinate) = location.current_coordinate() {
        return Some(coordinate);
    }
    tokio::time::timeout(timeout, rx).await.ok()?.ok()
}
