//! Locate command handler
//!
//! Resolves the current location to a place and prints it.

use crate::cli::{geocoder, location_source};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::{available_formats, get_formatter, url::UrlFormatter};
use crate::geo::GeocodingService;
use crate::place::PlaceRecord;
use crate::session::PlaceLookupSession;
use clap::Args;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Locate command arguments
#[derive(Args)]
pub struct LocateArgs {
    /// Latitude (skips IP positioning)
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude (skips IP positioning)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Output format
    #[arg(long, short = 'f', default_value = "text")]
    pub format: String,

    /// Map provider for the url format
    #[arg(long)]
    pub map: Option<String>,

    /// Give up after this many seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// List available formats
    #[arg(short = 'F', long = "list-formats")]
    pub list_formats: bool,
}

/// Run the locate command
pub async fn run(args: LocateArgs) -> Result<()> {
    if args.list_formats {
        list_formats();
        return Ok(());
    }

    let config = Config::load()?;
    let formatter = get_formatter(&args.format)
        .ok_or_else(|| Error::Config(format!("Unknown format: {}", args.format)))?;

    let location = location_source(&config, args.lat, args.lng)?;
    let policy = config.selection_policy();
    let session = PlaceLookupSession::with_policy(location.clone(), geocoder(&config)?, policy);
    let mut selected = session.subscribe();

    session.start()?;
    location.start();

    let deadline = Instant::now() + Duration::from_secs(args.timeout);
    let place = wait_for_place(&session, &mut selected, deadline).await?;

    let output = match (&args.map, args.format.to_lowercase().as_str()) {
        (Some(map), "url") => UrlFormatter.format_with_provider(&place, &config, Some(map))?,
        _ => formatter.format(&place, &config)?,
    };
    println!("{}", output);

    location.stop();
    Ok(())
}

/// Wait for the session to select a place, failing early on reported errors
async fn wait_for_place<G: GeocodingService + 'static>(
    session: &PlaceLookupSession<G>,
    selected: &mut watch::Receiver<Option<PlaceRecord>>,
    deadline: Instant,
) -> Result<PlaceRecord> {
    loop {
        if let Some(place) = selected.borrow_and_update().clone() {
            return Ok(place);
        }
        if session.location().authorization().is_refused() {
            return Err(Error::PermissionDenied);
        }
        if let Some(message) = session.advisory() {
            eprintln!("Could not resolve current place: {}", message);
            return Err(Error::NotFound);
        }
        if Instant::now() >= deadline {
            if let Some(message) = session.location().last_error() {
                eprintln!("Location error: {}", message);
            }
            return Err(Error::NoFix);
        }

        tokio::select! {
            changed = selected.changed() => {
                if changed.is_err() {
                    return Err(Error::NoFix);
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
        }
    }
}

/// Print available output formats
fn list_formats() {
    println!("Available output formats:");
    for format in available_formats() {
        println!("  {:6} - {}", format.name, format.description);
    }
}
