//! Lookup command handler
//!
//! Interactive nearby search. Every stdin line is a new edit of the query
//! text; results arrive once typing settles. `:pick N` selects result N,
//! `:quit` (or end of input) prints the selected place and exits.

use crate::cli::{geocoder, location_source, wait_for_fix};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::get_formatter;
use crate::search::DebouncedSearchController;
use crate::session::PlaceLookupSession;
use clap::Args;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Lookup command arguments
#[derive(Args)]
pub struct LookupArgs {
    /// Latitude (skips IP positioning)
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude (skips IP positioning)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Search radius in meters
    #[arg(long, short = 'r')]
    pub radius: Option<f64>,

    /// Output format for the final selection
    #[arg(long, short = 'f', default_value = "text")]
    pub format: String,

    /// Seconds to wait for a location fix before searching unbounded
    #[arg(long, default_value = "10")]
    pub fix_timeout: u64,
}

/// An input line, parsed
#[derive(Debug, PartialEq)]
enum Input {
    Quit,
    Pick(usize),
    Query(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    match trimmed {
        ":quit" | ":q" => Input::Quit,
        _ => match trimmed.strip_prefix(":pick ") {
            Some(n) => n
                .trim()
                .parse()
                .map(Input::Pick)
                .unwrap_or_else(|_| Input::Query(trimmed.to_string())),
            None => Input::Query(trimmed.to_string()),
        },
    }
}

/// Run the lookup command
pub async fn run(args: LookupArgs) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(&args.format)
        .ok_or_else(|| Error::Config(format!("Unknown format: {}", args.format)))?;
    let radius = args.radius.unwrap_or(config.search.radius);

    let service = geocoder(&config)?;
    let location = location_source(&config, args.lat, args.lng)?;
    let policy = config.selection_policy();
    let session = PlaceLookupSession::with_policy(location.clone(), service.clone(), policy);
    session.start()?;
    location.start();

    match wait_for_fix(&location, Duration::from_secs(args.fix_timeout)).await {
        Some(fix) => eprintln!("Searching near {}", fix),
        None => eprintln!("No location fix; searching without a region"),
    }

    let controller =
        DebouncedSearchController::for_location(service, &location, radius, config.settle_delay())?;

    let mut results = controller.subscribe();
    let results_printer = tokio::spawn(async move {
        while results.changed().await.is_ok() {
            let places = results.borrow_and_update().clone();
            if places.is_empty() {
                println!("No results");
                continue;
            }
            for (i, place) in places.iter().enumerate() {
                println!("{:3}. {} - {}", i + 1, place.name(), place.address());
            }
        }
    });

    let mut selected = session.subscribe();
    let selection_printer = tokio::spawn(async move {
        while selected.changed().await.is_ok() {
            if let Some(place) = selected.borrow_and_update().as_ref() {
                println!("Current place: {}", place.name());
            }
        }
    });

    eprintln!("Type to search, ':pick N' to select, ':quit' to finish");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Input::Quit => break,
            Input::Pick(n) => match controller.results().get(n.wrapping_sub(1)) {
                Some(place) => {
                    session.select_manually(place.clone());
                    controller.set_query_text("");
                }
                None => eprintln!("No result number {}", n),
            },
            Input::Query(text) => {
                debug!("Query edit: '{}'", text);
                controller.set_query_text(text);
            }
        }
    }

    controller.dispose();
    location.stop();
    results_printer.abort();
    selection_printer.abort();

    match session.selected_place() {
        Some(place) => println!("{}", formatter.format(&place, &config)?),
        None => {
            if let Some(message) = session.advisory() {
                eprintln!("{}", message);
            }
            eprintln!("No place selected");
        }
    }
    Ok(())
}
