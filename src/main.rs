//! place-lookup CLI entry point
//!
//! Current-location place lookup with debounced nearby search

use place_lookup::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
