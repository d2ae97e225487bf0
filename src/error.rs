//! Error types for place-lookup

use thiserror::Error;

/// Main error type for place-lookup operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Location access denied")]
    PermissionDenied,

    #[error("No location fix available yet")]
    NoFix,

    #[error("No place found for coordinates")]
    NotFound,

    #[error("No places found")]
    NoResults,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid radius: {0}")]
    InvalidRadius(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Async runtime unavailable: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether a session or search controller absorbs this error and keeps going
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Config(_) | Error::Runtime(_) | Error::Io(_))
    }
}

/// Result type alias for place-lookup operations
pub type Result<T> = std::result::Result<T, Error>;
