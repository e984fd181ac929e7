//! Error types for doi-harvest
//!
//! Most failures in the harvest pipeline are soft: a fetch that exhausts its
//! retries degrades to an empty result and a malformed record is simply not
//! written. The variants here cover what still has to be reported:
//! - configuration problems found before any network activity
//! - transport and HTTP status failures seen by the retry loop
//! - I/O and serialization failures from the output sink

use thiserror::Error;

/// Result type alias for doi-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for doi-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_base")
        key: Option<String>,
    },

    /// Journal name not present in the journal table
    #[error("unknown journal '{name}' (available: {})", .available.join(", "))]
    UnknownJournal {
        /// The name that was requested
        name: String,
        /// Every name the table knows about, sorted
        available: Vec<String>,
    },

    /// Transport-level failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status code returned by the server
        status: u16,
        /// Requested URL
        url: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a configuration key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
