//! Configuration types for doi-harvest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Lowest accepted worker count
pub const MIN_WORKERS: usize = 1;

/// Highest accepted worker count; the metadata API expects polite clients
pub const MAX_WORKERS: usize = 10;

/// Crossref works endpoint, identifiers are appended verbatim
pub const DEFAULT_API_BASE: &str = "https://api.crossref.org/works/";

/// Crossref depositor report endpoint, queried with `?pubid=<journal id>`
pub const DEFAULT_LISTING_BASE: &str = "http://data.crossref.org/depositorreport";

/// HTTP fetch behavior (timeouts, retry budget, TLS posture)
///
/// Retries use a single fixed delay between attempts; there is no exponential
/// growth and no jitter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout for metadata records (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Per-request timeout for the identifier listing (default: 120 seconds)
    ///
    /// Listings for large journals run to several megabytes.
    #[serde(default = "default_listing_timeout", with = "duration_serde")]
    pub listing_timeout: Duration,

    /// Total number of attempts per URL, including the first (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between attempts (default: 1000 ms)
    #[serde(
        default = "default_retry_delay",
        rename = "retry_delay_ms",
        with = "millis_serde"
    )]
    pub retry_delay: Duration,

    /// Skip TLS certificate verification (default: false)
    ///
    /// Only for endpoints with broken certificate chains. A warning is logged
    /// whenever a client is built with this enabled.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            listing_timeout: default_listing_timeout(),
            max_attempts: default_max_attempts(),
            retry_delay: default_retry_delay(),
            accept_invalid_certs: false,
            user_agent: default_user_agent(),
        }
    }
}

/// Where accepted records go
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One `<volume>.<issue>.txt` file per partition (default)
    #[default]
    Partitioned,
    /// All records to one shared stream, one line per record
    Stream,
}

/// Output sink configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Sink flavour
    #[serde(default)]
    pub mode: OutputMode,

    /// Directory for partition files (default: ".")
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            dir: default_output_dir(),
        }
    }
}

/// Main configuration for a harvest run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Base URL the identifier is appended to (default: Crossref works API)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Number of partitions processed concurrently (default: 10, clamped to 1..=10)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// HTTP settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            workers: default_workers(),
            fetch: FetchConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Check settings that cannot be repaired by clamping
    ///
    /// Runs before any network activity so the operator sees configuration
    /// mistakes immediately.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout.is_zero() {
            return Err(Error::config("timeout", "fetch timeout must be positive"));
        }
        if self.fetch.listing_timeout.is_zero() {
            return Err(Error::config(
                "listing_timeout",
                "listing timeout must be positive",
            ));
        }
        if self.fetch.max_attempts == 0 {
            return Err(Error::config(
                "max_attempts",
                "at least one fetch attempt is required",
            ));
        }
        let base = url::Url::parse(&self.api_base)
            .map_err(|e| Error::config("api_base", format!("{}: {}", self.api_base, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                "api_base",
                format!("unsupported scheme '{}'", base.scheme()),
            ));
        }
        Ok(())
    }

    /// Worker count after clamping into `MIN_WORKERS..=MAX_WORKERS`
    pub fn effective_workers(&self) -> usize {
        clamp_workers(self.workers)
    }
}

/// Clamp a requested worker count into the accepted range
///
/// Out-of-range values are corrected rather than rejected.
pub fn clamp_workers(requested: usize) -> usize {
    let clamped = requested.clamp(MIN_WORKERS, MAX_WORKERS);
    if clamped != requested {
        tracing::warn!(
            requested,
            clamped,
            "worker count out of range, clamping"
        );
    }
    clamped
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_listing_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_user_agent() -> String {
    format!("doi-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_workers() -> usize {
    MAX_WORKERS
}

// Duration serialization helper (seconds, fractional when needed)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

// Duration serialization helper (milliseconds)
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
