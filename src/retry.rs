//! Retry logic with a fixed delay between attempts
//!
//! Every failed attempt is logged, then the loop sleeps for the same delay
//! before trying again. The delay never grows and carries no jitter: the
//! remote API is polled by at most a handful of workers, so predictability
//! matters more than spreading load.
//!
//! # Example
//!
//! ```no_run
//! use doi_harvest::retry::{IsRetryable, RetryPolicy, retry_fixed};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "transient")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let policy = RetryPolicy::new(5, Duration::from_secs(1));
//! let value = retry_fixed(&policy, || async { Ok::<_, MyError>(7) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::FetchConfig;
use crate::error::Error;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, 5xx answers) should return `true`.
/// Permanent failures (bad configuration, unparseable URLs) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Transport failures are worth another attempt, including body reads.
            // A request that cannot even be built will fail the same way again.
            Error::Network(e) => !e.is_builder(),
            // The listing and works endpoints answer 404 for a while after deposit
            // and 429/5xx under load, so every non-success status is retried
            Error::HttpStatus { .. } => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            Error::Config { .. } => false,
            Error::UnknownJournal { .. } => false,
            Error::Serialization(_) => false,
            Error::InvalidUrl(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Attempt budget and pause between attempts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Pause after each failed attempt except the last
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; a zero budget is treated as a single attempt
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay)
    }
}

/// Execute an async operation, retrying transient failures with a fixed delay
///
/// # Arguments
///
/// * `policy` - Attempt budget and delay
/// * `operation` - Async closure that returns `Result<T, E>` where E implements IsRetryable
///
/// # Returns
///
/// The first successful result, or the last error once the budget is spent
/// or a non-retryable error is seen.
pub async fn retry_fixed<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(attempts = attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(error = %e, attempt, max_attempts, "attempt failed, giving up");
                } else {
                    tracing::error!(error = %e, "operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}
