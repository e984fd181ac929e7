//! Resilient HTTP fetcher
//!
//! [`Fetcher::fetch`] never fails: after the attempt budget is spent it
//! returns `None` and the caller skips that unit of work. One log line is
//! emitted per failed attempt.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, retry_fixed};
use std::time::Duration;

/// Shared HTTP client plus the retry policy for every GET
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
    timeout: Duration,
    listing_timeout: Duration,
}

impl Fetcher {
    /// Build a fetcher from configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &FetchConfig) -> Result<Self> {
        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled for all requests");
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            policy: RetryPolicy::from(config),
            timeout: config.timeout,
            listing_timeout: config.listing_timeout,
        })
    }

    /// Timeout used for metadata records
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timeout used for identifier listings
    pub fn listing_timeout(&self) -> Duration {
        self.listing_timeout
    }

    /// GET `url` with the default timeout
    pub async fn fetch_default(&self, url: &str) -> Option<String> {
        self.fetch(url, self.timeout).await
    }

    /// GET `url`, retrying transport failures and non-success statuses
    ///
    /// Returns the body of the first successful response, or `None` once
    /// every attempt has failed.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Option<String> {
        match retry_fixed(&self.policy, || self.try_get(url, timeout)).await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!(url, error = %e, "no body for URL");
                None
            }
        }
    }

    async fn try_get(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self.client.get(url).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
