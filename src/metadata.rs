//! Metadata retrieval and validation
//!
//! Each identifier is appended to the API base URL, fetched, parsed as JSON
//! and kept only when `message.type` is `journal-article`. Nothing in here
//! returns an error: failures become a [`Retrieval`] outcome.

use crate::fetcher::Fetcher;
use crate::types::{Identifier, MetadataRecord, Retrieval};
use serde_json::Value;

/// Fetches and filters metadata records for single identifiers
#[derive(Clone, Debug)]
pub struct Retriever {
    fetcher: Fetcher,
    api_base: String,
}

impl Retriever {
    /// Create a retriever for `api_base` (identifiers are appended verbatim)
    pub fn new(fetcher: Fetcher, api_base: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_base: api_base.into(),
        }
    }

    /// Request URL for `id`
    pub fn record_url(&self, id: &Identifier) -> String {
        format!("{}{}", self.api_base, id)
    }

    /// Fetch, parse and validate the record for `id`
    pub async fn retrieve(&self, id: &Identifier) -> Retrieval {
        let url = self.record_url(id);
        let Some(body) = self.fetcher.fetch_default(&url).await else {
            return Retrieval::FetchFailed;
        };
        classify(id, &body)
    }

    /// The accepted record for `id`, or `None` for any kind of miss
    pub async fn retrieve_and_validate(&self, id: &Identifier) -> Option<MetadataRecord> {
        self.retrieve(id).await.into_record()
    }
}

/// Turn a response body into a retrieval outcome
pub fn classify(id: &Identifier, body: &str) -> Retrieval {
    if body.trim().is_empty() {
        tracing::debug!(identifier = %id, "empty metadata body");
        return Retrieval::Unparseable;
    }

    let document: Value = match serde_json::from_str(body) {
        Ok(document) => document,
        Err(e) => {
            tracing::debug!(identifier = %id, error = %e, "metadata body is not JSON");
            return Retrieval::Unparseable;
        }
    };

    match MetadataRecord::validate(document) {
        Ok(record) => Retrieval::Accepted(record),
        Err(reason) => {
            tracing::debug!(identifier = %id, %reason, "record filtered");
            Retrieval::Rejected(reason)
        }
    }
}
