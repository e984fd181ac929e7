//! Identifier listing (Crossref depositor report)
//!
//! The report is CRLF-delimited text. The first two lines are a header; every
//! following non-blank line starts with the identifier, followed by other
//! whitespace-separated columns that are ignored.

use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::types::Identifier;

/// Header lines at the top of every listing
const HEADER_LINES: usize = 2;

/// Build `<base>?pubid=<journal id>`
///
/// # Errors
/// Returns error if `base` is not a valid URL
pub fn listing_url(base: &str, pubid: &str) -> Result<String> {
    let mut url = url::Url::parse(base)?;
    url.query_pairs_mut().append_pair("pubid", pubid);
    Ok(url.into())
}

/// Extract identifiers from a listing body, in listing order
pub fn parse_listing(body: &str) -> Vec<Identifier> {
    body.split("\r\n")
        .skip(HEADER_LINES)
        .filter_map(|line| line.split_whitespace().next())
        .map(Identifier::from)
        .collect()
}

/// Fetch and parse the listing at `url`
///
/// Uses the fetcher's extended listing timeout. A failed fetch yields an
/// empty list, never an error.
pub async fn list_identifiers(fetcher: &Fetcher, url: &str) -> Vec<Identifier> {
    let Some(body) = fetcher.fetch(url, fetcher.listing_timeout()).await else {
        tracing::warn!(url, "listing unavailable, nothing to harvest");
        return Vec::new();
    };

    let identifiers = parse_listing(&body);
    tracing::info!(url, count = identifiers.len(), "fetched identifier listing");
    identifiers
}
