//! Core types for doi-harvest

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Discriminator value a record must carry in `message.type` to be kept
pub const JOURNAL_ARTICLE: &str = "journal-article";

/// Publication identifier as read from a listing (DOI-like, dot separated)
///
/// Opaque to the pipeline apart from partition key derivation. Identifiers
/// are not assumed to be unique.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Wrap a raw identifier token
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Grouping key `<journal>.<volume>.<padded issue>`
///
/// Ordered lexicographically on the string form, which is also the dispatch
/// order. Built only by [`crate::partition::partition_key`], so it always has
/// at least three dot-separated segments.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub(crate) fn from_parts(journal: &str, volume: &str, issue: &str) -> Self {
        Self(format!("{journal}.{volume}.{issue}"))
    }

    /// Borrow the key string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Output file name for this partition: `<volume>.<issue>.txt`
    ///
    /// The journal segment is dropped. Path separators are replaced so the
    /// file always lands directly in the output directory.
    pub fn file_name(&self) -> String {
        let stem = match self.0.split_once('.') {
            Some((_, rest)) => rest,
            None => self.0.as_str(),
        };
        format!("{}.txt", sanitize_stem(stem))
    }

    /// Output file name keeping every key segment: `<journal>.<volume>.<issue>.txt`
    ///
    /// Used when [`PartitionKey::file_name`] is shared with another partition.
    pub fn qualified_file_name(&self) -> String {
        format!("{}.txt", sanitize_stem(&self.0))
    }
}

fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A metadata document that passed the `message.type` check
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataRecord(Value);

impl MetadataRecord {
    /// Keep `document` only if `message.type` equals [`JOURNAL_ARTICLE`]
    pub fn validate(document: Value) -> Result<Self, RejectReason> {
        let Some(message) = document.get("message") else {
            return Err(RejectReason::MissingMessage);
        };
        match message.get("type") {
            Some(Value::String(kind)) if kind == JOURNAL_ARTICLE => Ok(Self(document)),
            Some(Value::String(kind)) => Err(RejectReason::OtherType(kind.clone())),
            Some(_) | None => Err(RejectReason::MissingType),
        }
    }

    /// The full response document
    pub fn document(&self) -> &Value {
        &self.0
    }

    /// `message.DOI` if present
    pub fn doi(&self) -> Option<&str> {
        self.0.get("message")?.get("DOI")?.as_str()
    }

    /// Serialize as one compact JSON line terminated by `\n`
    ///
    /// Non-ASCII text is written as UTF-8, not escaped.
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(&self.0)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Why a parsed document was filtered out
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// No `message` object
    MissingMessage,
    /// `message` present without a string `type`
    MissingType,
    /// `message.type` is something other than `journal-article`
    OtherType(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingMessage => write!(f, "missing message"),
            RejectReason::MissingType => write!(f, "missing message.type"),
            RejectReason::OtherType(kind) => write!(f, "type '{kind}'"),
        }
    }
}

/// Outcome of retrieving one identifier
#[derive(Clone, Debug)]
pub enum Retrieval {
    /// Record fetched, parsed and accepted
    Accepted(MetadataRecord),
    /// Parsed but filtered by the discriminator
    Rejected(RejectReason),
    /// Body was empty or not JSON
    Unparseable,
    /// Every fetch attempt failed
    FetchFailed,
}

impl Retrieval {
    /// The accepted record, if any
    pub fn into_record(self) -> Option<MetadataRecord> {
        match self {
            Retrieval::Accepted(record) => Some(record),
            _ => None,
        }
    }
}

/// Per-partition counters produced by a dispatcher job
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PartitionReport {
    /// Partition this report belongs to
    pub key: Option<PartitionKey>,
    /// Identifiers the job got through (fewer than assigned if the sink failed)
    pub attempted: usize,
    /// Records written
    pub accepted: usize,
    /// Records dropped by the discriminator
    pub rejected: usize,
    /// Bodies that were empty or not JSON
    pub unparseable: usize,
    /// Identifiers whose fetch exhausted every attempt
    pub fetch_failed: usize,
    /// File written for this partition, if any record was accepted
    pub output: Option<PathBuf>,
    /// Set when the job stopped early (sink failure or panic)
    pub error: Option<String>,
}

impl PartitionReport {
    /// Empty report for `key`
    pub fn new(key: PartitionKey) -> Self {
        Self {
            key: Some(key),
            ..Default::default()
        }
    }

    /// Count one retrieval outcome
    pub fn record(&mut self, outcome: &Retrieval) {
        self.attempted += 1;
        match outcome {
            Retrieval::Accepted(_) => self.accepted += 1,
            Retrieval::Rejected(_) => self.rejected += 1,
            Retrieval::Unparseable => self.unparseable += 1,
            Retrieval::FetchFailed => self.fetch_failed += 1,
        }
    }
}

/// Result of a whole harvest run
#[derive(Clone, Debug, Default, Serialize)]
pub struct HarvestSummary {
    /// Identifiers read from the listing
    pub listed: usize,
    /// Identifiers that could not be assigned a partition key
    pub unkeyed: usize,
    /// One report per partition, in key order
    pub partitions: Vec<PartitionReport>,
    /// Wall-clock duration of the run
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl HarvestSummary {
    /// Records written across all partitions
    pub fn accepted(&self) -> usize {
        self.partitions.iter().map(|p| p.accepted).sum()
    }

    /// Identifiers whose fetch failed across all partitions
    pub fn fetch_failed(&self) -> usize {
        self.partitions.iter().map(|p| p.fetch_failed).sum()
    }

    /// Identifiers filtered out (wrong type or unparseable)
    pub fn dropped(&self) -> usize {
        self.partitions
            .iter()
            .map(|p| p.rejected + p.unparseable)
            .sum()
    }
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}
