//! # doi-harvest
//!
//! Harvests Crossref metadata for every article of a journal.
//!
//! ## Pipeline
//!
//! 1. The journal's depositor report is fetched and parsed into identifiers
//!    ([`listing`]).
//! 2. Identifiers are grouped by journal, volume and zero-padded issue
//!    ([`partition`]).
//! 3. A bounded pool of jobs, one per partition, fetches each record with
//!    retries ([`fetcher`], [`metadata`], [`dispatcher`]).
//! 4. Records whose `message.type` is `journal-article` are written as JSON
//!    lines, one file per partition or one shared stream ([`sink`]).
//!
//! Failures never abort a run. Unreachable URLs, unparseable bodies and
//! records of other types are logged, counted and skipped.
//!
//! ## Quick Start
//!
//! ```no_run
//! use doi_harvest::{HarvestConfig, Harvester, JournalTable};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let harvester = Harvester::new(&HarvestConfig::default())?;
//!
//!     for (name, listing) in JournalTable::builtin().resolve("all")? {
//!         let summary = harvester
//!             .harvest_to_dir(&listing, &Path::new("output").join(&name))
//!             .await?;
//!         println!("{name}: {} records", summary.accepted());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Bounded partition dispatcher
pub mod dispatcher;
/// Error types
pub mod error;
/// HTTP GET with fixed-delay retries
pub mod fetcher;
/// End-to-end harvest
pub mod harvester;
/// Journal name to listing URL table
pub mod journals;
/// Identifier listing
pub mod listing;
/// Metadata retrieval and validation
pub mod metadata;
/// Partition keys and buckets
pub mod partition;
/// Retry logic with a fixed delay
pub mod retry;
/// Output sinks
pub mod sink;
/// Core types
pub mod types;

pub use config::{FetchConfig, HarvestConfig, OutputConfig, OutputMode};
pub use dispatcher::{Dispatcher, RecordSource};
pub use error::{Error, Result};
pub use fetcher::Fetcher;
pub use harvester::Harvester;
pub use journals::JournalTable;
pub use metadata::Retriever;
pub use partition::{Partitions, partition, partition_key};
pub use sink::{PartitionWriter, PartitionedFiles, RecordSink, SharedStream};
pub use types::{
    HarvestSummary, Identifier, MetadataRecord, PartitionKey, PartitionReport, RejectReason,
    Retrieval,
};
