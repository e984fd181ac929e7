//! End-to-end harvest: listing → partitions → bounded dispatch → sink.

use crate::config::HarvestConfig;
use crate::dispatcher::{Dispatcher, RecordSource};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::listing::list_identifiers;
use crate::metadata::Retriever;
use crate::partition::partition;
use crate::sink::{PartitionedFiles, RecordSink};
use crate::types::HarvestSummary;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Harvests every journal-article record listed for a journal
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone, Debug)]
pub struct Harvester {
    fetcher: Fetcher,
    retriever: Arc<Retriever>,
    dispatcher: Dispatcher,
}

impl Harvester {
    /// Validate `config` and build the HTTP client
    ///
    /// # Errors
    /// Returns error for invalid configuration or if the HTTP client cannot
    /// be created. No network activity happens here.
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = Fetcher::new(&config.fetch)?;
        let retriever = Arc::new(Retriever::new(fetcher.clone(), config.api_base.clone()));
        Ok(Self {
            fetcher,
            retriever,
            dispatcher: Dispatcher::new(config.workers),
        })
    }

    /// Worker count in effect after clamping
    pub fn workers(&self) -> usize {
        self.dispatcher.concurrency()
    }

    /// Harvest the journal whose listing lives at `listing_url` into `sink`
    ///
    /// Never fails: an unavailable listing gives an empty summary and
    /// per-record problems are counted in the partition reports.
    pub async fn harvest(&self, listing_url: &str, sink: Arc<dyn RecordSink>) -> HarvestSummary {
        let started = Instant::now();

        let identifiers = list_identifiers(&self.fetcher, listing_url).await;
        let listed = identifiers.len();
        let partitions = partition(identifiers);
        let unkeyed = partitions.unkeyed().len();

        let source: Arc<dyn RecordSource> = self.retriever.clone();
        let reports = self.dispatcher.run(partitions, source, sink).await;

        let summary = HarvestSummary {
            listed,
            unkeyed,
            partitions: reports,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            listing = listing_url,
            listed = summary.listed,
            partitions = summary.partitions.len(),
            accepted = summary.accepted(),
            dropped = summary.dropped(),
            fetch_failed = summary.fetch_failed(),
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "harvest finished"
        );
        summary
    }

    /// Harvest into one `<volume>.<issue>.txt` file per partition under `dir`
    ///
    /// # Errors
    /// Returns error if the output directory cannot be created
    pub async fn harvest_to_dir(&self, listing_url: &str, dir: &Path) -> Result<HarvestSummary> {
        let sink = PartitionedFiles::create(dir).await?;
        Ok(self.harvest(listing_url, Arc::new(sink)).await)
    }
}
