//! Bounded dispatcher: one job per partition under a concurrency ceiling.
//!
//! Partitions are submitted in key order. Before each job is spawned a permit
//! is taken from a counting semaphore, so submission blocks while `concurrency`
//! jobs are in flight. [`Dispatcher::run`] returns only after every spawned job
//! has finished.
//!
//! Within a job, identifiers are retrieved one after another in listing order
//! and accepted records go to that partition's writer. Failures of a single
//! identifier never end the job; a failing writer ends only its own job.

use crate::config::clamp_workers;
use crate::metadata::Retriever;
use crate::partition::Partitions;
use crate::sink::RecordSink;
use crate::types::{Identifier, PartitionKey, PartitionReport, Retrieval};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Source of retrieval outcomes for single identifiers
///
/// Implemented by [`Retriever`] for the real API; tests substitute their own.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Retrieve and classify the record for `id`
    async fn retrieve(&self, id: &Identifier) -> Retrieval;
}

#[async_trait]
impl RecordSource for Retriever {
    async fn retrieve(&self, id: &Identifier) -> Retrieval {
        Retriever::retrieve(self, id).await
    }
}

/// Runs partition jobs with at most `concurrency` in flight
#[derive(Clone, Copy, Debug)]
pub struct Dispatcher {
    concurrency: usize,
}

impl Dispatcher {
    /// Create a dispatcher; `concurrency` is clamped to `1..=10`
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: clamp_workers(concurrency),
        }
    }

    /// Effective concurrency ceiling
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process every partition and wait for all jobs to finish
    ///
    /// Returns one report per partition in key order.
    pub async fn run(
        &self,
        partitions: Partitions,
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn RecordSink>,
    ) -> Vec<PartitionReport> {
        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut jobs = Vec::with_capacity(partitions.len());

        tracing::info!(
            partitions = partitions.len(),
            concurrency = self.concurrency,
            "dispatching partitions"
        );

        let mut file_names = partitions.file_names();
        for (key, ids) in partitions {
            // Blocks while the ceiling is reached
            let permit = match limiter.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    tracing::error!(partition = %key, "concurrency limiter closed, stopping dispatch");
                    break;
                }
            };

            let source = Arc::clone(&source);
            let sink = Arc::clone(&sink);
            let job_key = key.clone();
            let file_name = file_names
                .remove(&key)
                .unwrap_or_else(|| key.qualified_file_name());
            let handle = tokio::spawn(async move {
                let _permit = permit;
                run_partition(job_key, file_name, ids, source, sink).await
            });
            jobs.push((key, handle));
        }

        let mut reports = Vec::with_capacity(jobs.len());
        for (key, handle) in jobs {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!(partition = %key, error = %e, "partition job did not complete");
                    let mut report = PartitionReport::new(key);
                    report.error = Some(format!("job failed: {e}"));
                    reports.push(report);
                }
            }
        }
        reports
    }
}

async fn run_partition(
    key: PartitionKey,
    file_name: String,
    ids: Vec<Identifier>,
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn RecordSink>,
) -> PartitionReport {
    let mut report = PartitionReport::new(key.clone());
    let mut writer = sink.writer(&key, &file_name);

    tracing::debug!(partition = %key, identifiers = ids.len(), "partition started");

    for id in &ids {
        let outcome = source.retrieve(id).await;
        if let Retrieval::Accepted(record) = &outcome {
            if let Err(e) = writer.append(record).await {
                tracing::error!(
                    partition = %key,
                    identifier = %id,
                    error = %e,
                    "failed to write record, abandoning partition"
                );
                report.attempted += 1;
                report.error = Some(e.to_string());
                break;
            }
        }
        report.record(&outcome);
    }

    match writer.finish().await {
        Ok(path) => report.output = path,
        Err(e) => {
            tracing::error!(partition = %key, error = %e, "failed to close partition output");
            report.error.get_or_insert_with(|| e.to_string());
        }
    }

    tracing::info!(
        partition = %key,
        accepted = report.accepted,
        dropped = report.rejected + report.unparseable,
        fetch_failed = report.fetch_failed,
        "partition finished"
    );
    report
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::partition::partition;
    use crate::sink::{PartitionWriter, SharedStream};
    use crate::types::{MetadataRecord, RejectReason};
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fake source: ids ending in `.bad` are rejected, `.gone` fail to fetch
    struct FakeSource {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<Identifier>>,
    }

    impl FakeSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn retrieve(&self, id: &Identifier) -> Retrieval {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(id.clone());

            if id.as_str().ends_with(".bad") {
                Retrieval::Rejected(RejectReason::OtherType("book".to_string()))
            } else if id.as_str().ends_with(".gone") {
                Retrieval::FetchFailed
            } else {
                Retrieval::Accepted(
                    MetadataRecord::validate(
                        json!({"message": {"type": "journal-article", "DOI": id.as_str()}}),
                    )
                    .unwrap(),
                )
            }
        }
    }

    fn ids(items: &[String]) -> Vec<Identifier> {
        items.iter().map(|s| Identifier::from(s.as_str())).collect()
    }

    #[tokio::test]
    async fn never_exceeds_ceiling_and_drains_everything() {
        let source = FakeSource::new(Duration::from_millis(20));
        let listing: Vec<String> = (1..=24).map(|i| format!("J.1.{i}.a")).collect();
        let stream = SharedStream::new(Vec::<u8>::new());

        let reports = Dispatcher::new(3)
            .run(
                partition(ids(&listing)),
                source.clone(),
                Arc::new(stream.clone()),
            )
            .await;

        let peak = source.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak} exceeded ceiling");
        assert!(peak >= 2, "jobs should overlap, peak was {peak}");

        // Every job finished before run returned
        assert_eq!(reports.len(), 24);
        assert_eq!(source.calls.lock().unwrap().len(), 24);
        assert_eq!(source.in_flight.load(Ordering::SeqCst), 0);
        let out = stream.lock().await;
        assert_eq!(std::str::from_utf8(&out).unwrap().lines().count(), 24);
    }

    #[tokio::test]
    async fn single_worker_runs_partitions_in_key_order() {
        let source = FakeSource::new(Duration::from_millis(1));
        let listing: Vec<String> = ["J.2.1.a", "J.1.2.a", "J.1.10.a", "J.1.2.b"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let reports = Dispatcher::new(1)
            .run(
                partition(ids(&listing)),
                source.clone(),
                Arc::new(SharedStream::new(Vec::<u8>::new())),
            )
            .await;

        let order: Vec<String> = source
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.to_string())
            .collect();
        assert_eq!(order, vec!["J.1.2.a", "J.1.2.b", "J.1.10.a", "J.2.1.a"]);

        let keys: Vec<String> = reports
            .iter()
            .map(|r| r.key.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["J.1.002", "J.1.010", "J.2.001"]);
    }

    #[tokio::test]
    async fn failures_are_contained_per_identifier() {
        let source = FakeSource::new(Duration::from_millis(1));
        let listing: Vec<String> = ["J.1.1.gone", "J.1.1.bad", "J.1.1.ok", "J.1.2.gone"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let reports = Dispatcher::new(10)
            .run(
                partition(ids(&listing)),
                source,
                Arc::new(SharedStream::new(Vec::<u8>::new())),
            )
            .await;

        assert_eq!(reports.len(), 2);
        let first = &reports[0];
        assert_eq!(first.attempted, 3);
        assert_eq!(first.fetch_failed, 1);
        assert_eq!(first.rejected, 1);
        assert_eq!(first.accepted, 1);
        assert!(first.error.is_none());

        let second = &reports[1];
        assert_eq!(second.attempted, 1);
        assert_eq!(second.fetch_failed, 1);
        assert_eq!(second.accepted, 0);
    }

    /// Sink whose writers fail for one partition
    struct FailingSink {
        poisoned: String,
        written: Arc<Mutex<HashMap<String, usize>>>,
    }

    struct CountingWriter {
        key: String,
        fail: bool,
        written: Arc<Mutex<HashMap<String, usize>>>,
    }

    impl RecordSink for FailingSink {
        fn writer(&self, key: &PartitionKey, _file_name: &str) -> Box<dyn PartitionWriter> {
            Box::new(CountingWriter {
                key: key.to_string(),
                fail: key.as_str() == self.poisoned,
                written: Arc::clone(&self.written),
            })
        }
    }

    #[async_trait]
    impl PartitionWriter for CountingWriter {
        async fn append(&mut self, _record: &MetadataRecord) -> Result<()> {
            if self.fail {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            *self.written.lock().unwrap().entry(self.key.clone()).or_default() += 1;
            Ok(())
        }

        async fn finish(self: Box<Self>) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn writer_failure_stops_only_its_partition() {
        let source = FakeSource::new(Duration::from_millis(1));
        let listing: Vec<String> = ["J.1.1.a", "J.1.1.b", "J.1.2.a", "J.1.2.b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let written = Arc::new(Mutex::new(HashMap::new()));
        let sink = FailingSink {
            poisoned: "J.1.001".to_string(),
            written: Arc::clone(&written),
        };

        let reports = Dispatcher::new(2)
            .run(partition(ids(&listing)), source, Arc::new(sink))
            .await;

        assert_eq!(reports[0].attempted, 1);
        assert_eq!(reports[0].accepted, 0);
        assert!(reports[0].error.as_deref().unwrap().contains("disk full"));

        assert_eq!(reports[1].accepted, 2);
        assert!(reports[1].error.is_none());
        assert_eq!(written.lock().unwrap().get("J.1.002"), Some(&2));
    }

    #[tokio::test]
    async fn empty_partitions_return_immediately() {
        let source = FakeSource::new(Duration::from_millis(1));
        let reports = Dispatcher::new(4)
            .run(
                partition(Vec::new()),
                source,
                Arc::new(SharedStream::new(Vec::<u8>::new())),
            )
            .await;
        assert!(reports.is_empty());
    }

    #[test]
    fn concurrency_is_clamped() {
        assert_eq!(Dispatcher::new(0).concurrency(), 1);
        assert_eq!(Dispatcher::new(5).concurrency(), 5);
        assert_eq!(Dispatcher::new(50).concurrency(), 10);
    }
}
