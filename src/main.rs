//! Command line front end for doi-harvest.

use clap::Parser;
use doi_harvest::config::{DEFAULT_API_BASE, FetchConfig, HarvestConfig, OutputConfig, OutputMode};
use doi_harvest::{Error, Harvester, JournalTable, SharedStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Harvest Crossref journal-article metadata for whole journals.
#[derive(Debug, Parser)]
#[command(name = "doi-harvest")]
#[command(version, about)]
struct Cli {
    /// Journal to harvest, or "all" for every journal in the table.
    #[arg(short, long, required_unless_present = "list")]
    journal: Option<String>,

    /// JSON file mapping journal names to listing URLs (replaces the built-in table).
    #[arg(long)]
    journals: Option<PathBuf>,

    /// Print the journal table and exit.
    #[arg(long)]
    list: bool,

    /// Partitions processed concurrently (clamped to 1..=10).
    #[arg(short, long, default_value_t = 10)]
    workers: usize,

    /// Directory for partition files.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Write every record to stdout instead of partition files.
    #[arg(long)]
    stream: bool,

    /// Metadata API base; the identifier is appended to it.
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Per-record request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Listing request timeout in seconds.
    #[arg(long, default_value_t = 120)]
    listing_timeout_secs: u64,

    /// Disable TLS certificate verification.
    #[arg(long)]
    insecure: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn harvest_config(&self) -> HarvestConfig {
        HarvestConfig {
            api_base: self.api_base.clone(),
            workers: self.workers,
            fetch: FetchConfig {
                timeout: Duration::from_secs(self.timeout_secs),
                listing_timeout: Duration::from_secs(self.listing_timeout_secs),
                accept_invalid_certs: self.insecure,
                ..Default::default()
            },
            output: OutputConfig {
                mode: if self.stream {
                    OutputMode::Stream
                } else {
                    OutputMode::Partitioned
                },
                dir: self.output_dir.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let table = match &cli.journals {
        Some(path) => JournalTable::load(path)?,
        None => JournalTable::builtin(),
    };

    if cli.list {
        for name in table.names() {
            println!("{}\t{}", name, table.get(&name).unwrap_or_default());
        }
        return Ok(());
    }

    let selection = cli.journal.as_deref().unwrap_or_default();
    let journals = match table.resolve(selection) {
        Ok(journals) => journals,
        Err(Error::UnknownJournal { name, available }) => {
            eprintln!("Unknown journal '{name}'. Available journals:");
            for journal in available {
                eprintln!("  {journal}");
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let config = cli.harvest_config();
    let harvester = Harvester::new(&config)?;
    tracing::info!(
        journals = journals.len(),
        workers = harvester.workers(),
        "starting harvest"
    );

    let stdout = SharedStream::new(tokio::io::stdout());
    for (name, listing) in &journals {
        let summary = match config.output.mode {
            OutputMode::Stream => harvester.harvest(listing, Arc::new(stdout.clone())).await,
            OutputMode::Partitioned => {
                harvester
                    .harvest_to_dir(listing, &config.output.dir.join(name))
                    .await?
            }
        };
        tracing::info!(
            journal = %name,
            listed = summary.listed,
            accepted = summary.accepted(),
            dropped = summary.dropped(),
            fetch_failed = summary.fetch_failed(),
            unkeyed = summary.unkeyed,
            "journal done"
        );
    }

    Ok(())
}
