//! Prints the total page count of the archive entry collection, computed with each selected
//! strategy in turn.
//!
//! Usage examples:
//!   # All strategies against the local server, timed
//!   archive-page-count
//!
//!   # Only the delegated pipelines, with the commands sent to the server logged
//!   archive-page-count --strategy pipeline --strategy builder -v
//!
//!   # Another deployment, untimed
//!   ARCHIVE_URI=mongodb://db.internal:27017 archive-page-count --database archive --no-timing

use std::{process::ExitCode, time::Duration};

use anyhow::{bail, Context, Result};
use archive_page_count::{
    aggregator::{PageCounter, Strategy},
    measure::{self, Measurement},
    options::{self, StoreOptions},
    store::{EntryStore, MongoStore},
    trace,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "archive-page-count",
    about = "Total the page counts of archived documents in MongoDB"
)]
struct Args {
    /// MongoDB connection string
    #[arg(long, env = options::URI_ENV, default_value = options::DEFAULT_URI)]
    uri: String,

    /// Database holding the entry collection
    #[arg(long, env = options::DATABASE_ENV, default_value = options::DEFAULT_DATABASE)]
    database: String,

    /// Entry collection
    #[arg(long, env = options::COLLECTION_ENV, default_value = options::DEFAULT_COLLECTION)]
    collection: String,

    /// Strategy to run (local, pipeline, builder); repeat to run several. Defaults to all
    #[arg(long = "strategy", short = 's', value_parser = parse_strategy)]
    strategies: Vec<Strategy>,

    /// Print results without timing them
    #[arg(long)]
    no_timing: bool,

    /// Do not allow aggregations to use temporary files on the server
    #[arg(long)]
    no_disk_use: bool,

    /// How long to wait for a suitable server, in milliseconds
    #[arg(long)]
    server_selection_timeout_ms: Option<u64>,

    /// Truncate logged commands and replies after this many bytes
    #[arg(long)]
    max_log_document_bytes: Option<usize>,

    /// Log at debug level, including every command sent to the server
    #[arg(long, short)]
    verbose: bool,
}

fn parse_strategy(s: &str) -> std::result::Result<Strategy, String> {
    s.parse().map_err(|e: archive_page_count::Error| e.to_string())
}

impl Args {
    fn store_options(&self) -> archive_page_count::Result<StoreOptions> {
        let mut options = StoreOptions::builder()
            .uri(self.uri.as_str())
            .database(self.database.as_str())
            .collection(self.collection.as_str())
            .allow_disk_use(!self.no_disk_use)
            .server_selection_timeout(self.server_selection_timeout_ms.map(Duration::from_millis))
            .build();
        if let Some(max) = self.max_log_document_bytes {
            options.max_document_length_bytes = max;
        }
        options.validate()?;
        Ok(options)
    }

    fn strategies(&self) -> Vec<Strategy> {
        if self.strategies.is_empty() {
            Strategy::ALL.to_vec()
        } else {
            self.strategies.clone()
        }
    }
}

async fn run_strategy<S: EntryStore>(
    counter: &PageCounter<S>,
    strategy: Strategy,
    timed: bool,
) -> archive_page_count::Result<Measurement<i64>> {
    let label = strategy.to_string();
    let op = || counter.total(strategy);
    if timed {
        measure::timed(label, op).await
    } else {
        measure::untimed(label, op).await
    }
}

/// Runs every selected strategy in turn, printing each result, and stops at the first failure.
async fn run_strategies<S: EntryStore>(
    counter: &PageCounter<S>,
    args: &Args,
) -> Result<Vec<Measurement<i64>>> {
    let mut results = Vec::new();
    for strategy in args.strategies() {
        let measurement = run_strategy(counter, strategy, !args.no_timing)
            .await
            .with_context(|| format!("{strategy} strategy failed"))?;
        println!("{measurement}");
        results.push(measurement);
    }
    Ok(results)
}

async fn run(args: Args) -> Result<()> {
    let options = args.store_options()?;
    let store = MongoStore::connect(&options)
        .await
        .with_context(|| format!("connecting to {}", options.uri))?;
    let counter = PageCounter::new(store);

    let results = run_strategies(&counter, &args).await;
    counter.into_store().shutdown().await;
    let results = results?;

    if let Some((first, rest)) = results.split_first() {
        if let Some(differing) = rest.iter().find(|m| m.value != first.value) {
            bail!(
                "strategies disagree: {} returned {}, {} returned {}",
                first.label,
                first.value,
                differing.label,
                differing.value
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    trace::init(args.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod test {
    use archive_page_count::{model::ArchiveEntry, store::MemoryStore};
    use clap::Parser;

    use super::*;

    fn counter(page_counts: &[&[i64]]) -> PageCounter<MemoryStore> {
        let entries: Vec<ArchiveEntry> = page_counts
            .iter()
            .map(|counts| ArchiveEntry::with_page_counts("entry", counts))
            .collect();
        PageCounter::new(MemoryStore::from_entries(&entries).unwrap())
    }

    #[tokio::test]
    async fn every_selected_strategy_runs_in_order() {
        let args = Args::parse_from(["archive-page-count", "--no-timing"]);
        let counter = counter(&[&[5, 3], &[], &[10]]);

        let results = run_strategies(&counter, &args).await.unwrap();
        assert_eq!(
            results
                .iter()
                .map(|m| (m.label.as_str(), m.value, m.elapsed))
                .collect::<Vec<_>>(),
            vec![("local", 18, None), ("pipeline", 18, None), ("builder", 18, None)]
        );
    }

    #[tokio::test]
    async fn failed_strategy_leaves_the_store_to_the_caller() {
        let args = Args::parse_from(["archive-page-count", "-s", "local", "-s", "builder"]);
        let counter = counter(&[&[i64::MAX], &[1]]);

        let err = run_strategies(&counter, &args).await.unwrap_err();
        assert!(err.to_string().contains("local strategy failed"));

        // the counter is still owned here, so the store can be shut down after a failure
        assert_eq!(counter.into_store().len(), 2);
    }
}
