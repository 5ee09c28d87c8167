//! Worker pool.
//!
//! One task per input row, dispatched in input order. A semaphore bounds
//! how many run at once: the dispatch loop takes a slot before spawning,
//! so it waits whenever the pool is full, and the task holds the slot until
//! its row has been written. Tasks finish in any order; each result row
//! carries its own index.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::error::{SinkError, SinkResult};
use crate::lookup::LookupClient;
use crate::traits::fetcher::FetcherFactory;
use crate::traits::sink::ResultSink;
use crate::types::config::{WorkerOptions, MAX_WORKERS};
use crate::types::row::{InputRow, ResultRow};
use crate::worker::RowWorker;

/// `website_error` for a row whose worker panicked.
pub const WORKER_PANICKED: &str = "worker panicked";

/// `lookup_error` for a row that never got an HTTP client.
pub const LOOKUP_SKIPPED_NO_CLIENT: &str = "skipped: no HTTP client";

/// Counters for one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub workers: usize,
    pub rows_dispatched: usize,
    pub rows_written: usize,
    pub website_errors: usize,
    pub redirects: usize,
    pub lookup_errors: usize,
    pub worker_panics: usize,
    pub write_failures: usize,
    pub lost_tasks: usize,
}

impl RunSummary {
    fn start(workers: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            workers,
            rows_dispatched: 0,
            rows_written: 0,
            website_errors: 0,
            redirects: 0,
            lookup_errors: 0,
            worker_panics: 0,
            write_failures: 0,
            lost_tasks: 0,
        }
    }

    /// Every dispatched row made it to the sink.
    pub fn is_complete(&self) -> bool {
        self.rows_written == self.rows_dispatched && self.write_failures == 0 && self.lost_tasks == 0
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    fn record(&mut self, outcome: Result<RowReport, JoinError>) {
        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Row task lost");
                self.lost_tasks += 1;
                return;
            }
        };

        self.website_errors += usize::from(report.website_error);
        self.redirects += usize::from(report.redirect);
        self.lookup_errors += usize::from(report.lookup_error);
        self.worker_panics += usize::from(report.panicked);

        match report.write {
            Ok(()) => self.rows_written += 1,
            Err(e) => {
                error!(index = report.index, error = %e, "Failed to write row");
                self.write_failures += 1;
            }
        }
    }
}

/// What a row task reports back to the dispatcher.
struct RowReport {
    index: usize,
    website_error: bool,
    redirect: bool,
    lookup_error: bool,
    panicked: bool,
    write: SinkResult<()>,
}

/// Bounded-concurrency dispatcher over input rows.
pub struct Scheduler<FF, S> {
    options: WorkerOptions,
    factory: Arc<FF>,
    lookup: Arc<LookupClient>,
    sink: Arc<S>,
}

impl<FF, S> Scheduler<FF, S>
where
    FF: FetcherFactory + 'static,
    S: ResultSink + 'static,
{
    pub fn new(options: WorkerOptions, factory: FF, lookup: LookupClient, sink: Arc<S>) -> Self {
        Self {
            options,
            factory: Arc::new(factory),
            lookup: Arc::new(lookup),
            sink,
        }
    }

    /// Process every row and wait for all of them to be written.
    pub async fn run(&self, rows: Vec<InputRow>) -> RunSummary {
        let workers = self.options.workers.clamp(1, MAX_WORKERS);
        let slots = Arc::new(Semaphore::new(workers));
        let mut tasks: JoinSet<RowReport> = JoinSet::new();
        let mut summary = RunSummary::start(workers);

        info!(rows = rows.len(), workers = workers, "Dispatching rows");

        for row in rows {
            let Ok(permit) = slots.clone().acquire_owned().await else {
                error!("Worker pool closed; stopping dispatch");
                break;
            };

            let factory = Arc::clone(&self.factory);
            let lookup = Arc::clone(&self.lookup);
            let sink = Arc::clone(&self.sink);
            let canonical_fallback = self.options.canonical_fallback;

            tasks.spawn(async move {
                let _permit = permit;
                run_row(factory, lookup, sink, canonical_fallback, row).await
            });
            summary.rows_dispatched += 1;

            while let Some(done) = tasks.try_join_next() {
                summary.record(done);
            }
        }

        while let Some(done) = tasks.join_next().await {
            summary.record(done);
        }

        summary.finished_at = Some(Utc::now());
        info!(
            rows = summary.rows_dispatched,
            written = summary.rows_written,
            website_errors = summary.website_errors,
            redirects = summary.redirects,
            lookup_errors = summary.lookup_errors,
            write_failures = summary.write_failures,
            elapsed_ms = summary.elapsed().num_milliseconds(),
            "Run finished"
        );
        summary
    }
}

/// Process one row, contain any panic, and hand the result to the sink.
async fn run_row<FF, S>(
    factory: Arc<FF>,
    lookup: Arc<LookupClient>,
    sink: Arc<S>,
    canonical_fallback: bool,
    row: InputRow,
) -> RowReport
where
    FF: FetcherFactory,
    S: ResultSink + 'static,
{
    let index = row.index;
    let processed = AssertUnwindSafe(process_row(factory.as_ref(), lookup, canonical_fallback, &row))
        .catch_unwind()
        .await;

    let (result, panicked) = match processed {
        Ok(result) => (result, false),
        Err(_) => {
            error!(index = index, "Row worker panicked");
            let mut result = ResultRow::new(index, row.normalized_url());
            result.website_error = WORKER_PANICKED.to_string();
            (result, true)
        }
    };

    let mut report = RowReport {
        index,
        website_error: result.has_website_error(),
        redirect: result.is_redirect(),
        lookup_error: result.has_lookup_error(),
        panicked,
        write: Ok(()),
    };

    report.write = match tokio::task::spawn_blocking(move || sink.write_row(&result)).await {
        Ok(write) => write,
        Err(e) => Err(SinkError::Io(std::io::Error::other(e.to_string()))),
    };
    report
}

async fn process_row<FF: FetcherFactory>(
    factory: &FF,
    lookup: Arc<LookupClient>,
    canonical_fallback: bool,
    row: &InputRow,
) -> ResultRow {
    match factory.create() {
        Ok(fetcher) => {
            RowWorker::new(fetcher, lookup)
                .with_canonical_fallback(canonical_fallback)
                .process(row)
                .await
        }
        Err(e) => {
            warn!(index = row.index, error = %e, "Could not create fetcher");
            let mut result = ResultRow::new(row.index, row.normalized_url());
            result.website_error = e.to_string();
            result.lookup_error = LOOKUP_SKIPPED_NO_CLIENT.to_string();
            result
        }
    }
}
