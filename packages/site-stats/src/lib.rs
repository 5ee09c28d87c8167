//! Website URL enrichment.
//!
//! Reads website URLs from a CSV table and, for each one, fetches the page
//! title, detects redirects and scrapes two ranking statistics from a
//! lookup service. One quoted CSV row is written per input row, keyed by
//! the input row index.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use site_stats::{prepare, EnrichConfig, HttpFetcherFactory, LookupClient, Scheduler};
//!
//! let config = EnrichConfig::new("sites.csv", "result.csv").with_workers(10);
//! let (rows, sink) = prepare(&config)?;
//!
//! let scheduler = Scheduler::new(
//!     config.worker_options(),
//!     HttpFetcherFactory::from_config(&config),
//!     LookupClient::new(config.lookup_endpoint.clone()),
//!     Arc::new(sink),
//! );
//! let summary = scheduler.run(rows).await;
//! ```
//!
//! # Modules
//!
//! - [`types`] - Rows, fetched pages and run configuration
//! - [`traits`] - Fetcher and result sink abstractions
//! - [`fetchers`] - reqwest-backed fetcher
//! - [`encoding`] - Charset detection and windows-1251 transcoding
//! - [`inspector`] - Title and canonical-link extraction
//! - [`lookup`] - Lookup-service client
//! - [`worker`] - Per-row pipeline
//! - [`scheduler`] - Bounded worker pool
//! - [`sink`] - CSV output
//! - [`input`] - CSV input
//! - [`setup`] - Fatal checks before a run
//! - [`testing`] - Mock implementations for testing

pub mod encoding;
pub mod error;
pub mod fetchers;
pub mod input;
pub mod inspector;
pub mod lookup;
pub mod scheduler;
pub mod setup;
pub mod sink;
pub mod testing;
pub mod traits;
pub mod types;
pub mod worker;

// Re-export core types at crate root
pub use error::{ConfigError, EnrichError, FetchError, SinkError};
pub use fetchers::{HttpFetcher, HttpFetcherFactory};
pub use input::{read_rows, read_rows_from_reader};
pub use lookup::{LookupClient, DEFAULT_LOOKUP_ENDPOINT};
pub use scheduler::{RunSummary, Scheduler};
pub use setup::prepare;
pub use sink::{CsvSink, SyncedFile};
pub use traits::{
    fetcher::{Fetcher, FetcherFactory, RedirectMode},
    sink::ResultSink,
};
pub use types::{
    config::{EnrichConfig, WorkerOptions, MAX_WORKERS},
    page::{FetchedPage, PageMetadata},
    row::{normalize_url, InputRow, LookupResult, ResultRow, NO_INFO},
};
pub use worker::RowWorker;

// Re-export testing utilities
pub use testing::{MemorySink, MockFetcher};
