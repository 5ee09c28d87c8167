//! Typed errors for the enrichment library.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Only [`EnrichError`]
//! is ever allowed to stop a run, and only before any row is dispatched.
//! [`FetchError`] is row-scoped: its `Display` text is written into the
//! output row instead of being propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while setting up a run.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Configuration failed validation
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Input table could not be opened
    #[error("cannot open input {path}: {source}")]
    InputOpen {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Input table could not be parsed
    #[error("cannot read input row {row}: {source}")]
    InputRead {
        row: usize,
        #[source]
        source: csv::Error,
    },

    /// Output table could not be created
    #[error("cannot create output {path}: {source}")]
    OutputCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the header line failed
    #[error("cannot write output header: {0}")]
    OutputHeader(#[source] SinkError),
}

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("input path is empty")]
    EmptyInput,

    #[error("workers must be between 1 and {max}, got {got}")]
    Workers { got: usize, max: usize },

    #[error("timeout must be at least one second")]
    ZeroTimeout,

    #[error("lookup endpoint is not a valid URL: {0}")]
    LookupEndpoint(String),
}

/// Row-scoped fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request failed at the network level (DNS, refused connection, TLS)
    #[error("{0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Request exceeded the configured timeout
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// HTTP client could not be constructed for this row
    #[error("HTTP client error: {0}")]
    ClientBuild(String),

    /// Response body could not be read
    #[error("failed to read body of {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Errors from writing a result row.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A previous writer panicked while holding the lock
    #[error("sink lock poisoned")]
    Poisoned,
}

/// Result type alias for setup operations.
pub type Result<T> = std::result::Result<T, EnrichError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for sink operations.
pub type SinkResult<T> = std::result::Result<T, SinkError>;
