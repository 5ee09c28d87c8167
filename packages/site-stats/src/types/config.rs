//! Run configuration.
//!
//! One explicit struct handed to the scheduler and workers at construction;
//! nothing is read from globals once a run has started.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::lookup::DEFAULT_LOOKUP_ENDPOINT;

/// Upper bound on simultaneous row workers.
pub const MAX_WORKERS: usize = 100;

/// Default fetch timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Browser-like User-Agent; many sites refuse obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for a single enrichment run.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// CSV table holding the URLs
    pub input: PathBuf,

    /// Result table (overwritten if present)
    pub output: PathBuf,

    /// Column holding the URL in each input row
    pub url_column: usize,

    /// First input row to process. Rows before it are skipped,
    /// which lets a header be ignored or a previous run be resumed.
    pub first_row: usize,

    /// Maximum number of rows processed concurrently
    pub workers: usize,

    /// Per-request timeout, shared by every fetch in the run
    pub timeout: Duration,

    /// Write a fixed header line before the data rows
    pub header: bool,

    /// Treat a `Link: rel=canonical` header as a redirect when the
    /// response status is not itself a redirect.
    pub canonical_fallback: bool,

    /// Lookup service query prefix; the target URL is appended
    pub lookup_endpoint: String,

    /// User-Agent sent with every request
    pub user_agent: String,
}

impl EnrichConfig {
    /// Create a config with defaults for everything but the paths.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            url_column: 0,
            first_row: 0,
            workers: 1,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            header: false,
            canonical_fallback: false,
            lookup_endpoint: DEFAULT_LOOKUP_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_url_column(mut self, column: usize) -> Self {
        self.url_column = column;
        self
    }

    pub fn with_first_row(mut self, row: usize) -> Self {
        self.first_row = row;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn with_canonical_fallback(mut self, enabled: bool) -> Self {
        self.canonical_fallback = enabled;
        self
    }

    pub fn with_lookup_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.lookup_endpoint = endpoint.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Check the config before any file is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.as_os_str().is_empty() {
            return Err(ConfigError::EmptyInput);
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::Workers {
                got: self.workers,
                max: MAX_WORKERS,
            });
        }
        if self.timeout < Duration::from_secs(1) {
            return Err(ConfigError::ZeroTimeout);
        }
        if url::Url::parse(&self.lookup_endpoint).is_err() {
            return Err(ConfigError::LookupEndpoint(self.lookup_endpoint.clone()));
        }
        Ok(())
    }

    /// Options the row workers need, detached from the file paths.
    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            workers: self.workers,
            canonical_fallback: self.canonical_fallback,
        }
    }
}

/// Per-run options for the scheduler and its row workers.
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub workers: usize,
    pub canonical_fallback: bool,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            canonical_fallback: false,
        }
    }
}

impl WorkerOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}
