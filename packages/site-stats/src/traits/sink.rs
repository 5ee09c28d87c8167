//! Result sink trait.

use crate::error::SinkResult;
use crate::types::row::ResultRow;

/// Destination for completed rows.
///
/// Called concurrently from row tasks. Each `write_row` must be atomic
/// with respect to other writers and durable once it returns.
pub trait ResultSink: Send + Sync {
    fn write_row(&self, row: &ResultRow) -> SinkResult<()>;
}
