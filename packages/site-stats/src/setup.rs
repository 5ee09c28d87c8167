//! Run setup: everything that can fail fatally, done before any row is
//! dispatched.

use tracing::debug;

use crate::error::Result;
use crate::input::read_rows;
use crate::sink::{CsvSink, SyncedFile};
use crate::types::config::EnrichConfig;
use crate::types::row::InputRow;

/// Validate `config`, read the input rows, then create the output table.
///
/// The output file is only created once the input has been read, so a
/// missing or malformed input never leaves an empty result table behind.
pub fn prepare(config: &EnrichConfig) -> Result<(Vec<InputRow>, CsvSink<SyncedFile>)> {
    config.validate()?;

    let rows = read_rows(&config.input, config.url_column, config.first_row)?;
    let sink = CsvSink::create(&config.output, config.header)?;

    debug!(rows = rows.len(), output = %config.output.display(), "Run prepared");
    Ok((rows, sink))
}
