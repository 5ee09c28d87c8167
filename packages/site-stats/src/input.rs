//! Input table reader.
//!
//! Rows are read without a header, each cell decoded to UTF-8 the same way
//! page bodies are, so tables saved in windows-1251 work too.

use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::encoding::decode_to_utf8;
use crate::error::{EnrichError, Result};
use crate::types::row::InputRow;

/// Read the URL column of every row from `first_row` on.
///
/// Row indices are positions in the file, so they stay stable when a run
/// is resumed with a later `first_row`. A row too short to have the URL
/// column yields an empty URL, which the worker records as a row error.
pub fn read_rows(path: &Path, url_column: usize, first_row: usize) -> Result<Vec<InputRow>> {
    let reader = csv_reader()
        .from_path(path)
        .map_err(|source| EnrichError::InputOpen {
            path: path.to_path_buf(),
            source,
        })?;

    let rows = collect_rows(reader, url_column, first_row)?;
    info!(path = %path.display(), rows = rows.len(), "Input rows loaded");
    Ok(rows)
}

/// [`read_rows`] over any reader.
pub fn read_rows_from_reader<R: Read>(
    reader: R,
    url_column: usize,
    first_row: usize,
) -> Result<Vec<InputRow>> {
    collect_rows(csv_reader().from_reader(reader), url_column, first_row)
}

fn csv_reader() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

fn collect_rows<R: Read>(
    mut reader: csv::Reader<R>,
    url_column: usize,
    first_row: usize,
) -> Result<Vec<InputRow>> {
    let mut rows = Vec::new();
    for (index, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|source| EnrichError::InputRead { row: index, source })?;
        if index < first_row {
            continue;
        }
        let raw_url = record
            .get(url_column)
            .map(|cell| decode_to_utf8(cell, None))
            .unwrap_or_default();
        rows.push(InputRow::new(index, raw_url));
    }
    Ok(rows)
}
