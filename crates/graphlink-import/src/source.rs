//! Row sources.
//!
//! A row source is any iterator of `Result<Record, SourceReadError>` in file
//! order, header first. The engine treats record 0 as the header whatever it
//! contains.

use std::fs::File;
use std::path::{Path, PathBuf};

use graphlink_core::Record;

use crate::error::SourceReadError;

/// Parsing options for CSV row sources.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub delimiter: u8,
    /// Strip leading and trailing whitespace from every field.
    pub trim: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: true,
        }
    }
}

/// Streams records from a CSV file.
///
/// Ragged rows are allowed through; a short row simply fails selector
/// resolution in the engine.
pub struct CsvRowSource {
    path: PathBuf,
    records: csv::StringRecordsIntoIter<File>,
    index: usize,
}

impl CsvRowSource {
    pub fn open(path: impl AsRef<Path>, options: &SourceOptions) -> Result<Self, SourceReadError> {
        let path = path.as_ref().to_path_buf();
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter)
            .trim(if options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_path(&path)
            .map_err(|e| SourceReadError::Open {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %path.display(), "Opened row source");
        Ok(Self {
            path,
            records: reader.into_records(),
            index: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for CsvRowSource {
    type Item = Result<Record, SourceReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.records.next()?;
        let record = self.index;
        self.index += 1;

        Some(match result {
            Ok(fields) => Ok(Record::from(fields.iter().collect::<Vec<_>>())),
            Err(e) if e.is_io_error() => Err(SourceReadError::Io {
                path: self.path.clone(),
                record,
                reason: e.to_string(),
            }),
            Err(e) => Err(SourceReadError::Malformed {
                record,
                reason: e.to_string(),
            }),
        })
    }
}

/// Wrap already-parsed rows as a row source.
pub fn in_memory(rows: Vec<Record>) -> impl Iterator<Item = Result<Record, SourceReadError>> {
    rows.into_iter().map(Ok)
}
