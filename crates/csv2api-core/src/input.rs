//! Tabular input: a header row followed by records.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::record::Record;

const BOM: char = '\u{feff}';

/// Structural faults in the input. Any of them aborts the run before dispatch.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while reading input: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected {expected} fields, found {found}")]
    ColumnCount { line: u64, expected: u64, found: u64 },

    #[error("malformed input: {0}")]
    Parse(String),
}

impl From<csv::Error> for InputError {
    fn from(error: csv::Error) -> Self {
        if let csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } = error.kind()
        {
            return Self::ColumnCount {
                line: pos.as_ref().map(csv::Position::line).unwrap_or_default(),
                expected: *expected_len,
                found: *len,
            };
        }

        let message = error.to_string();
        match error.into_kind() {
            csv::ErrorKind::Io(error) => Self::Io(error),
            _ => Self::Parse(message),
        }
    }
}

/// Header names plus every record, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvBatch {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

/// Strict CSV reader: every row must have as many fields as the header.
pub struct CsvSource<R> {
    reader: csv::Reader<R>,
}

impl CsvSource<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| InputError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);
        Self { reader }
    }

    /// Reads the whole input. Blank lines are skipped.
    pub fn read_all(mut self) -> Result<CsvBatch, InputError> {
        let mut headers = self
            .reader
            .headers()?
            .iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if let Some(first) = headers.first_mut() {
            if let Some(stripped) = first.strip_prefix(BOM) {
                *first = stripped.to_owned();
            }
        }

        let mut records = Vec::new();
        for row in self.reader.records() {
            let row = row?;
            records.push(Record::from_row(headers.iter().cloned(), row.iter()));
        }

        tracing::debug!(
            columns = headers.len(),
            records = records.len(),
            "input loaded"
        );
        Ok(CsvBatch { headers, records })
    }
}
