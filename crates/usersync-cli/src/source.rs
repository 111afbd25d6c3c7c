//! CSV record source
//!
//! Reads a delimited file with a header row. Header names are trimmed,
//! stripped of a UTF-8 byte-order mark and lower-cased so configured column
//! names match regardless of the file's capitalization.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use usersync_core::ports::IRecordSource;

const BOM: char = '\u{feff}';

/// [`IRecordSource`] over a CSV reader
pub struct CsvRecordSource<R> {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<R>,
}

impl CsvRecordSource<File> {
    /// Opens the CSV file at `path`
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to read header of {}", path.display()))
    }
}

impl<R: Read> CsvRecordSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches(BOM).trim().to_lowercase())
            .collect();
        Ok(Self {
            headers,
            records: reader.into_records(),
        })
    }
}

impl<R: Read + Send> IRecordSource for CsvRecordSource<R> {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next_row(&mut self) -> Option<Result<Vec<String>>> {
        self.records.next().map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(anyhow::Error::from)
        })
    }
}
