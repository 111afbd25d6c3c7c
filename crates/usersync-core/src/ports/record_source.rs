//! Tabular record source port
//!
//! A record source yields a header row followed by data rows. The loader
//! resolves its column mapping against the headers once and then reads
//! cells by index. Physically fetching and decoding the data is the
//! adapter's concern.

/// Port trait for a sequence of tabular rows with a header
pub trait IRecordSource: Send {
    /// Header names in column order
    fn headers(&self) -> &[String];

    /// Next data row, `None` once the source is exhausted
    ///
    /// A row may be shorter than the header; missing cells read as absent.
    fn next_row(&mut self) -> Option<anyhow::Result<Vec<String>>>;
}

/// Record source over rows already held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    headers: Vec<String>,
    rows: std::collections::VecDeque<Vec<String>>,
}

impl InMemorySource {
    pub fn new<H, R>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = Vec<String>>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows.into_iter().collect(),
        }
    }
}

impl IRecordSource for InMemorySource {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next_row(&mut self) -> Option<anyhow::Result<Vec<String>>> {
        self.rows.pop_front().map(Ok)
    }
}
