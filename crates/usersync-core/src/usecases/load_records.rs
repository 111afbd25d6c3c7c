//! Canonical record loading use case
//!
//! Turns the rows of an [`IRecordSource`] into [`UserRecord`]s. The column
//! mapping is resolved against the header row once, producing a
//! [`RowAccessor`] that reads every later row by index.
//!
//! ## Column matching
//!
//! A configured column name matches a header when both are equal after
//! lower-casing and trimming, or when their symbol forms are equal
//! (`"First Name"` and `first_name` both read as `first_name`).
//!
//! ## Multi-value fields
//!
//! `authentication_modes`, `user_group` and `ip_whitelist` are
//! comma-separated. A present but empty cell yields an empty list; an
//! absent column leaves the field unset.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ColumnMapping, UsersConfig};
use crate::domain::UserRecord;
use crate::ports::IRecordSource;

/// Rows between two progress log lines
const PROGRESS_INTERVAL: usize = 50_000;

// ============================================================================
// LoadError
// ============================================================================

/// Failure while reading the input source
///
/// Loading is all-or-nothing: a partially read source is never returned.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("There was an error during loading users from csv file. Message: {message}")]
    Source {
        /// Underlying failure, including the row number when known
        message: String,
    },
}

impl LoadError {
    fn at_row(row: usize, err: &anyhow::Error) -> Self {
        LoadError::Source {
            message: format!("row {row}: {err:#}"),
        }
    }
}

// ============================================================================
// LoaderOptions
// ============================================================================

/// Settings the loader needs from the users configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderOptions {
    pub columns: ColumnMapping,
    /// Fixed SSO provider replacing the column value
    pub sso_provider: Option<String>,
    /// Fixed authentication modes replacing the column value
    pub authentication_modes: Option<Vec<String>>,
    /// Column holding the partition key, read only when set
    pub partition_column: Option<String>,
}

impl LoaderOptions {
    pub fn from_config(users: &UsersConfig) -> Self {
        Self {
            columns: users.columns.clone(),
            sso_provider: users
                .sso_provider
                .clone()
                .filter(|p| !p.trim().is_empty()),
            authentication_modes: users.authentication_modes_override(),
            partition_column: users
                .multiple_projects_column
                .clone()
                .filter(|c| !c.trim().is_empty()),
        }
    }
}

// ============================================================================
// RowAccessor
// ============================================================================

/// Column indices resolved once from the header row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowAccessor {
    first_name: Option<usize>,
    last_name: Option<usize>,
    login: Option<usize>,
    password: Option<usize>,
    email: Option<usize>,
    role: Option<usize>,
    sso_provider: Option<usize>,
    authentication_modes: Option<usize>,
    user_groups: Option<usize>,
    language: Option<usize>,
    company: Option<usize>,
    position: Option<usize>,
    country: Option<usize>,
    phone: Option<usize>,
    ip_whitelist: Option<usize>,
    partition: Option<usize>,
}

impl RowAccessor {
    /// Resolves every mapped column against `headers`
    pub fn new(headers: &[String], columns: &ColumnMapping, partition: Option<&str>) -> Self {
        let lookup = |name: &str| find_column(headers, name);
        Self {
            first_name: lookup(&columns.first_name),
            last_name: lookup(&columns.last_name),
            login: lookup(&columns.login),
            password: lookup(&columns.password),
            email: lookup(&columns.email),
            role: lookup(&columns.role),
            sso_provider: lookup(&columns.sso_provider),
            authentication_modes: lookup(&columns.authentication_modes),
            user_groups: lookup(&columns.user_groups),
            language: lookup(&columns.language),
            company: lookup(&columns.company),
            position: lookup(&columns.position),
            country: lookup(&columns.country),
            phone: lookup(&columns.phone),
            ip_whitelist: lookup(&columns.ip_whitelist),
            partition: partition.and_then(lookup),
        }
    }

    /// Whether the partition column was found in the header
    #[must_use]
    pub fn has_partition_column(&self) -> bool {
        self.partition.is_some()
    }

    /// Builds the record for one row; unusable rows yield `None`
    pub fn record(&self, row: &[String], options: &LoaderOptions) -> Option<UserRecord> {
        let login = text(row, self.login).map(|l| l.trim().to_string());
        let email = text(row, self.email)
            .or_else(|| login.clone())
            .map(|e| e.trim().to_string());

        let authentication_modes = match &options.authentication_modes {
            Some(modes) => Some(modes.clone()),
            None => list(row, self.authentication_modes).map(|modes| {
                modes.into_iter().map(|m| m.to_uppercase()).collect()
            }),
        };

        let record = UserRecord {
            first_name: text(row, self.first_name),
            last_name: text(row, self.last_name),
            login,
            password: text(row, self.password),
            email,
            role: text(row, self.role),
            sso_provider: options
                .sso_provider
                .clone()
                .or_else(|| text(row, self.sso_provider)),
            authentication_modes,
            user_group: list(row, self.user_groups),
            partition_key: text(row, self.partition).map(|k| k.trim().to_string()),
            language: text(row, self.language),
            company: text(row, self.company),
            position: text(row, self.position),
            country: text(row, self.country),
            phone: text(row, self.phone),
            ip_whitelist: list(row, self.ip_whitelist),
        };

        record.is_usable().then_some(record)
    }
}

/// Symbol-like form of a column name: lower-case, runs of other characters
/// collapsed into `_`
fn symbolize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    headers
        .iter()
        .position(|h| h.trim().to_lowercase() == wanted)
        .or_else(|| {
            let wanted = symbolize(&wanted);
            headers.iter().position(|h| symbolize(h) == wanted)
        })
}

/// Cell text; empty cells read as absent
fn text(row: &[String], index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| row.get(i))
        .filter(|v| !v.is_empty())
        .cloned()
}

/// Comma-separated cell; a present column always yields a list
fn list(row: &[String], index: Option<usize>) -> Option<Vec<String>> {
    let index = index?;
    let value = row.get(index).map(String::as_str).unwrap_or_default();
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

// ============================================================================
// LoadRecordsUseCase
// ============================================================================

/// Use case for reading the desired user records from a source
pub struct LoadRecordsUseCase {
    options: LoaderOptions,
}

impl LoadRecordsUseCase {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Reads every row of `source`
    ///
    /// Rows without a login or email are dropped silently.
    ///
    /// # Errors
    /// Returns [`LoadError::Source`] for the first row the source fails to
    /// deliver.
    #[tracing::instrument(skip(self, source))]
    pub fn execute(&self, source: &mut dyn IRecordSource) -> Result<Vec<UserRecord>, LoadError> {
        // Step 1: Resolve the column mapping against the header
        let accessor = RowAccessor::new(
            source.headers(),
            &self.options.columns,
            self.options.partition_column.as_deref(),
        );
        if self.options.partition_column.is_some() && !accessor.has_partition_column() {
            debug!(
                column = ?self.options.partition_column,
                "Partition column not present in input"
            );
        }

        // Step 2: Read rows, keeping the usable ones
        let mut records = Vec::new();
        let mut rows = 0usize;
        while let Some(row) = source.next_row() {
            rows += 1;
            let row = row.map_err(|e| LoadError::at_row(rows, &e))?;
            if let Some(record) = accessor.record(&row, &self.options) {
                records.push(record);
            }
            if rows % PROGRESS_INTERVAL == 0 {
                info!(rows, "Loaded rows from input");
            }
        }

        info!(rows, records = records.len(), "Finished loading user records");
        Ok(records)
    }
}
