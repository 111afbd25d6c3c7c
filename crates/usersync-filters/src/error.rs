//! Error types for the filter reconciler

use thiserror::Error;

/// Errors that can occur while building or reconciling data-access filters
#[derive(Debug, Error)]
pub enum FilterError {
    /// A clause names a label the project does not have
    #[error("Label \"{label}\" was not found in project {pid}")]
    LabelNotFound { label: String, pid: String },

    /// Some literal values do not exist as elements of the label
    #[error("Values {} of label \"{label}\" were not found", .values.join(", "))]
    MissingValues { label: String, values: Vec<String> },

    /// A clause sets only one end of its hierarchy scope
    #[error("Clause of label \"{label}\" must set both over and to, or neither")]
    IncompleteScope { label: String },

    /// A required column is absent from the definition source
    #[error("Column \"{0}\" was not found in the filter source")]
    MissingColumn(String),

    /// The definition source could not be read
    #[error("There was an error during loading filters. Message: {0}")]
    Source(String),

    /// The platform rejected part of the filter assignment
    #[error("Creating user filters resulted in errors ({failed} failed)")]
    CreateFailed { failed: usize },

    /// The platform returned a payload of an unexpected shape
    #[error("Unexpected response from {path}: {reason}")]
    InvalidResponse { path: String, reason: String },

    /// Remote call failure
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}
