//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including identifier validation, mode parsing, and whitelist compilation.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The synchronization mode is not one of the supported tags
    #[error("The parameter \"sync_mode\" has to have one of the values {allowed}")]
    InvalidSyncMode {
        /// The value that was supplied
        value: String,
        /// Comma-separated list of accepted values
        allowed: String,
    },

    /// A project identifier is empty or malformed
    #[error("Invalid project id: {0}")]
    InvalidProjectId(String),

    /// A client identifier is empty or malformed
    #[error("Invalid client id: {0}")]
    InvalidClientId(String),

    /// An object URI is empty or not rooted
    #[error("Invalid object uri: {0}")]
    InvalidUri(String),

    /// A regular-expression whitelist entry failed to compile
    #[error("Invalid whitelist pattern {pattern}: {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Compiler diagnostic
        reason: String,
    },

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
