//! usersync REST - HTTP adapter for the platform ports
//!
//! Provides async implementations of:
//! - [`IPlatformClient`](usersync_core::ports::IPlatformClient) over the platform REST API
//! - Domains: account creation, lookup, deletion and data-product clients
//! - Projects: membership import, roles, metadata, labels and filter objects
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client with status classification
//! - [`models`] - Wire payloads
//! - [`platform`] - Entry point handing out domains and projects
//! - [`domain`] - Domain (organization) adapter
//! - [`project`] - Project and label adapters

pub mod client;
pub mod domain;
pub mod models;
pub mod platform;
pub mod project;

pub use client::RestClient;
pub use domain::RestDomain;
pub use platform::RestPlatform;
pub use project::{RestLabel, RestProject};

use thiserror::Error;
use usersync_core::ports::PlatformError;

/// Errors that can occur when communicating with the platform API
#[derive(Debug, Error)]
pub enum RestError {
    /// Credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller may not access the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource existed but has been removed
    #[error("Gone: {0}")]
    Gone(String),

    /// The request conflicts with the current state of the resource
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RestError {
    /// The port-level classification of this error, if it has one
    #[must_use]
    pub fn platform(&self) -> Option<PlatformError> {
        match self {
            RestError::Unauthorized(m) => Some(PlatformError::Unauthorized(m.clone())),
            RestError::Forbidden(m) => Some(PlatformError::Forbidden(m.clone())),
            RestError::NotFound(m) => Some(PlatformError::NotFound(m.clone())),
            RestError::Gone(m) => Some(PlatformError::Gone(m.clone())),
            _ => None,
        }
    }

    /// Whether the error means the resource does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RestError::NotFound(_))
    }

    /// Converts into an `anyhow::Error` whose chain carries the
    /// [`PlatformError`] classification
    #[must_use]
    pub fn into_anyhow(self) -> anyhow::Error {
        match self.platform() {
            Some(platform) => anyhow::Error::new(platform).context(self),
            None => anyhow::Error::new(self),
        }
    }
}
