//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// RunId
// ============================================================================

/// Identifier of a single synchronization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RunId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid RunId: {e}")))
    }
}

// ============================================================================
// ProjectId
// ============================================================================

/// Platform identifier of a project (workspace), also called its pid
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a new ProjectId
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    /// Returns error if the id is blank or contains a path separator
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return Err(DomainError::InvalidProjectId(
                "Project id cannot be empty".to_string(),
            ));
        }
        if id.contains('/') || id.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidProjectId(format!(
                "Project id contains invalid characters: {id}"
            )));
        }
        Ok(Self(id.to_string()))
    }

    /// Extracts the pid from a project URI such as `/gdc/projects/abc123`
    ///
    /// # Errors
    /// Returns error if the URI has no trailing segment
    pub fn from_uri(uri: &str) -> Result<Self, DomainError> {
        let segment = uri.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        Self::new(segment)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical URI of this project
    #[must_use]
    pub fn uri(&self) -> String {
        format!("/gdc/projects/{}", self.0)
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

// ============================================================================
// ClientId
// ============================================================================

/// Caller-defined identifier of a client within a data product
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Create a new ClientId
    ///
    /// # Errors
    /// Returns error if the id is blank
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return Err(DomainError::InvalidClientId(
                "Client id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id.to_string()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ClientId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

// ============================================================================
// ObjectUri
// ============================================================================

/// Server-relative URI of a platform object (user profile, filter, label...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectUri(String);

impl ObjectUri {
    /// Create a new ObjectUri
    ///
    /// # Errors
    /// Returns error if the URI is empty or not rooted at `/`
    pub fn new(uri: impl Into<String>) -> Result<Self, DomainError> {
        let uri = uri.into();
        if uri.is_empty() {
            return Err(DomainError::InvalidUri("URI cannot be empty".to_string()));
        }
        if !uri.starts_with('/') {
            return Err(DomainError::InvalidUri(format!(
                "URI must start with '/': {uri}"
            )));
        }
        Ok(Self(uri))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, usually the object id
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.0.trim_end_matches('/').rsplit('/').next().unwrap_or("")
    }
}

impl Display for ObjectUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectUri {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ObjectUri {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectUri> for String {
    fn from(uri: ObjectUri) -> Self {
        uri.0
    }
}
