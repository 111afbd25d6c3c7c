//! Clients of a data product
//!
//! A client belongs to a segment and may or may not have a provisioned
//! project. A client without a project is valid but cannot be synchronized.

use serde::{Deserialize, Serialize};

use super::newtypes::{ClientId, ProjectId};

/// A client of a data product, as listed by the domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub client_id: ClientId,
    /// URI of the segment the client belongs to
    pub segment_uri: Option<String>,
    /// URI of the client's project, absent until provisioned
    pub project_uri: Option<String>,
}

impl ClientRecord {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            segment_uri: None,
            project_uri: None,
        }
    }

    pub fn with_segment(mut self, segment_uri: impl Into<String>) -> Self {
        self.segment_uri = Some(segment_uri.into());
        self
    }

    pub fn with_project(mut self, project_uri: impl Into<String>) -> Self {
        self.project_uri = Some(project_uri.into());
        self
    }

    /// The project id, when the client has a project
    #[must_use]
    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .and_then(|uri| ProjectId::from_uri(uri).ok())
    }

    /// Whether the client belongs to one of `segments`
    ///
    /// An empty segment list means no restriction.
    #[must_use]
    pub fn in_segments(&self, segments: &[String]) -> bool {
        if segments.is_empty() {
            return true;
        }
        match &self.segment_uri {
            Some(uri) => segments.iter().any(|s| s == uri),
            None => false,
        }
    }
}
