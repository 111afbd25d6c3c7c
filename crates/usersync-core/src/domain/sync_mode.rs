//! Synchronization mode tags
//!
//! The mode selects how desired records are routed to targets. It is parsed
//! from configuration before anything touches the platform, so an unknown tag
//! aborts the run up front.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// One of the nine supported synchronization strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Create or update users in the domain, nothing at project level
    AddToOrganization,
    /// Delete the listed users from the domain
    RemoveFromOrganization,
    /// Import all records into the configured project
    SyncProject,
    /// Create users in the domain, then import them into the configured project
    SyncDomainAndProject,
    /// Partition records by a project id column and import each partition
    SyncMultipleProjectsBasedOnPid,
    /// Import only records whose project id column equals the configured project
    SyncOneProjectBasedOnPid,
    /// Import only records whose custom id matches the configured project's client
    SyncOneProjectBasedOnCustomId,
    /// Partition records by client id and import into each client's project
    SyncMultipleProjectsBasedOnCustomId,
    /// Like the custom id mode over all domain clients, pruning unmentioned clients
    SyncDomainClientWorkspaces,
}

impl SyncMode {
    /// Every mode, in documentation order
    pub const ALL: [SyncMode; 9] = [
        SyncMode::AddToOrganization,
        SyncMode::RemoveFromOrganization,
        SyncMode::SyncProject,
        SyncMode::SyncDomainAndProject,
        SyncMode::SyncMultipleProjectsBasedOnPid,
        SyncMode::SyncOneProjectBasedOnPid,
        SyncMode::SyncOneProjectBasedOnCustomId,
        SyncMode::SyncMultipleProjectsBasedOnCustomId,
        SyncMode::SyncDomainClientWorkspaces,
    ];

    /// The configuration tag for this mode
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SyncMode::AddToOrganization => "add_to_organization",
            SyncMode::RemoveFromOrganization => "remove_from_organization",
            SyncMode::SyncProject => "sync_project",
            SyncMode::SyncDomainAndProject => "sync_domain_and_project",
            SyncMode::SyncMultipleProjectsBasedOnPid => "sync_multiple_projects_based_on_pid",
            SyncMode::SyncOneProjectBasedOnPid => "sync_one_project_based_on_pid",
            SyncMode::SyncOneProjectBasedOnCustomId => "sync_one_project_based_on_custom_id",
            SyncMode::SyncMultipleProjectsBasedOnCustomId => {
                "sync_multiple_projects_based_on_custom_id"
            }
            SyncMode::SyncDomainClientWorkspaces => "sync_domain_client_workspaces",
        }
    }

    /// Comma-separated list of every accepted tag
    #[must_use]
    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(SyncMode::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the mode needs a directly configured target project
    #[must_use]
    pub const fn requires_project(&self) -> bool {
        matches!(
            self,
            SyncMode::SyncProject
                | SyncMode::SyncDomainAndProject
                | SyncMode::SyncOneProjectBasedOnPid
                | SyncMode::SyncOneProjectBasedOnCustomId
        )
    }

    /// Whether records are routed by their partition key column
    #[must_use]
    pub const fn uses_partition_key(&self) -> bool {
        matches!(
            self,
            SyncMode::SyncMultipleProjectsBasedOnPid
                | SyncMode::SyncOneProjectBasedOnPid
                | SyncMode::SyncOneProjectBasedOnCustomId
                | SyncMode::SyncMultipleProjectsBasedOnCustomId
                | SyncMode::SyncDomainClientWorkspaces
        )
    }

    /// Whether the mode operates on domain scope only
    #[must_use]
    pub const fn is_organization_level(&self) -> bool {
        matches!(
            self,
            SyncMode::AddToOrganization | SyncMode::RemoveFromOrganization
        )
    }
}

impl Default for SyncMode {
    fn default() -> Self {
        SyncMode::SyncDomainAndProject
    }
}

impl Display for SyncMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| DomainError::InvalidSyncMode {
                value: s.to_string(),
                allowed: Self::allowed_values(),
            })
    }
}
