//! Platform ports (driven/secondary ports)
//!
//! This module defines the interfaces the reconciliation logic needs from
//! the remote platform: a client that hands out domains and projects, plus
//! the domain, project and label collaborators themselves.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//!   Adapters attach a [`PlatformError`] when a failure means the target is
//!   unreachable, so callers can classify it with `downcast_ref`.
//! - Uses `#[async_trait]` for async trait methods.
//! - Generic `get`/`post`/`create`/`delete` calls carry JSON payloads for the
//!   few endpoints the filter reconciler drives directly.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::{
    ClientRecord, ExistingFilter, ObjectUri, PlatformUser, ProjectId, ResultEvent, UserRecord,
    Whitelist,
};

// ============================================================================
// PlatformError
// ============================================================================

/// Classified remote failures that make a whole target unreachable
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource existed but was removed
    #[error("Gone: {0}")]
    Gone(String),

    /// The caller has no access to the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The caller's credentials were rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl PlatformError {
    /// Finds a classified platform error anywhere in an error chain
    #[must_use]
    pub fn find(err: &anyhow::Error) -> Option<&PlatformError> {
        err.chain().find_map(|cause| cause.downcast_ref::<PlatformError>())
    }
}

// ============================================================================
// Options passed across the port
// ============================================================================

/// Options for creating or updating domain accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateUsersOptions {
    /// Keep going after a failed record
    pub ignore_failures: bool,
}

/// Shared configuration bundle for project imports
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Identities never pruned
    pub whitelist: Arc<Whitelist>,
    /// Keep going after a failed record
    pub ignore_failures: bool,
    /// Prune by removing memberships instead of disabling them
    pub remove_users_from_project: bool,
    /// Leave members that are absent from the desired set alone
    pub do_not_touch_users_that_are_not_mentioned: bool,
    /// Create user groups that do not exist yet
    pub create_non_existing_user_groups: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            whitelist: Arc::new(Whitelist::default()),
            ignore_failures: false,
            remove_users_from_project: false,
            do_not_touch_users_that_are_not_mentioned: false,
            create_non_existing_user_groups: true,
        }
    }
}

impl ImportOptions {
    /// Whether members missing from the desired set are pruned
    #[must_use]
    pub fn prunes(&self) -> bool {
        !self.do_not_touch_users_that_are_not_mentioned
    }

    #[must_use]
    pub fn create_users_options(&self) -> CreateUsersOptions {
        CreateUsersOptions {
            ignore_failures: self.ignore_failures,
        }
    }
}

// ============================================================================
// IPlatformClient
// ============================================================================

/// Entry point to the remote platform
#[async_trait::async_trait]
pub trait IPlatformClient: Send + Sync {
    /// Login of the account performing the run
    async fn current_login(&self) -> anyhow::Result<String>;

    /// Looks up a project, `None` when it does not exist
    async fn project(&self, id: &ProjectId) -> anyhow::Result<Option<Arc<dyn IProject>>>;

    /// Opens a domain (organization) by name
    async fn domain(&self, name: &str) -> anyhow::Result<Arc<dyn IDomain>>;

    /// Issues a GET against a server-relative path
    async fn get(&self, path: &str) -> anyhow::Result<serde_json::Value>;

    /// Issues a POST against a server-relative path
    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<serde_json::Value>;

    /// Posts a new object and returns the URI of the created resource
    async fn create(&self, path: &str, body: &serde_json::Value) -> anyhow::Result<ObjectUri>;

    /// Deletes the object at `uri`
    async fn delete(&self, uri: &str) -> anyhow::Result<()>;
}

// ============================================================================
// IDomain
// ============================================================================

/// An organization holding user accounts and data-product clients
#[async_trait::async_trait]
pub trait IDomain: Send + Sync {
    /// Domain name
    fn name(&self) -> &str;

    /// Creates missing accounts and updates changed ones
    ///
    /// Returns one event per record that required action.
    async fn create_users(
        &self,
        records: &[UserRecord],
        options: &CreateUsersOptions,
    ) -> anyhow::Result<Vec<ResultEvent>>;

    /// Every client of a data product (`None` = the default data product)
    async fn clients(&self, data_product: Option<&str>) -> anyhow::Result<Vec<ClientRecord>>;

    /// Finds an account by login, `None` when it does not exist
    async fn find_user_by_login(&self, login: &str) -> anyhow::Result<Option<PlatformUser>>;

    /// Deletes an account from the domain
    async fn delete_user(&self, user: &PlatformUser) -> anyhow::Result<()>;
}

// ============================================================================
// IProject
// ============================================================================

/// A project (workspace) with its members and permission objects
#[async_trait::async_trait]
pub trait IProject: Send + Sync {
    /// Project id
    fn pid(&self) -> &ProjectId;

    /// Whether the project is marked deleted
    fn is_deleted(&self) -> bool;

    /// Project URI
    fn uri(&self) -> String {
        self.pid().uri()
    }

    /// Key/value metadata stored on the project
    async fn metadata(&self) -> anyhow::Result<HashMap<String, String>>;

    /// Current members, enabled or not
    async fn users(&self) -> anyhow::Result<Vec<PlatformUser>>;

    /// Brings the membership in line with `records`
    ///
    /// Returns one event per record that required action plus one per
    /// pruned member.
    async fn import_users(
        &self,
        records: &[UserRecord],
        options: &ImportOptions,
    ) -> anyhow::Result<Vec<ResultEvent>>;

    /// Resolves a label by identifier or URI, `None` when unknown
    async fn label(&self, id_or_uri: &str) -> anyhow::Result<Option<Arc<dyn ILabel>>>;

    /// Data-access filter objects stored on the project
    async fn data_permissions(&self) -> anyhow::Result<Vec<ExistingFilter>>;
}

// ============================================================================
// ILabel
// ============================================================================

/// A display form of an attribute, used to address attribute values
#[async_trait::async_trait]
pub trait ILabel: Send + Sync {
    fn identifier(&self) -> &str;

    fn uri(&self) -> &str;

    /// URI of the attribute this label belongs to
    fn attribute_uri(&self) -> &str;

    /// URI of the element whose title is `value`, `None` when absent
    async fn find_value_uri(&self, value: &str) -> anyhow::Result<Option<String>>;

    /// Number of distinct values of the label
    async fn values_count(&self) -> anyhow::Result<u64>;
}
