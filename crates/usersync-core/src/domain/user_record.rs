//! Canonical desired-state user record
//!
//! A [`UserRecord`] is produced once per source row by the record loader and
//! consumed once by the dispatcher. Records are never persisted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Desired state of one user as described by the input source
///
/// Multi-value fields are `Option<Vec<_>>`: `Some(vec![])` means the column
/// was present but empty, `None` means the column was absent altogether.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub sso_provider: Option<String>,
    /// Upper-cased authentication modes, e.g. `SSO`, `PASSWORD`
    pub authentication_modes: Option<Vec<String>>,
    pub user_group: Option<Vec<String>>,
    /// Project id or client id the record is routed to, in partitioned modes
    pub partition_key: Option<String>,
    pub language: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub ip_whitelist: Option<Vec<String>>,
}

impl UserRecord {
    /// Creates a record carrying only a login
    pub fn with_login(login: impl Into<String>) -> Self {
        let login = login.into();
        Self {
            email: Some(login.clone()),
            login: Some(login),
            ..Self::default()
        }
    }

    /// Sets the partition key
    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// Sets the role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Sets the user groups
    pub fn with_user_groups(mut self, groups: Vec<String>) -> Self {
        self.user_group = Some(groups);
        self
    }

    /// Identity used for deduplication and lookups: login, else email
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        non_blank(self.login.as_deref()).or_else(|| non_blank(self.email.as_deref()))
    }

    /// A record is usable only if it carries a login or an email
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.identity().is_some()
    }

    /// The partition key when it is present and not blank
    #[must_use]
    pub fn partition_key(&self) -> Option<&str> {
        non_blank(self.partition_key.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Removes later duplicates by identity, keeping the first occurrence
///
/// Records without an identity are dropped.
#[must_use]
pub fn dedup_by_identity(records: &[UserRecord]) -> Vec<UserRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| match record.identity() {
            Some(identity) => seen.insert(identity.to_string()),
            None => false,
        })
        .cloned()
        .collect()
}
