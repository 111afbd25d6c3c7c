//! Users and roles as the platform reports them

use serde::{Deserialize, Serialize};

use super::newtypes::ObjectUri;

/// A user account, either a domain account or a project member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUser {
    pub login: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Account profile URI, the stable identity of the user
    pub profile_uri: ObjectUri,
    /// Role URI within a project, `None` for domain accounts
    pub role_uri: Option<String>,
    /// Whether the membership (or account) is enabled
    pub enabled: bool,
}

impl PlatformUser {
    pub fn new(login: impl Into<String>, profile_uri: ObjectUri) -> Self {
        Self {
            login: login.into(),
            email: None,
            first_name: None,
            last_name: None,
            profile_uri,
            role_uri: None,
            enabled: true,
        }
    }

    pub fn with_role(mut self, role_uri: impl Into<String>) -> Self {
        self.role_uri = Some(role_uri.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Case-insensitive login comparison
    #[must_use]
    pub fn has_login(&self, login: &str) -> bool {
        self.login.eq_ignore_ascii_case(login.trim())
            || self
                .email
                .as_deref()
                .map(|e| e.eq_ignore_ascii_case(login.trim()))
                .unwrap_or(false)
    }
}

/// A role available in a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRole {
    /// Stable identifier, e.g. `adminRole`
    pub identifier: String,
    /// Display title, e.g. `Admin`
    pub title: String,
    pub uri: String,
}

impl ProjectRole {
    /// Whether `name` designates this role by identifier or title
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        let name = name.trim();
        self.identifier.eq_ignore_ascii_case(name)
            || self.title.eq_ignore_ascii_case(name)
            || self.uri == name
    }
}

/// Finds a role by identifier, title or URI
#[must_use]
pub fn find_role<'a>(roles: &'a [ProjectRole], name: &str) -> Option<&'a ProjectRole> {
    roles.iter().find(|role| role.is_named(name))
}
