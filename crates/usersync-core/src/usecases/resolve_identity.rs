//! Identity resolution use case
//!
//! Finds the platform user behind a login: the project roster is consulted
//! first, the domain second. Domain lookups are cached for the lifetime of
//! the resolver, misses included.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::debug;

use crate::domain::PlatformUser;
use crate::ports::{IDomain, IProject};

/// Resolves logins to platform users
pub struct IdentityResolver {
    roster: HashMap<String, PlatformUser>,
    domain: Option<Arc<dyn IDomain>>,
    cache: Mutex<HashMap<String, Option<PlatformUser>>>,
}

impl IdentityResolver {
    /// Loads the roster of `project`
    ///
    /// Without a domain, logins absent from the roster stay unresolved.
    pub async fn load(project: &dyn IProject, domain: Option<Arc<dyn IDomain>>) -> Result<Self> {
        let users = project
            .users()
            .await
            .with_context(|| format!("Failed to list users of project {}", project.pid()))?;
        Ok(Self::from_roster(users, domain))
    }

    pub fn from_roster(users: Vec<PlatformUser>, domain: Option<Arc<dyn IDomain>>) -> Self {
        let mut roster = HashMap::with_capacity(users.len());
        for user in users {
            if let Some(email) = &user.email {
                roster
                    .entry(email.to_lowercase())
                    .or_insert_with(|| user.clone());
            }
            roster.insert(user.login.to_lowercase(), user);
        }
        Self {
            roster,
            domain,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of roster entries, logins and emails counted separately
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Finds the user behind `login`, `None` when neither source knows it
    pub async fn resolve(&self, login: &str) -> Result<Option<PlatformUser>> {
        let key = login.trim().to_lowercase();
        if key.is_empty() {
            return Ok(None);
        }
        if let Some(user) = self.roster.get(&key) {
            return Ok(Some(user.clone()));
        }
        if let Some(cached) = self.cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return Ok(cached);
        }

        let Some(domain) = &self.domain else {
            return Ok(None);
        };
        debug!(login = %key, domain = domain.name(), "Looking up user in domain");
        let found = domain
            .find_user_by_login(&key)
            .await
            .with_context(|| format!("Failed to look up user {} in domain {}", key, domain.name()))?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, found.clone());
        }
        Ok(found)
    }
}
