//! Identities exempt from removal and pruning
//!
//! Patterns are compiled once per run. The identity running the
//! synchronization is always exempt.

use std::collections::HashSet;

use regex::Regex;

use super::errors::DomainError;

/// Literal logins plus compiled patterns
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    literals: HashSet<String>,
    patterns: Vec<Regex>,
}

impl Whitelist {
    /// Builds a whitelist from literal entries and regular expressions
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidPattern`] for the first pattern that
    /// does not compile
    pub fn new<L, P>(literals: L, patterns: P) -> Result<Self, DomainError>
    where
        L: IntoIterator,
        L::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let literals = literals
            .into_iter()
            .map(|l| l.as_ref().trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|e| DomainError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { literals, patterns })
    }

    /// Adds the identity performing the run
    #[must_use]
    pub fn with_identity(mut self, login: &str) -> Self {
        let login = login.trim();
        if !login.is_empty() {
            self.literals.insert(login.to_lowercase());
        }
        self
    }

    /// Whether `login` is exempt
    ///
    /// Literal entries compare case-insensitively; patterns see the login
    /// as given.
    #[must_use]
    pub fn contains(&self, login: &str) -> bool {
        self.literals.contains(&login.trim().to_lowercase())
            || self.patterns.iter().any(|p| p.is_match(login))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.patterns.is_empty()
    }
}
