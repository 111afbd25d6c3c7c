//! Data-access filter types
//!
//! A [`FilterDefinition`] is the desired state for one owner. An
//! [`ExistingFilter`] is a permission object already stored on the project.
//! A [`DesiredFilter`] is a definition resolved against the project: owner
//! URI known, clause values turned into a filter expression.

use serde::{Deserialize, Serialize};

use super::newtypes::ObjectUri;

/// One label restriction inside a definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    /// Label identifier or URI
    pub label: String,
    /// Hierarchy scope start, when the filter is scoped
    #[serde(default)]
    pub over: Option<String>,
    /// Hierarchy scope end, when the filter is scoped
    #[serde(default)]
    pub to: Option<String>,
    /// Literal label values the owner may see
    #[serde(default)]
    pub values: Vec<String>,
}

impl FilterClause {
    pub fn new(label: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            label: label.into(),
            over: None,
            to: None,
            values,
        }
    }

    /// Restricts the clause to a hierarchy scope
    pub fn scoped(mut self, over: impl Into<String>, to: impl Into<String>) -> Self {
        self.over = Some(over.into());
        self.to = Some(to.into());
        self
    }

    /// A clause is scoped only when both ends of the scope are present
    #[must_use]
    pub fn scope(&self) -> Option<(&str, &str)> {
        match (self.over.as_deref(), self.to.as_deref()) {
            (Some(over), Some(to)) => Some((over, to)),
            _ => None,
        }
    }

    /// True when only one end of the scope is set
    #[must_use]
    pub fn is_partially_scoped(&self) -> bool {
        self.over.is_some() != self.to.is_some()
    }
}

/// Desired filters for one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub owner_login: String,
    pub clauses: Vec<FilterClause>,
}

impl FilterDefinition {
    pub fn new(owner_login: impl Into<String>, clauses: Vec<FilterClause>) -> Self {
        Self {
            owner_login: owner_login.into(),
            clauses,
        }
    }
}

/// Merges definitions that share an owner login (case-insensitive)
///
/// Clauses for the same label and scope are merged, keeping the first-seen
/// value order and dropping duplicate values. Owner order follows first
/// appearance.
#[must_use]
pub fn merge_definitions(definitions: &[FilterDefinition]) -> Vec<FilterDefinition> {
    let mut merged: Vec<FilterDefinition> = Vec::new();

    for definition in definitions {
        let owner = definition.owner_login.trim();
        if owner.is_empty() {
            continue;
        }
        let index = match merged
            .iter()
            .position(|d| d.owner_login.eq_ignore_ascii_case(owner))
        {
            Some(index) => index,
            None => {
                merged.push(FilterDefinition::new(owner, Vec::new()));
                merged.len() - 1
            }
        };
        let target = &mut merged[index];

        for clause in &definition.clauses {
            match target
                .clauses
                .iter_mut()
                .find(|c| c.label == clause.label && c.over == clause.over && c.to == clause.to)
            {
                Some(existing) => {
                    for value in &clause.values {
                        if !existing.values.contains(value) {
                            existing.values.push(value.clone());
                        }
                    }
                }
                None => {
                    let mut clause = clause.clone();
                    let mut unique = Vec::with_capacity(clause.values.len());
                    for value in clause.values.drain(..) {
                        if !unique.contains(&value) {
                            unique.push(value);
                        }
                    }
                    clause.values = unique;
                    target.clauses.push(clause);
                }
            }
        }
    }

    merged
}

/// A permission object already stored on the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingFilter {
    pub uri: ObjectUri,
    /// Profile URI of the user the filter is assigned to
    pub related_user_uri: Option<ObjectUri>,
    /// The object as returned by the platform
    pub raw_payload: serde_json::Value,
}

impl ExistingFilter {
    /// The stored filter expression, if the payload carries one
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.raw_payload
            .pointer("/userFilter/content/expression")
            .and_then(serde_json::Value::as_str)
    }

    /// Whether this filter encodes the same restriction as `expression`
    #[must_use]
    pub fn matches_expression(&self, expression: &str) -> bool {
        self.expression()
            .map(|own| normalize_expression(own) == normalize_expression(expression))
            .unwrap_or(false)
    }
}

/// A definition resolved against the project, ready to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredFilter {
    pub owner_login: String,
    pub related_user_uri: ObjectUri,
    pub title: String,
    pub expression: String,
}

impl DesiredFilter {
    /// Payload used to save the filter object on the platform
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "userFilter": {
                "content": { "expression": self.expression },
                "meta": { "category": "userFilter", "title": self.title }
            }
        })
    }
}

/// Collapses whitespace so formatting differences do not count as changes
#[must_use]
pub fn normalize_expression(expression: &str) -> String {
    expression.split_whitespace().collect::<Vec<_>>().join(" ")
}
