//! Desired filter builder
//!
//! Resolves [`FilterDefinition`]s against a project: the owner login becomes
//! a profile URI, every clause label becomes an attribute and every literal
//! value becomes an element URI. The result is one [`DesiredFilter`] per
//! owner whose expression ANDs the owner's clauses.
//!
//! Expressions are built deterministically (value URIs sorted) so that a
//! re-run over unchanged input produces the same text and matches the
//! stored filter.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use usersync_core::domain::{DesiredFilter, FilterClause, FilterDefinition, ResultEvent};
use usersync_core::ports::{ILabel, IProject, IRunReporter};
use usersync_core::usecases::IdentityResolver;

use crate::error::FilterError;

/// Expression of a clause whose values all resolved to nothing
pub const UNRESTRICTED: &str = "TRUE";

/// Builds the expression of one clause
///
/// `[attr] IN ([v1], [v2])`, wrapped as `(...) OVER [over] TO [to]` when the
/// clause is scoped. An empty value set yields [`UNRESTRICTED`].
#[must_use]
pub fn clause_expression(
    attribute_uri: &str,
    value_uris: &[String],
    scope: Option<(&str, &str)>,
) -> String {
    if value_uris.is_empty() {
        return UNRESTRICTED.to_string();
    }
    let mut sorted = value_uris.to_vec();
    sorted.sort();
    sorted.dedup();
    let values = sorted
        .iter()
        .map(|uri| format!("[{uri}]"))
        .collect::<Vec<_>>()
        .join(", ");
    let expression = format!("[{attribute_uri}] IN ({values})");
    match scope {
        Some((over, to)) => format!("({expression}) OVER [{over}] TO [{to}]"),
        None => expression,
    }
}

/// Joins clause expressions with `AND`
#[must_use]
pub fn combine_expressions(expressions: &[String]) -> String {
    let restricting: Vec<&str> = expressions
        .iter()
        .map(String::as_str)
        .filter(|e| *e != UNRESTRICTED)
        .collect();
    if restricting.is_empty() {
        UNRESTRICTED.to_string()
    } else {
        restricting.join(" AND ")
    }
}

/// Title given to the filter object of an owner
#[must_use]
pub fn filter_title(owner_login: &str) -> String {
    format!("User filter - {owner_login}")
}

/// Outcome of building desired filters
#[derive(Debug, Default)]
pub struct BuiltFilters {
    pub desired: Vec<DesiredFilter>,
    /// One `error` event per definition whose owner could not be resolved
    pub unresolved: Vec<ResultEvent>,
}

/// Resolves definitions into desired filters for one project
pub struct FilterBuilder<'a> {
    project: &'a dyn IProject,
    resolver: &'a IdentityResolver,
    reporter: Arc<dyn IRunReporter>,
    ignore_missing_values: bool,
    labels: HashMap<String, Arc<dyn ILabel>>,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(
        project: &'a dyn IProject,
        resolver: &'a IdentityResolver,
        reporter: Arc<dyn IRunReporter>,
        ignore_missing_values: bool,
    ) -> Self {
        Self {
            project,
            resolver,
            reporter,
            ignore_missing_values,
            labels: HashMap::new(),
        }
    }

    /// Builds one desired filter per definition
    ///
    /// # Errors
    /// [`FilterError::LabelNotFound`] for an unknown label,
    /// [`FilterError::IncompleteScope`] for a clause with only one scope end,
    /// [`FilterError::MissingValues`] for unknown values unless missing
    /// values are ignored, or any remote failure.
    pub async fn build(
        &mut self,
        definitions: &[FilterDefinition],
    ) -> Result<BuiltFilters, FilterError> {
        let mut built = BuiltFilters::default();

        for definition in definitions {
            let owner = definition.owner_login.as_str();
            let Some(user) = self.resolver.resolve(owner).await? else {
                warn!(login = owner, "Filter owner not found in project or domain");
                built.unresolved.push(ResultEvent::error(
                    owner,
                    format!("User {owner} was not found in project {} nor in its domain", self.project.pid()),
                ));
                continue;
            };

            let mut expressions = Vec::with_capacity(definition.clauses.len());
            for clause in &definition.clauses {
                expressions.push(self.clause(clause).await?);
            }

            built.desired.push(DesiredFilter {
                owner_login: owner.to_string(),
                related_user_uri: user.profile_uri,
                title: filter_title(owner),
                expression: combine_expressions(&expressions),
            });
        }

        debug!(
            desired = built.desired.len(),
            unresolved = built.unresolved.len(),
            "Desired filters built"
        );
        Ok(built)
    }

    async fn clause(&mut self, clause: &FilterClause) -> Result<String, FilterError> {
        if clause.is_partially_scoped() {
            return Err(FilterError::IncompleteScope {
                label: clause.label.clone(),
            });
        }
        let label = self.label(&clause.label).await?;

        let mut uris = Vec::with_capacity(clause.values.len());
        let mut missing = Vec::new();
        for value in &clause.values {
            match label.find_value_uri(value).await? {
                Some(uri) => uris.push(uri),
                None => missing.push(value.clone()),
            }
        }

        if !missing.is_empty() {
            if !self.ignore_missing_values {
                return Err(FilterError::MissingValues {
                    label: clause.label.clone(),
                    values: missing,
                });
            }
            self.reporter.warn(&format!(
                "Skipping {} values of label \"{}\" that were not found: {}",
                missing.len(),
                clause.label,
                missing.join(", ")
            ));
        }

        Ok(clause_expression(label.attribute_uri(), &uris, clause.scope()))
    }

    async fn label(&mut self, id_or_uri: &str) -> Result<Arc<dyn ILabel>, FilterError> {
        if let Some(label) = self.labels.get(id_or_uri) {
            return Ok(Arc::clone(label));
        }
        let label = self
            .project
            .label(id_or_uri)
            .await?
            .ok_or_else(|| FilterError::LabelNotFound {
                label: id_or_uri.to_string(),
                pid: self.project.pid().to_string(),
            })?;
        debug!(label = label.identifier(), uri = label.uri(), "Resolved label");
        self.labels.insert(id_or_uri.to_string(), Arc::clone(&label));
        Ok(label)
    }
}
