//! Filter reconciler
//!
//! Brings the data-access filters of a project in line with a set of
//! desired definitions.
//!
//! ## Reconciliation Flow
//!
//! 1. **Merge**: definitions sharing an owner are merged into one.
//! 2. **Build**: owners, labels and values are resolved against the project
//!    (see [`FilterBuilder`]).
//! 3. **Plan**: desired filters are diffed against the stored ones (see
//!    [`FilterPlan`]).
//! 4. **Execute**: new filter objects are saved and assigned to their user,
//!    stale ones are unassigned and deleted. In dry-run mode every intended
//!    change is reported as a `dry_run` event instead.
//!
//! Owners that cannot be resolved never reach the plan; they are returned in
//! [`ReconcileResult::errors`], apart from the operation results.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use usersync_core::domain::{
    merge_definitions, DesiredFilter, ExistingFilter, FilterDefinition, ObjectUri, Operation,
    ProjectId, ResultEvent,
};
use usersync_core::ports::{IDomain, IPlatformClient, IProject, IRunReporter};
use usersync_core::usecases::IdentityResolver;

use crate::builder::FilterBuilder;
use crate::error::FilterError;
use crate::plan::FilterPlan;

/// Options of one reconciliation
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Report intended changes without issuing any mutating call
    pub dry_run: bool,
    /// Skip unknown label values instead of failing
    pub ignore_missing_values: bool,
    /// Logins the run has authority over; filters of other users are never
    /// deleted
    pub users_brick_input: Option<Vec<String>>,
}

/// Outcome of a reconciliation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileResult {
    /// Filters created, or that would be created in dry-run mode
    pub created: usize,
    /// Filters deleted, or that would be deleted in dry-run mode
    pub deleted: usize,
    /// One event per create or delete, `dry_run` events in dry-run mode
    pub results: Vec<ResultEvent>,
    /// `error` events of owners that could not be resolved
    #[serde(default)]
    pub errors: Vec<ResultEvent>,
}

impl ReconcileResult {
    /// Number of failing events across results and errors
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.results
            .iter()
            .chain(&self.errors)
            .filter(|e| e.is_failure())
            .count()
    }
}

/// Reconciles desired filter definitions with a project's filters
pub struct FilterReconciler {
    client: Arc<dyn IPlatformClient>,
    reporter: Arc<dyn IRunReporter>,
}

impl FilterReconciler {
    pub fn new(client: Arc<dyn IPlatformClient>, reporter: Arc<dyn IRunReporter>) -> Self {
        Self { client, reporter }
    }

    /// Reconciles `definitions` against the filters stored on `project`
    ///
    /// Owners absent from the project roster are looked up in `domain` when
    /// one is given.
    ///
    /// # Errors
    /// Label or value resolution failures, remote failures, and
    /// [`FilterError::CreateFailed`] when the platform refused part of the
    /// new assignments.
    #[tracing::instrument(skip_all, fields(pid = %project.pid(), definitions = definitions.len(), dry_run = options.dry_run))]
    pub async fn execute(
        &self,
        project: &dyn IProject,
        domain: Option<Arc<dyn IDomain>>,
        definitions: &[FilterDefinition],
        options: &ReconcileOptions,
    ) -> Result<ReconcileResult, FilterError> {
        // Step 1: Merge definitions per owner
        let definitions = merge_definitions(definitions);

        // Step 2: Resolve them against the project
        let resolver = IdentityResolver::load(project, domain).await?;
        debug!(roster = resolver.roster_len(), "Project roster loaded");
        let built = FilterBuilder::new(
            project,
            &resolver,
            Arc::clone(&self.reporter),
            options.ignore_missing_values,
        )
        .build(&definitions)
        .await?;

        // Step 3: Diff against the stored filters
        let existing = project.data_permissions().await?;
        let managed = match &options.users_brick_input {
            Some(logins) => Some(self.managed_users(&resolver, logins).await?),
            None => None,
        };
        let plan = FilterPlan::compute(&built.desired, &existing, managed.as_ref());
        self.reporter.info(&format!(
            "Data permissions computed: {} to create and {} to delete",
            plan.to_create.len(),
            plan.to_delete.len()
        ));

        let mut result = ReconcileResult {
            errors: built.unresolved,
            ..ReconcileResult::default()
        };

        // Step 4: Execute, or report what would be executed
        if options.dry_run {
            self.reporter
                .warn("Option \"dry_run\" specified. No user filters will be altered!");
            result.created = plan.to_create.len();
            result.deleted = plan.to_delete.len();
            result.results.extend(plan.to_create.iter().map(|f| {
                ResultEvent::dry_run(&f.owner_login, Operation::Create).with_detail(&f.expression)
            }));
            result.results.extend(plan.to_delete.iter().map(|f| {
                let event = ResultEvent::dry_run(f.uri.as_str(), Operation::Delete);
                match &f.related_user_uri {
                    Some(user) => event.with_detail(user.as_str()),
                    None => event,
                }
            }));
            return Ok(result);
        }

        let pid = project.pid();
        let created = self.create_filters(pid, &plan.to_create).await?;
        result.created = created.len();
        result.results.extend(created);

        let deleted = self.delete_filters(pid, &plan.to_delete).await?;
        result.deleted = deleted
            .iter()
            .filter(|e| e.operation == Some(Operation::Delete) && !e.is_failure())
            .count();
        result.results.extend(deleted);

        info!(
            created = result.created,
            deleted = result.deleted,
            matched = plan.matched,
            "User filters reconciled"
        );
        Ok(result)
    }

    /// Profile URIs of the managed logins that resolve to a user
    async fn managed_users(
        &self,
        resolver: &IdentityResolver,
        logins: &[String],
    ) -> Result<HashSet<ObjectUri>, FilterError> {
        let mut managed = HashSet::with_capacity(logins.len());
        for login in logins {
            match resolver.resolve(login).await? {
                Some(user) => {
                    managed.insert(user.profile_uri);
                }
                None => debug!(login = %login, "Managed login not found, ignoring"),
            }
        }
        Ok(managed)
    }

    async fn create_filters(
        &self,
        pid: &ProjectId,
        filters: &[DesiredFilter],
    ) -> Result<Vec<ResultEvent>, FilterError> {
        let mut events = Vec::with_capacity(filters.len());
        let mut failed = 0;

        for (user, group) in group_by_user(filters, |f| Some(&f.related_user_uri)) {
            let mut uris = Vec::with_capacity(group.len());
            for filter in &group {
                let uri = self
                    .client
                    .create(&format!("/gdc/md/{pid}/obj"), &filter.to_payload())
                    .await?;
                debug!(owner = %filter.owner_login, uri = %uri, "Filter object saved");
                uris.push(uri.to_string());
            }

            let mut assigned = self.assigned_filters(pid, user).await?;
            for uri in &uris {
                if !assigned.contains(uri) {
                    assigned.push(uri.clone());
                }
            }
            let group_failed = self.assign(pid, user, assigned).await?;

            if group_failed > 0 {
                failed += group_failed;
                self.discard(&uris).await;
                continue;
            }
            events.extend(
                group
                    .iter()
                    .zip(&uris)
                    .map(|(filter, uri)| ResultEvent::created(&filter.owner_login).with_detail(uri)),
            );
        }

        if failed > 0 {
            self.reporter.info(&format!(
                "Created {} user filters before the platform refused {failed}",
                events.len()
            ));
            return Err(FilterError::CreateFailed { failed });
        }
        Ok(events)
    }

    async fn delete_filters(
        &self,
        pid: &ProjectId,
        filters: &[ExistingFilter],
    ) -> Result<Vec<ResultEvent>, FilterError> {
        let mut events = Vec::with_capacity(filters.len());

        for (user, group) in group_by_user(filters, |f| f.related_user_uri.as_ref()) {
            let stale: HashSet<&str> = group.iter().map(|f| f.uri.as_str()).collect();
            let remaining: Vec<String> = self
                .assigned_filters(pid, user)
                .await?
                .into_iter()
                .filter(|uri| !stale.contains(uri.as_str()))
                .collect();

            if self.assign(pid, user, remaining).await? > 0 {
                warn!(user = %user, "Platform refused to unassign filters");
                events.extend(group.iter().map(|f| {
                    ResultEvent::failed(f.uri.as_str(), format!("Could not unassign filter from {user}"))
                        .with_operation(Operation::Delete)
                }));
                continue;
            }

            for filter in group {
                self.client.delete(filter.uri.as_str()).await?;
                events.push(ResultEvent::deleted(filter.uri.as_str()).with_detail(user.as_str()));
            }
        }
        Ok(events)
    }

    /// Deletes filter objects whose assignment was refused
    async fn discard(&self, uris: &[String]) {
        for uri in uris {
            if let Err(e) = self.client.delete(uri).await {
                warn!(uri = %uri, error = %e, "Failed to delete unassigned filter object");
            }
        }
    }

    /// Filter URIs currently assigned to `user`
    async fn assigned_filters(
        &self,
        pid: &ProjectId,
        user: &ObjectUri,
    ) -> Result<Vec<String>, FilterError> {
        let path = format!("/gdc/md/{pid}/userfilters?users={user}");
        let body = self.client.get(&path).await?;
        let items = body
            .pointer("/userFilters/items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let item = items
            .iter()
            .find(|item| item.get("user").and_then(Value::as_str) == Some(user.as_str()))
            .or_else(|| items.first());

        let Some(item) = item else {
            return Ok(Vec::new());
        };
        match item.get("userFilters") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(uris)) => Ok(uris
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()),
            Some(other) => Err(FilterError::InvalidResponse {
                path,
                reason: format!("userFilters is not a list: {other}"),
            }),
        }
    }

    /// Replaces the assignment of `user`, returning the number of failed entries
    async fn assign(
        &self,
        pid: &ProjectId,
        user: &ObjectUri,
        filters: Vec<String>,
    ) -> Result<usize, FilterError> {
        let body = json!({
            "userFilters": {
                "items": [{ "user": user.as_str(), "userFilters": filters }]
            }
        });
        let response = self
            .client
            .post(&format!("/gdc/md/{pid}/userfilters"), &body)
            .await?;
        Ok(response
            .pointer("/userFiltersUpdateResult/failed")
            .and_then(Value::as_array)
            .map_or(0, Vec::len))
    }
}

/// Groups items by user URI in first-appearance order, dropping items without one
fn group_by_user<'a, T>(
    items: &'a [T],
    user: impl Fn(&'a T) -> Option<&'a ObjectUri>,
) -> Vec<(&'a ObjectUri, Vec<&'a T>)> {
    let mut groups: Vec<(&ObjectUri, Vec<&T>)> = Vec::new();
    for item in items {
        let Some(uri) = user(item) else {
            continue;
        };
        match groups.iter_mut().find(|(u, _)| *u == uri) {
            Some((_, members)) => members.push(item),
            None => groups.push((uri, vec![item])),
        }
    }
    groups
}
