//! Project and label adapters
//!
//! [`RestProject`] executes the core [`MembershipPlan`] against
//! `/gdc/projects/{pid}/users`, maintains user-group membership and exposes
//! the metadata, labels and data-permission objects of the project.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use usersync_core::domain::{
    ExistingFilter, MembershipChange, MembershipPlan, MembershipPolicy, ObjectUri, PlatformUser,
    ProjectId, ProjectRole, ResultEvent, UserRecord,
};
use usersync_core::ports::{IDomain, ILabel, IProject, ImportOptions};

use crate::client::RestClient;
use crate::domain::RestDomain;
use crate::models::{
    membership_entry, CreatedUri, DisplayFormEnvelope, ElementsResponse, IdentifiersResponse,
    MetadataResponse, ProjectRoleEnvelope, ProjectRolesResponse, ProjectUsersResponse,
    ProjectUsersUpdateEnvelope, QueryResponse, UpdateResult, UserFiltersResponse,
    UserGroupsResponse,
};
use crate::RestError;

const STATUS_ENABLED: &str = "ENABLED";
const STATUS_DISABLED: &str = "DISABLED";

/// [`IProject`] backed by the platform REST API
pub struct RestProject {
    client: Arc<RestClient>,
    pid: ProjectId,
    deleted: bool,
    /// Domain used to find accounts that are not members yet
    domain: Option<RestDomain>,
}

impl RestProject {
    pub fn new(client: Arc<RestClient>, pid: ProjectId, deleted: bool) -> Self {
        Self {
            client,
            pid,
            deleted,
            domain: None,
        }
    }

    /// Looks up accounts of new members in `domain`
    pub fn with_domain(mut self, domain: RestDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    fn path(&self, suffix: &str) -> String {
        format!("/gdc/projects/{}{}", self.pid, suffix)
    }

    fn md_path(&self, suffix: &str) -> String {
        format!("/gdc/md/{}{}", self.pid, suffix)
    }

    /// Roles available in the project
    pub async fn roles(&self) -> Result<Vec<ProjectRole>, RestError> {
        let body = self.client.get(&self.path("/roles")).await?;
        let listing: ProjectRolesResponse = parse(body, "project roles")?;

        let mut roles = Vec::with_capacity(listing.project_roles.roles.len());
        for uri in listing.project_roles.roles {
            let body = self.client.get(&uri).await?;
            let role: ProjectRoleEnvelope = parse(body, "project role")?;
            roles.push(role.project_role.into_role(uri));
        }
        Ok(roles)
    }

    /// Posts membership entries and returns the per-user outcome
    async fn write_memberships(&self, entries: Vec<Value>) -> Result<UpdateResult, RestError> {
        if entries.is_empty() {
            return Ok(UpdateResult::default());
        }
        let body = self
            .client
            .post(&self.path("/users"), &json!({ "users": entries }))
            .await?;
        if body.is_null() {
            return Ok(UpdateResult::default());
        }
        let envelope: ProjectUsersUpdateEnvelope = parse(body, "membership update")?;
        Ok(envelope.project_users_update_result)
    }

    /// Profile URI of the account behind a membership change
    async fn account_of(&self, change: &MembershipChange) -> Result<PlatformUser, String> {
        if let Some(existing) = &change.existing {
            return Ok(existing.clone());
        }
        let login = change.record.identity().unwrap_or_default();
        let Some(domain) = &self.domain else {
            return Err(format!(
                "User {login} is not a member of project {} and no domain is configured",
                self.pid
            ));
        };
        match domain.lookup(login).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(format!(
                "User {login} was not found in domain {}",
                domain.name()
            )),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Adds, re-enables and re-roles members
    async fn apply_memberships(
        &self,
        plan: &MembershipPlan,
        failures: &mut Failures,
        profiles: &mut HashMap<String, ObjectUri>,
    ) -> anyhow::Result<Vec<ResultEvent>> {
        let mut entries = Vec::new();
        let mut pending: Vec<(String, ObjectUri, ResultEvent)> = Vec::new();

        for change in plan.to_add.iter().chain(plan.to_change_role.iter()) {
            let login = change.record.identity().unwrap_or_default().to_string();
            let user = match self.account_of(change).await {
                Ok(user) => user,
                Err(reason) => {
                    failures.record(&login, reason)?;
                    continue;
                }
            };
            entries.push(membership_entry(
                user.profile_uri.as_str(),
                STATUS_ENABLED,
                Some(&change.role.uri),
            ));
            let event = match &change.existing {
                None => ResultEvent::created(&login),
                Some(_) => ResultEvent::updated(&login),
            }
            .with_detail(change.role.title.clone());
            profiles.insert(login.to_lowercase(), user.profile_uri.clone());
            pending.push((login, user.profile_uri, event));
        }

        let result = self
            .write_memberships(entries)
            .await
            .map_err(RestError::into_anyhow)?;
        let refused: HashMap<&str, &str> = result
            .failed
            .iter()
            .filter_map(|f| {
                let user = f.user.as_deref()?;
                Some((user, f.message.as_deref().unwrap_or("membership refused")))
            })
            .collect();

        let mut events = Vec::with_capacity(pending.len());
        for (login, profile, event) in pending {
            match refused.get(profile.as_str()) {
                Some(message) => failures.record(&login, (*message).to_string())?,
                None => events.push(event),
            }
        }
        Ok(events)
    }

    /// Disables or removes members absent from the desired set
    async fn prune(&self, plan: &MembershipPlan) -> anyhow::Result<Vec<ResultEvent>> {
        if plan.to_remove.is_empty() {
            return Ok(Vec::new());
        }

        let mut events = Vec::with_capacity(plan.to_remove.len());
        if plan.remove_from_project {
            for user in &plan.to_remove {
                let path = self.path(&format!("/users/{}", user.profile_uri.object_id()));
                self.client
                    .delete(&path)
                    .await
                    .map_err(RestError::into_anyhow)
                    .with_context(|| {
                        format!("Failed to remove {} from project {}", user.login, self.pid)
                    })?;
                events.push(
                    ResultEvent::deleted(&user.login)
                        .with_detail(format!("removed from project {}", self.pid)),
                );
            }
        } else {
            let entries = plan
                .to_remove
                .iter()
                .map(|user| membership_entry(user.profile_uri.as_str(), STATUS_DISABLED, None))
                .collect();
            self.write_memberships(entries)
                .await
                .map_err(RestError::into_anyhow)
                .with_context(|| format!("Failed to disable members of project {}", self.pid))?;
            events.extend(plan.to_remove.iter().map(|user| {
                ResultEvent::deleted(&user.login)
                    .with_detail(format!("disabled in project {}", self.pid))
            }));
        }
        info!(pid = %self.pid, pruned = events.len(), "Members pruned");
        Ok(events)
    }

    /// Adds members to the user groups their records name
    async fn assign_groups(
        &self,
        plan: &MembershipPlan,
        profiles: &HashMap<String, ObjectUri>,
        options: &ImportOptions,
        failures: &mut Failures,
    ) -> anyhow::Result<()> {
        if plan.group_assignments.is_empty() {
            return Ok(());
        }

        let body = self
            .client
            .get_with_query("/gdc/userGroups", &[("project", self.pid.as_str())])
            .await
            .map_err(RestError::into_anyhow)?;
        let listing: UserGroupsResponse = parse(body, "user groups").map_err(RestError::into_anyhow)?;
        let mut groups: HashMap<String, String> = listing
            .user_groups
            .items
            .into_iter()
            .filter_map(|g| Some((g.user_group.content.name, g.user_group.links.self_uri?)))
            .collect();

        let mut members: Vec<(String, Vec<String>)> = Vec::new();
        for (login, names) in &plan.group_assignments {
            let Some(profile) = profiles.get(&login.to_lowercase()) else {
                continue;
            };
            for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
                if !groups.contains_key(name) {
                    if !options.create_non_existing_user_groups {
                        failures.record(login, format!("User group \"{name}\" does not exist"))?;
                        continue;
                    }
                    let uri = self.create_group(name).await?;
                    groups.insert(name.to_string(), uri);
                }
                match members.iter_mut().find(|(group, _)| group == name) {
                    Some((_, items)) => items.push(profile.as_str().to_string()),
                    None => members.push((name.to_string(), vec![profile.as_str().to_string()])),
                }
            }
        }

        for (name, items) in members {
            let Some(uri) = groups.get(&name) else {
                continue;
            };
            let body = json!({ "modifyMembers": { "operation": "ADD", "items": items } });
            self.client
                .post(&format!("{uri}/modifyMembers"), &body)
                .await
                .map_err(RestError::into_anyhow)
                .with_context(|| format!("Failed to add members to user group {name}"))?;
            debug!(group = %name, members = items.len(), "User group members added");
        }
        Ok(())
    }

    async fn create_group(&self, name: &str) -> anyhow::Result<String> {
        let body = json!({
            "userGroup": { "content": { "name": name, "project": self.pid.uri() } }
        });
        let response = self
            .client
            .post("/gdc/userGroups", &body)
            .await
            .map_err(RestError::into_anyhow)
            .with_context(|| format!("Failed to create user group {name}"))?;
        let created: CreatedUri = serde_json::from_value(response)
            .with_context(|| format!("User group {name} was created without URI"))?;
        info!(group = name, uri = %created.uri, "User group created");
        Ok(created.uri)
    }

    /// Assigned filters per filter URI, following pagination
    async fn filter_assignments(&self) -> Result<HashMap<String, String>, RestError> {
        let mut owners = HashMap::new();
        let mut next = Some(self.md_path("/userfilters"));
        while let Some(path) = next.take() {
            let body = self.client.get(&path).await?;
            let page: UserFiltersResponse = parse(body, "user filter assignments")?;
            for item in page.user_filters.items {
                for filter in item.user_filters {
                    owners.insert(filter, item.user.clone());
                }
            }
            next = page.user_filters.paging.and_then(|p| p.next);
        }
        Ok(owners)
    }
}

#[async_trait::async_trait]
impl IProject for RestProject {
    fn pid(&self) -> &ProjectId {
        &self.pid
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    async fn metadata(&self) -> anyhow::Result<HashMap<String, String>> {
        let body = match self.client.get(&self.path("/dataload/metadata")).await {
            Ok(body) => body,
            Err(e) if e.is_not_found() => return Ok(HashMap::new()),
            Err(e) => return Err(e.into_anyhow()),
        };
        let response: MetadataResponse =
            parse(body, "project metadata").map_err(RestError::into_anyhow)?;
        Ok(response
            .metadata_items
            .items
            .into_iter()
            .map(|item| (item.metadata_item.key, item.metadata_item.value))
            .collect())
    }

    async fn users(&self) -> anyhow::Result<Vec<PlatformUser>> {
        let body = self
            .client
            .get(&self.path("/users"))
            .await
            .map_err(RestError::into_anyhow)?;
        let response: ProjectUsersResponse =
            parse(body, "project users").map_err(RestError::into_anyhow)?;
        response
            .users
            .into_iter()
            .map(|u| u.user.into_user().map_err(RestError::into_anyhow))
            .collect()
    }

    #[instrument(skip(self, records, options), fields(pid = %self.pid, records = records.len()))]
    async fn import_users(
        &self,
        records: &[UserRecord],
        options: &ImportOptions,
    ) -> anyhow::Result<Vec<ResultEvent>> {
        // Step 1: current roster and roles
        let current = self.users().await?;
        let roles = self.roles().await.map_err(RestError::into_anyhow)?;

        // Step 2: plan
        let plan = MembershipPlan::compute(
            &current,
            records,
            &roles,
            MembershipPolicy {
                whitelist: options.whitelist.as_ref(),
                prune: options.prunes(),
                remove_from_project: options.remove_users_from_project,
            },
        );
        debug!(
            add = plan.to_add.len(),
            change_role = plan.to_change_role.len(),
            remove = plan.to_remove.len(),
            unchanged = plan.unchanged,
            "Membership plan computed"
        );

        let mut failures = Failures::new(options.ignore_failures);
        for unresolved in &plan.unresolved {
            let login = unresolved.record.identity().unwrap_or_default();
            failures.record(login, unresolved.reason.clone())?;
        }

        // Step 3: memberships
        let mut profiles: HashMap<String, ObjectUri> = current
            .iter()
            .map(|u| (u.login.to_lowercase(), u.profile_uri.clone()))
            .collect();
        let mut events = self.apply_memberships(&plan, &mut failures, &mut profiles).await?;

        // Step 4: groups
        self.assign_groups(&plan, &profiles, options, &mut failures).await?;
        events.append(&mut failures.take());

        // Step 5: prune
        events.extend(self.prune(&plan).await?);

        info!(events = events.len(), "Project users imported");
        Ok(events)
    }

    async fn label(&self, id_or_uri: &str) -> anyhow::Result<Option<Arc<dyn ILabel>>> {
        let uri = if id_or_uri.starts_with('/') {
            id_or_uri.to_string()
        } else {
            let body = json!({ "identifierToUri": [id_or_uri] });
            let response = self
                .client
                .post(&self.md_path("/identifiers"), &body)
                .await
                .map_err(RestError::into_anyhow)?;
            let identifiers: IdentifiersResponse =
                parse(response, "identifiers").map_err(RestError::into_anyhow)?;
            match identifiers
                .identifiers
                .into_iter()
                .find(|entry| entry.identifier == id_or_uri)
            {
                Some(entry) => entry.uri,
                None => return Ok(None),
            }
        };

        let body = match self.client.get(&uri).await {
            Ok(body) => body,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into_anyhow()),
        };
        let Ok(envelope) = serde_json::from_value::<DisplayFormEnvelope>(body) else {
            warn!(label = id_or_uri, "Object is not an attribute label");
            return Ok(None);
        };
        let form = envelope.attribute_display_form;
        Ok(Some(Arc::new(RestLabel {
            client: Arc::clone(&self.client),
            identifier: form.meta.identifier.unwrap_or_else(|| id_or_uri.to_string()),
            uri,
            attribute_uri: form.content.form_of,
        })))
    }

    async fn data_permissions(&self) -> anyhow::Result<Vec<ExistingFilter>> {
        let body = self
            .client
            .get(&self.md_path("/query/userfilters"))
            .await
            .map_err(RestError::into_anyhow)?;
        let query: QueryResponse = parse(body, "user filter query").map_err(RestError::into_anyhow)?;
        let owners = self.filter_assignments().await.map_err(RestError::into_anyhow)?;

        let mut seen = HashSet::new();
        let mut filters = Vec::with_capacity(query.query.entries.len());
        for entry in query.query.entries {
            if !seen.insert(entry.link.clone()) {
                continue;
            }
            let raw_payload = self
                .client
                .get(&entry.link)
                .await
                .map_err(RestError::into_anyhow)?;
            let related_user_uri = owners
                .get(&entry.link)
                .map(|user| ObjectUri::new(user.as_str()))
                .transpose()?;
            filters.push(ExistingFilter {
                uri: ObjectUri::new(entry.link)?,
                related_user_uri,
                raw_payload,
            });
        }
        debug!(pid = %self.pid, filters = filters.len(), "Data permissions listed");
        Ok(filters)
    }
}

/// An attribute label addressed by URI
pub struct RestLabel {
    client: Arc<RestClient>,
    identifier: String,
    uri: String,
    attribute_uri: String,
}

impl RestLabel {
    fn elements_path(&self) -> String {
        format!("{}/elements", self.uri)
    }
}

#[async_trait::async_trait]
impl ILabel for RestLabel {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn uri(&self) -> &str {
        &self.uri
    }

    fn attribute_uri(&self) -> &str {
        &self.attribute_uri
    }

    async fn find_value_uri(&self, value: &str) -> anyhow::Result<Option<String>> {
        let body = self
            .client
            .get_with_query(&self.elements_path(), &[("filter", value)])
            .await
            .map_err(RestError::into_anyhow)?;
        let response: ElementsResponse =
            parse(body, "label elements").map_err(RestError::into_anyhow)?;
        Ok(response
            .attribute_elements
            .elements
            .into_iter()
            .find(|element| element.title == value)
            .map(|element| element.uri))
    }

    async fn values_count(&self) -> anyhow::Result<u64> {
        let body = self
            .client
            .get_with_query(&self.elements_path(), &[("limit", "1")])
            .await
            .map_err(RestError::into_anyhow)?;
        let response: ElementsResponse =
            parse(body, "label elements").map_err(RestError::into_anyhow)?;
        let elements = response.attribute_elements;
        Ok(elements
            .paging
            .as_ref()
            .and_then(|p| p.total())
            .unwrap_or(elements.elements.len() as u64))
    }
}

/// Per-record failures of an import
///
/// Under strict configuration the first failure aborts the import.
struct Failures {
    tolerant: bool,
    events: Vec<ResultEvent>,
}

impl Failures {
    fn new(tolerant: bool) -> Self {
        Self {
            tolerant,
            events: Vec::new(),
        }
    }

    fn record(&mut self, login: &str, reason: String) -> anyhow::Result<()> {
        if !self.tolerant {
            anyhow::bail!("Failed to import user {login}: {reason}");
        }
        warn!(login, reason = %reason, "User import failed");
        self.events.push(ResultEvent::failed(login, reason));
        Ok(())
    }

    fn take(&mut self) -> Vec<ResultEvent> {
        std::mem::take(&mut self.events)
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: Value, what: &str) -> Result<T, RestError> {
    serde_json::from_value(body).map_err(|e| RestError::InvalidResponse(format!("{what}: {e}")))
}
