//! Mode dispatcher
//!
//! Routes the desired records of a run according to the synchronization
//! mode. Every mode has its own handler; the project-level handlers build
//! [`Partition`]s and hand them to the shared [`PartitionPool`].
//!
//! ## Dispatch Flow
//!
//! 1. **Validate**: parse the mode, check required settings and partition
//!    keys. Nothing remote is touched before this step succeeds.
//! 2. **Prepare**: fetch the running identity, build the whitelist, open the
//!    domain.
//! 3. **Handle**: run the mode's handler and return its events.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use usersync_core::config::Config;
use usersync_core::domain::{
    dedup_by_identity, ClientRecord, ProjectId, ResultEvent, SyncMode, UserRecord, Whitelist,
};
use usersync_core::ports::{IDomain, IPlatformClient, IProject, IRunReporter, ImportOptions};

use crate::partition::{group_by_key, require_key, Partition, ProjectTarget};
use crate::pool::PartitionPool;
use crate::synchronizer::ProjectSynchronizer;
use crate::SyncError;

/// Project metadata key holding a caller-defined project id
pub const CUSTOM_PROJECT_ID_KEY: &str = "GOODOT_CUSTOM_PROJECT_ID";

// ============================================================================
// DispatchSettings
// ============================================================================

/// Settings of one dispatch, taken from the configuration
#[derive(Debug, Clone, Default)]
pub struct DispatchSettings {
    /// Raw mode tag, parsed when dispatching
    pub mode: String,
    pub domain: Option<String>,
    pub data_product: Option<String>,
    pub project_id: Option<String>,
    pub segments: Vec<String>,
    pub whitelists: Vec<String>,
    pub regexp_whitelists: Vec<String>,
    pub ignore_failures: bool,
    pub remove_users_from_project: bool,
    pub do_not_touch_users_that_are_not_mentioned: bool,
    pub create_non_existing_user_groups: bool,
    pub concurrency: usize,
}

impl DispatchSettings {
    pub fn from_config(config: &Config) -> Self {
        let users = &config.users;
        Self {
            mode: users.sync_mode.clone(),
            domain: config.platform.domain.clone(),
            data_product: config.platform.data_product.clone(),
            project_id: users.project_id.clone(),
            segments: users.segments.clone(),
            whitelists: users.whitelists.clone(),
            regexp_whitelists: users.regexp_whitelists.clone(),
            ignore_failures: users.ignore_failures,
            remove_users_from_project: users.remove_users_from_project,
            do_not_touch_users_that_are_not_mentioned: users
                .do_not_touch_users_that_are_not_mentioned,
            create_non_existing_user_groups: users.create_non_existing_user_groups,
            concurrency: users.concurrency,
        }
    }

    /// The parsed mode
    pub fn mode(&self) -> Result<SyncMode, SyncError> {
        Ok(self.mode.parse()?)
    }

    fn data_product_name(&self) -> &str {
        self.data_product.as_deref().unwrap_or("default")
    }
}

/// Validated inputs of a dispatch
struct Validated {
    mode: SyncMode,
    domain: String,
    project: Option<ProjectId>,
}

/// Everything a handler needs once the remote side is open
struct RunContext {
    mode: SyncMode,
    domain: Arc<dyn IDomain>,
    project: Option<ProjectId>,
    whitelist: Arc<Whitelist>,
    synchronizer: Arc<ProjectSynchronizer>,
}

impl RunContext {
    fn project(&self) -> Result<&ProjectId, SyncError> {
        self.project.as_ref().ok_or(SyncError::MissingParameter {
            parameter: "project_id",
            mode: self.mode.to_string(),
        })
    }
}

// ============================================================================
// ModeDispatcher
// ============================================================================

/// Dispatches desired records according to the synchronization mode
pub struct ModeDispatcher {
    client: Arc<dyn IPlatformClient>,
    reporter: Arc<dyn IRunReporter>,
    settings: DispatchSettings,
}

impl ModeDispatcher {
    pub fn new(
        client: Arc<dyn IPlatformClient>,
        reporter: Arc<dyn IRunReporter>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            client,
            reporter,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Synchronizes `records` and returns the events of every partition
    ///
    /// # Errors
    /// Configuration errors before any remote call; fatal target errors and,
    /// in strict mode, the first partition failure.
    #[tracing::instrument(skip(self, records), fields(mode = %self.settings.mode, data_rows = records.len()))]
    pub async fn dispatch(&self, records: &[UserRecord]) -> Result<Vec<ResultEvent>, SyncError> {
        // Step 1: Validate everything that needs no remote call
        let validated = self.validate(records)?;

        // Step 2: Open the remote side
        let current_login = self.client.current_login().await?;
        let whitelist = Arc::new(
            Whitelist::new(&self.settings.whitelists, &self.settings.regexp_whitelists)?
                .with_identity(&current_login),
        );
        let domain = self.client.domain(&validated.domain).await?;
        let options = ImportOptions {
            whitelist: Arc::clone(&whitelist),
            ignore_failures: self.settings.ignore_failures,
            remove_users_from_project: self.settings.remove_users_from_project,
            do_not_touch_users_that_are_not_mentioned: self
                .settings
                .do_not_touch_users_that_are_not_mentioned,
            create_non_existing_user_groups: self.settings.create_non_existing_user_groups,
        };
        let ctx = RunContext {
            mode: validated.mode,
            domain,
            project: validated.project,
            whitelist,
            synchronizer: Arc::new(ProjectSynchronizer::new(
                Arc::clone(&self.client),
                options,
                current_login,
            )),
        };

        // Step 3: Run the mode's handler
        self.reporter
            .info(&format!("Synchronizing in mode \"{}\"", ctx.mode));
        match ctx.mode {
            SyncMode::AddToOrganization => self.add_to_organization(&ctx, records).await,
            SyncMode::RemoveFromOrganization => self.remove_from_organization(&ctx, records).await,
            SyncMode::SyncProject => self.sync_project(&ctx, records).await,
            SyncMode::SyncDomainAndProject => self.sync_domain_and_project(&ctx, records).await,
            SyncMode::SyncMultipleProjectsBasedOnPid => {
                self.sync_multiple_projects_based_on_pid(&ctx, records).await
            }
            SyncMode::SyncOneProjectBasedOnPid => {
                self.sync_one_project_based_on_pid(&ctx, records).await
            }
            SyncMode::SyncOneProjectBasedOnCustomId => {
                self.sync_one_project_based_on_custom_id(&ctx, records).await
            }
            SyncMode::SyncMultipleProjectsBasedOnCustomId => {
                self.sync_multiple_projects_based_on_custom_id(&ctx, records)
                    .await
            }
            SyncMode::SyncDomainClientWorkspaces => {
                self.sync_domain_client_workspaces(&ctx, records).await
            }
        }
    }

    fn validate(&self, records: &[UserRecord]) -> Result<Validated, SyncError> {
        let mode = self.settings.mode()?;
        let missing = |parameter: &'static str| SyncError::MissingParameter {
            parameter,
            mode: mode.to_string(),
        };

        let domain = self
            .settings
            .domain
            .clone()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| missing("domain"))?;

        let project = self
            .settings
            .project_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(ProjectId::new)
            .transpose()?;
        if mode.requires_project() && project.is_none() {
            return Err(missing("project_id"));
        }

        if mode.uses_partition_key() {
            for record in records {
                match mode {
                    SyncMode::SyncMultipleProjectsBasedOnCustomId
                    | SyncMode::SyncDomainClientWorkspaces => {
                        if record.partition_key().is_none() {
                            return Err(SyncError::BlankClientId);
                        }
                    }
                    _ => {
                        require_key(record)?;
                    }
                }
            }
        }

        Ok(Validated {
            mode,
            domain,
            project,
        })
    }

    async fn run_partitions(
        &self,
        ctx: &RunContext,
        partitions: Vec<Partition>,
    ) -> Result<Vec<ResultEvent>, SyncError> {
        let pool = PartitionPool::new(self.settings.concurrency, self.settings.ignore_failures);
        let synchronizer = Arc::clone(&ctx.synchronizer);
        pool.run(partitions, move |partition| {
            let synchronizer = Arc::clone(&synchronizer);
            async move { synchronizer.synchronize(partition).await }
        })
        .await
    }

    async fn data_product_clients(&self, ctx: &RunContext) -> Result<Vec<ClientRecord>, SyncError> {
        Ok(ctx
            .domain
            .clients(self.settings.data_product.as_deref())
            .await?)
    }

    // ------------------------------------------------------------------------
    // Organization-level handlers
    // ------------------------------------------------------------------------

    async fn add_to_organization(
        &self,
        ctx: &RunContext,
        records: &[UserRecord],
    ) -> Result<Vec<ResultEvent>, SyncError> {
        let unique = dedup_by_identity(records);
        info!(domain = ctx.domain.name(), data_rows = unique.len(), "Creating users in domain");
        Ok(ctx
            .domain
            .create_users(&unique, &ctx.synchronizer.options().create_users_options())
            .await?)
    }

    async fn remove_from_organization(
        &self,
        ctx: &RunContext,
        records: &[UserRecord],
    ) -> Result<Vec<ResultEvent>, SyncError> {
        let domain_name = ctx.domain.name().to_string();
        let mut events = Vec::new();
        let mut missing = Vec::new();
        let mut found = Vec::new();

        for record in dedup_by_identity(records) {
            let Some(login) = record.identity() else {
                continue;
            };
            if ctx.whitelist.contains(login) {
                debug!(login, "Whitelisted user kept in domain");
                events.push(ResultEvent::skipped(login, "User is whitelisted"));
                continue;
            }
            match ctx.domain.find_user_by_login(login).await? {
                Some(user) => found.push(user),
                None => missing.push(login.to_string()),
            }
        }

        if !missing.is_empty() {
            self.reporter.info(&format!(
                "{} users were not found (or were deleted) in domain {}",
                missing.len(),
                domain_name
            ));
            events.extend(missing.into_iter().map(|login| {
                ResultEvent::skipped(login, format!("User was not found in domain {domain_name}"))
            }));
        }

        self.reporter.warn(&format!(
            "Deleting {} users from domain {}",
            found.len(),
            domain_name
        ));
        for user in found {
            match ctx.domain.delete_user(&user).await {
                Ok(()) => events.push(ResultEvent::deleted(&user.login)),
                Err(err) if self.settings.ignore_failures => {
                    warn!(login = %user.login, error = %err, "Failed to delete user");
                    events.push(ResultEvent::failed(&user.login, format!("{err:#}")));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(events)
    }

    // ------------------------------------------------------------------------
    // Single-project handlers
    // ------------------------------------------------------------------------

    async fn sync_project(
        &self,
        ctx: &RunContext,
        records: &[UserRecord],
    ) -> Result<Vec<ResultEvent>, SyncError> {
        let pid = ctx.project()?.clone();
        let partition = Partition::new(pid.as_str(), ProjectTarget::Id(pid.clone()), records.to_vec());
        self.run_partitions(ctx, vec![partition]).await
    }

    async fn sync_domain_and_project(
        &self,
        ctx: &RunContext,
        records: &[UserRecord],
    ) -> Result<Vec<ResultEvent>, SyncError> {
        info!(data_rows = records.len(), "Creating users before project import");
        let mut events = ctx
            .domain
            .create_users(records, &ctx.synchronizer.options().create_users_options())
            .await?;
        events.extend(self.sync_project(ctx, records).await?);
        Ok(events)
    }

    async fn sync_one_project_based_on_pid(
        &self,
        ctx: &RunContext,
        records: &[UserRecord],
    ) -> Result<Vec<ResultEvent>, SyncError> {
        let pid = ctx.project()?.clone();
        let filtered: Vec<UserRecord> = records
            .iter()
            .filter(|r| r.partition_key() == Some(pid.as_str()))
            .cloned()
            .collect();
        info!(pid = %pid, filtered_users = filtered.len(), data_rows = records.len(), "Filtered users by project id");

        let partition = Partition::new(pid.as_str(), ProjectTarget::Id(pid.clone()), filtered);
        self.run_partitions(ctx, vec![partition]).await
    }

    async fn sync_one_project_based_on_custom_id(
        &self,
        ctx: &RunContext,
        records: &[UserRecord],
    ) -> Result<Vec<ResultEvent>, SyncError> {
        let pid = ctx.project()?.clone();
        let project = ctx.synchronizer.open(&pid).await?;

        // Step 1: Resolve the value to filter on
        let metadata = project.metadata().await?;
        let mut filter_value = metadata
            .get(CUSTOM_PROJECT_ID_KEY)
            .filter(|v| !v.trim().is_empty())
            .cloned();
        let clients = self.data_product_clients(ctx).await?;
        if let Some(client) = clients
            .iter()
            .find(|c| c.project_id().as_ref() == Some(&pid))
        {
            filter_value = Some(client.client_id.to_string());
        }
        let filter_value = filter_value.ok_or_else(|| SyncError::CustomIdUnresolved {
            pid: pid.to_string(),
            data_product: self.settings.data_product_name().to_string(),
        })?;

        // Step 2: Keep the records routed to that value
        let filtered: Vec<UserRecord> = records
            .iter()
            .filter(|r| r.partition_key() == Some(filter_value.as_str()))
            .cloned()
            .collect();
        if filtered.is_empty() {
            self.reporter.warn(&format!(
                "Project \"{pid}\" does not match with any client ids in input source (both \
                 {CUSTOM_PROJECT_ID_KEY} and SEGMENT/CLIENT). We are unable to get the value to filter users."
            ));
        }
        self.reporter.info(&format!(
            "Project {pid} will receive {} from {} users",
            filtered.len(),
            records.len()
        ));

        let partition = Partition::new(filter_value, ProjectTarget::Loaded(project), filtered);
        self.run_partitions(ctx, vec![partition]).await
    }

    // ------------------------------------------------------------------------
    // Multi-project handlers
    // ------------------------------------------------------------------------

    async fn sync_multiple_projects_based_on_pid(
        &self,
        ctx: &RunContext,
        records: &[UserRecord],
    ) -> Result<Vec<ResultEvent>, SyncError> {
        let partitions = group_by_key(records)?
            .into_iter()
            .map(|(key, members)| -> Result<Partition, SyncError> {
                let pid = ProjectId::new(key.as_str())?;
                Ok(Partition::new(key, ProjectTarget::Id(pid), members))
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!(partitions = partitions.len(), "Synchronizing projects by project id");
        self.run_partitions(ctx, partitions).await
    }

    async fn sync_multiple_projects_based_on_custom_id(
        &self,
        ctx: &RunContext,
        records: &[UserRecord],
    ) -> Result<Vec<ResultEvent>, SyncError> {
        let clients = self.data_product_clients(ctx).await?;

        let mut partitions = Vec::new();
        for (client_id, members) in group_by_key(records)? {
            let client = clients
                .iter()
                .find(|c| c.client_id.as_str() == client_id)
                .ok_or_else(|| SyncError::UnknownClient {
                    client: client_id.clone(),
                    data_product: self.settings.data_product_name().to_string(),
                })?;
            let pid = client.project_id().ok_or_else(|| SyncError::ClientWithoutProject {
                client: client_id.clone(),
            })?;
            self.reporter.info(&format!(
                "Project {pid} of client {client_id} will receive {} users",
                members.len()
            ));
            partitions.push(Partition::new(client_id, ProjectTarget::Id(pid), members));
        }
        self.run_partitions(ctx, partitions).await
    }

    async fn sync_domain_client_workspaces(
        &self,
        ctx: &RunContext,
        records: &[UserRecord],
    ) -> Result<Vec<ResultEvent>, SyncError> {
        let all_clients = self.data_product_clients(ctx).await?;
        let segments = &self.settings.segments;
        let domain_clients: Vec<&ClientRecord> = all_clients
            .iter()
            .filter(|c| c.in_segments(segments))
            .collect();

        // Step 1: One partition per mentioned client inside the segments
        let mut partitions = Vec::new();
        let mut working: HashSet<String> = HashSet::new();
        for (client_id, members) in group_by_key(records)? {
            let Some(client) = domain_clients
                .iter()
                .find(|c| c.client_id.as_str() == client_id)
            else {
                if all_clients.iter().any(|c| c.client_id.as_str() == client_id) {
                    self.reporter.info(&format!(
                        "Client \"{client_id}\" does not belong to filtered segments"
                    ));
                    continue;
                }
                return Err(SyncError::UnknownClient {
                    client: client_id,
                    data_product: self.settings.data_product_name().to_string(),
                });
            };
            let pid = client.project_id().ok_or_else(|| SyncError::ClientWithoutProject {
                client: client_id.clone(),
            })?;
            self.reporter.info(&format!(
                "Project {pid} of client {client_id} will receive {} users",
                members.len()
            ));
            working.insert(client_id.clone());
            partitions.push(Partition::new(client_id, ProjectTarget::Id(pid), members));
        }
        self.reporter.debug(&format!(
            "Working client ids are: {}",
            partitions
                .iter()
                .map(|p| p.key.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        // Step 2: Prune the clients nobody mentioned
        let mut skipped = Vec::new();
        if !self.settings.do_not_touch_users_that_are_not_mentioned {
            for client in domain_clients {
                let client_id = client.client_id.as_str();
                if working.contains(client_id) {
                    continue;
                }
                match self.prune_target(ctx, client).await {
                    Ok(project) => {
                        self.reporter.info(&format!(
                            "Synchronizing all users in project {} of client {client_id}",
                            project.pid()
                        ));
                        partitions.push(Partition::new(
                            client_id,
                            ProjectTarget::Loaded(project),
                            Vec::new(),
                        ));
                    }
                    Err(reason) => {
                        self.reporter.info(&reason);
                        skipped.push(ResultEvent::skipped(client_id, reason).with_partition(client_id));
                    }
                }
            }
        }

        let mut events = self.run_partitions(ctx, partitions).await?;
        events.extend(skipped);
        Ok(events)
    }

    /// The project of a client to prune, or why it cannot be pruned
    async fn prune_target(
        &self,
        ctx: &RunContext,
        client: &ClientRecord,
    ) -> Result<Arc<dyn IProject>, String> {
        let client_id = client.client_id.as_str();
        let Some(pid) = client.project_id() else {
            return Err(format!("Client {client_id} has no project."));
        };
        match ctx.synchronizer.open(&pid).await {
            Ok(project) if project.is_deleted() => Err(format!(
                "Project {pid} of client {client_id} is deleted."
            )),
            Ok(project) => Ok(project),
            Err(err) => Err(format!(
                "Error when accessing project of client {client_id}. Error: {err}"
            )),
        }
    }
}
