//! Shared test helpers for engine integration tests
//!
//! Provides an in-memory platform: a domain with accounts and clients, and
//! projects that record the records imported into them. Every call is
//! appended to a shared journal so tests can assert ordering.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use usersync_core::domain::{
    ClientId, ClientRecord, ExistingFilter, ObjectUri, PlatformUser, ProjectId, ResultEvent,
    UserRecord,
};
use usersync_core::ports::{
    CreateUsersOptions, IDomain, ILabel, IPlatformClient, IProject, ImportOptions, PlatformError,
};
use usersync_engine::{DispatchSettings, ModeDispatcher};

pub const RUNNER: &str = "runner@acme.com";

pub type Journal = Arc<Mutex<Vec<String>>>;

// ============================================================================
// FakeDomain
// ============================================================================

pub struct FakeDomain {
    pub users: Vec<PlatformUser>,
    pub clients: Vec<ClientRecord>,
    pub create_calls: Mutex<Vec<Vec<String>>>,
    pub deleted: Mutex<Vec<String>>,
    journal: Journal,
}

#[async_trait::async_trait]
impl IDomain for FakeDomain {
    fn name(&self) -> &str {
        "acme"
    }

    async fn create_users(
        &self,
        records: &[UserRecord],
        _options: &CreateUsersOptions,
    ) -> anyhow::Result<Vec<ResultEvent>> {
        let logins: Vec<String> = records
            .iter()
            .filter_map(|r| r.identity())
            .map(str::to_string)
            .collect();
        self.journal
            .lock()
            .unwrap()
            .push(format!("create_users:{}", logins.len()));
        self.create_calls.lock().unwrap().push(logins.clone());
        Ok(logins.into_iter().map(ResultEvent::created).collect())
    }

    async fn clients(&self, _data_product: Option<&str>) -> anyhow::Result<Vec<ClientRecord>> {
        Ok(self.clients.clone())
    }

    async fn find_user_by_login(&self, login: &str) -> anyhow::Result<Option<PlatformUser>> {
        Ok(self.users.iter().find(|u| u.has_login(login)).cloned())
    }

    async fn delete_user(&self, user: &PlatformUser) -> anyhow::Result<()> {
        self.deleted.lock().unwrap().push(user.login.clone());
        Ok(())
    }
}

// ============================================================================
// FakeProject
// ============================================================================

pub struct FakeProject {
    pid: ProjectId,
    pub deleted: bool,
    pub metadata: HashMap<String, String>,
    pub failure: Option<PlatformError>,
    pub imports: Mutex<Vec<Vec<String>>>,
    journal: Journal,
}

impl FakeProject {
    /// Logins of every import call, in call order
    pub fn imported(&self) -> Vec<Vec<String>> {
        self.imports.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IProject for FakeProject {
    fn pid(&self) -> &ProjectId {
        &self.pid
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    async fn metadata(&self) -> anyhow::Result<HashMap<String, String>> {
        Ok(self.metadata.clone())
    }

    async fn users(&self) -> anyhow::Result<Vec<PlatformUser>> {
        Ok(Vec::new())
    }

    async fn import_users(
        &self,
        records: &[UserRecord],
        _options: &ImportOptions,
    ) -> anyhow::Result<Vec<ResultEvent>> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("import:{}:{}", self.pid, records.len()));
        if let Some(failure) = &self.failure {
            return Err(failure.clone().into());
        }
        let logins: Vec<String> = records
            .iter()
            .filter_map(|r| r.identity())
            .map(str::to_string)
            .collect();
        self.imports.lock().unwrap().push(logins.clone());
        Ok(logins.into_iter().map(ResultEvent::created).collect())
    }

    async fn label(&self, _id_or_uri: &str) -> anyhow::Result<Option<Arc<dyn ILabel>>> {
        Ok(None)
    }

    async fn data_permissions(&self) -> anyhow::Result<Vec<ExistingFilter>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// FakePlatform
// ============================================================================

pub struct FakePlatform {
    pub domain: Arc<FakeDomain>,
    pub projects: HashMap<String, Arc<FakeProject>>,
    pub journal: Journal,
}

impl FakePlatform {
    pub fn project_ref(&self, pid: &str) -> Arc<FakeProject> {
        Arc::clone(&self.projects[pid])
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IPlatformClient for FakePlatform {
    async fn current_login(&self) -> anyhow::Result<String> {
        Ok(RUNNER.to_string())
    }

    async fn project(&self, id: &ProjectId) -> anyhow::Result<Option<Arc<dyn IProject>>> {
        Ok(self
            .projects
            .get(id.as_str())
            .map(|p| Arc::clone(p) as Arc<dyn IProject>))
    }

    async fn domain(&self, _name: &str) -> anyhow::Result<Arc<dyn IDomain>> {
        Ok(Arc::clone(&self.domain) as Arc<dyn IDomain>)
    }

    async fn get(&self, path: &str) -> anyhow::Result<serde_json::Value> {
        anyhow::bail!("unexpected GET {path}")
    }

    async fn post(
        &self,
        path: &str,
        _body: &serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        anyhow::bail!("unexpected POST {path}")
    }

    async fn create(&self, path: &str, _body: &serde_json::Value) -> anyhow::Result<ObjectUri> {
        anyhow::bail!("unexpected create {path}")
    }

    async fn delete(&self, uri: &str) -> anyhow::Result<()> {
        anyhow::bail!("unexpected DELETE {uri}")
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`FakePlatform`]
#[derive(Default)]
pub struct PlatformBuilder {
    users: Vec<PlatformUser>,
    clients: Vec<ClientRecord>,
    projects: Vec<(String, bool, HashMap<String, String>, Option<PlatformError>)>,
}

impl PlatformBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, login: &str) -> Self {
        let id = self.users.len() + 1;
        self.users.push(PlatformUser::new(
            login,
            ObjectUri::new(format!("/gdc/account/profile/{id}")).unwrap(),
        ));
        self
    }

    pub fn project(mut self, pid: &str) -> Self {
        self.projects
            .push((pid.to_string(), false, HashMap::new(), None));
        self
    }

    pub fn deleted_project(mut self, pid: &str) -> Self {
        self.projects.push((pid.to_string(), true, HashMap::new(), None));
        self
    }

    pub fn failing_project(mut self, pid: &str, failure: PlatformError) -> Self {
        self.projects
            .push((pid.to_string(), false, HashMap::new(), Some(failure)));
        self
    }

    pub fn project_with_metadata(mut self, pid: &str, key: &str, value: &str) -> Self {
        let metadata = HashMap::from([(key.to_string(), value.to_string())]);
        self.projects.push((pid.to_string(), false, metadata, None));
        self
    }

    /// Adds a client; `pid` of `None` means not provisioned
    pub fn client(mut self, id: &str, segment: &str, pid: Option<&str>) -> Self {
        let mut client = ClientRecord::new(ClientId::new(id).unwrap())
            .with_segment(format!("/gdc/domains/acme/dataproducts/default/segments/{segment}"));
        if let Some(pid) = pid {
            client = client.with_project(format!("/gdc/projects/{pid}"));
        }
        self.clients.push(client);
        self
    }

    pub fn build(self) -> Arc<FakePlatform> {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let projects = self
            .projects
            .into_iter()
            .map(|(pid, deleted, metadata, failure)| {
                let project = FakeProject {
                    pid: ProjectId::new(pid.as_str()).unwrap(),
                    deleted,
                    metadata,
                    failure,
                    imports: Mutex::new(Vec::new()),
                    journal: Arc::clone(&journal),
                };
                (pid, Arc::new(project))
            })
            .collect();
        Arc::new(FakePlatform {
            domain: Arc::new(FakeDomain {
                users: self.users,
                clients: self.clients,
                create_calls: Mutex::new(Vec::new()),
                deleted: Mutex::new(Vec::new()),
                journal: Arc::clone(&journal),
            }),
            projects,
            journal,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn settings(mode: &str) -> DispatchSettings {
    DispatchSettings {
        mode: mode.to_string(),
        domain: Some("acme".to_string()),
        create_non_existing_user_groups: true,
        concurrency: 1,
        ..DispatchSettings::default()
    }
}

pub fn segment(name: &str) -> String {
    format!("/gdc/domains/acme/dataproducts/default/segments/{name}")
}

pub fn dispatcher(
    platform: &Arc<FakePlatform>,
    reporter: Arc<usersync_core::ports::RecordingReporter>,
    settings: DispatchSettings,
) -> ModeDispatcher {
    ModeDispatcher::new(Arc::clone(platform) as Arc<dyn IPlatformClient>, reporter, settings)
}

pub fn record(login: &str, key: &str) -> UserRecord {
    UserRecord::with_login(login).with_partition_key(key)
}
