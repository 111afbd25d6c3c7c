//! Platform entry point over REST

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use usersync_core::domain::{ObjectUri, ProjectId};
use usersync_core::ports::{IDomain, IPlatformClient, IProject};

use crate::client::RestClient;
use crate::domain::RestDomain;
use crate::models::{AccountSettingEnvelope, CreatedUri, ProjectEnvelope};
use crate::project::RestProject;
use crate::RestError;

/// [`IPlatformClient`] backed by the platform REST API
#[derive(Clone)]
pub struct RestPlatform {
    client: Arc<RestClient>,
    /// Domain searched for accounts that are not project members yet
    domain: Option<String>,
}

impl RestPlatform {
    pub fn new(client: RestClient) -> Self {
        Self {
            client: Arc::new(client),
            domain: None,
        }
    }

    /// Sets the domain projects use to find accounts of new members
    pub fn with_domain(mut self, name: impl Into<String>) -> Self {
        self.domain = Some(name.into()).filter(|n: &String| !n.trim().is_empty());
        self
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// Opens a project by id, `None` when the server does not know it
    ///
    /// # Errors
    /// Any other failure of the lookup.
    pub async fn open_project(&self, id: &ProjectId) -> Result<Option<RestProject>, RestError> {
        match self.client.get(&id.uri()).await {
            Ok(body) => {
                let envelope: ProjectEnvelope = serde_json::from_value(body)
                    .map_err(|e| RestError::InvalidResponse(format!("project {id}: {e}")))?;
                let mut project = RestProject::new(
                    Arc::clone(&self.client),
                    id.clone(),
                    envelope.project.is_deleted(),
                );
                if let Some(name) = &self.domain {
                    project = project.with_domain(RestDomain::new(Arc::clone(&self.client), name));
                }
                Ok(Some(project))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait::async_trait]
impl IPlatformClient for RestPlatform {
    async fn current_login(&self) -> anyhow::Result<String> {
        let body = self
            .client
            .get("/gdc/account/profile/current")
            .await
            .map_err(RestError::into_anyhow)?;
        let envelope: AccountSettingEnvelope = serde_json::from_value(body)?;
        envelope
            .account_setting
            .login
            .ok_or_else(|| anyhow::anyhow!("Current profile carries no login"))
    }

    #[instrument(skip(self), fields(pid = %id))]
    async fn project(&self, id: &ProjectId) -> anyhow::Result<Option<Arc<dyn IProject>>> {
        let project = self.open_project(id).await.map_err(RestError::into_anyhow)?;
        debug!(found = project.is_some(), "Project lookup finished");
        Ok(project.map(|p| Arc::new(p) as Arc<dyn IProject>))
    }

    async fn domain(&self, name: &str) -> anyhow::Result<Arc<dyn IDomain>> {
        if name.trim().is_empty() {
            anyhow::bail!("Domain name cannot be empty");
        }
        Ok(Arc::new(RestDomain::new(Arc::clone(&self.client), name.trim())))
    }

    async fn get(&self, path: &str) -> anyhow::Result<Value> {
        self.client.get(path).await.map_err(RestError::into_anyhow)
    }

    async fn post(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        self.client.post(path, body).await.map_err(RestError::into_anyhow)
    }

    async fn create(&self, path: &str, body: &Value) -> anyhow::Result<ObjectUri> {
        let response = self.client.post(path, body).await.map_err(RestError::into_anyhow)?;
        let created: CreatedUri = serde_json::from_value(response)
            .map_err(|e| anyhow::anyhow!("Object created at {path} returned no URI: {e}"))?;
        Ok(ObjectUri::new(created.uri)?)
    }

    async fn delete(&self, uri: &str) -> anyhow::Result<()> {
        self.client.delete(uri).await.map_err(RestError::into_anyhow)
    }
}
