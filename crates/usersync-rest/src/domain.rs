//! Domain (organization) adapter
//!
//! Accounts live under `/gdc/account/domains/{domain}/users`; data-product
//! clients under `/gdc/domains/{domain}/dataproducts/{dp}/clients`.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use usersync_core::domain::{
    dedup_by_identity, ClientId, ClientRecord, PlatformUser, ResultEvent, UserRecord,
};
use usersync_core::ports::{CreateUsersOptions, IDomain};

use crate::client::RestClient;
use crate::models::{AccountPayload, AccountSettingsResponse, ClientsResponse};
use crate::RestError;

/// Data product used when none is named
pub const DEFAULT_DATA_PRODUCT: &str = "default";

/// [`IDomain`] backed by the platform REST API
pub struct RestDomain {
    client: Arc<RestClient>,
    name: String,
}

impl RestDomain {
    pub fn new(client: Arc<RestClient>, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    fn users_path(&self) -> String {
        format!("/gdc/account/domains/{}/users", self.name)
    }

    /// Finds an account by login
    pub async fn lookup(&self, login: &str) -> Result<Option<PlatformUser>, RestError> {
        let body = self
            .client
            .get_with_query(&self.users_path(), &[("login", login)])
            .await?;
        let response: AccountSettingsResponse = serde_json::from_value(body)
            .map_err(|e| RestError::InvalidResponse(format!("account lookup: {e}")))?;
        response
            .account_settings
            .items
            .into_iter()
            .map(|item| item.account_setting.into_user())
            .find(|user| user.as_ref().map(|u| u.has_login(login)).unwrap_or(true))
            .transpose()
    }

    /// Creates or updates one account; `None` when nothing had to change
    async fn upsert(&self, payload: &AccountPayload) -> Result<Option<ResultEvent>, RestError> {
        match self.lookup(&payload.login).await? {
            Some(user) if payload.differs_from(&user) => {
                self.client
                    .put(user.profile_uri.as_str(), &payload.to_body())
                    .await?;
                debug!(login = %payload.login, "Account updated");
                Ok(Some(ResultEvent::updated(&payload.login)))
            }
            Some(_) => Ok(None),
            None => {
                let mut payload = payload.clone();
                if payload.password.is_none() {
                    payload.password = Some(Uuid::new_v4().to_string());
                }
                self.client.post(&self.users_path(), &payload.to_body()).await?;
                debug!(login = %payload.login, "Account created");
                Ok(Some(ResultEvent::created(&payload.login)))
            }
        }
    }
}

#[async_trait::async_trait]
impl IDomain for RestDomain {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, records, options), fields(domain = %self.name, records = records.len()))]
    async fn create_users(
        &self,
        records: &[UserRecord],
        options: &CreateUsersOptions,
    ) -> anyhow::Result<Vec<ResultEvent>> {
        let mut events = Vec::new();
        for record in dedup_by_identity(records) {
            let Some(payload) = AccountPayload::from_record(&record) else {
                continue;
            };
            match self.upsert(&payload).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) if options.ignore_failures => {
                    warn!(login = %payload.login, error = %e, "Account write failed");
                    events.push(ResultEvent::failed(&payload.login, e.to_string()));
                }
                Err(e) => {
                    return Err(e
                        .into_anyhow()
                        .context(format!("Failed to create or update user {}", payload.login)));
                }
            }
        }
        info!(events = events.len(), "Domain accounts synchronized");
        Ok(events)
    }

    async fn clients(&self, data_product: Option<&str>) -> anyhow::Result<Vec<ClientRecord>> {
        let data_product = data_product
            .filter(|dp| !dp.trim().is_empty())
            .unwrap_or(DEFAULT_DATA_PRODUCT);
        let mut next = Some(format!(
            "/gdc/domains/{}/dataproducts/{}/clients",
            self.name, data_product
        ));

        let mut clients = Vec::new();
        while let Some(path) = next.take() {
            let body = self.client.get(&path).await.map_err(RestError::into_anyhow)?;
            let page: ClientsResponse =
                serde_json::from_value(body).context("Malformed client listing")?;
            for item in page.clients.items {
                let mut record = ClientRecord::new(ClientId::new(item.client.id)?);
                record.segment_uri = item.client.segment;
                record.project_uri = item.client.project;
                clients.push(record);
            }
            next = page
                .clients
                .paging
                .and_then(|p| p.next)
                .filter(|n| !n.trim().is_empty());
        }
        debug!(data_product, clients = clients.len(), "Clients listed");
        Ok(clients)
    }

    async fn find_user_by_login(&self, login: &str) -> anyhow::Result<Option<PlatformUser>> {
        self.lookup(login).await.map_err(RestError::into_anyhow)
    }

    async fn delete_user(&self, user: &PlatformUser) -> anyhow::Result<()> {
        self.client
            .delete(user.profile_uri.as_str())
            .await
            .map_err(RestError::into_anyhow)
            .with_context(|| format!("Failed to delete user {}", user.login))
    }
}
