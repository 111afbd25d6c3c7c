//! Wire payloads of the platform API
//!
//! Only the fields the adapters read are modelled; everything else is
//! ignored on deserialization.

use serde::{Deserialize, Serialize};

use usersync_core::domain::{ObjectUri, PlatformUser, ProjectRole, UserRecord};

use crate::RestError;

/// `links` object carrying the URI of a resource
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Links {
    #[serde(rename = "self", default)]
    pub self_uri: Option<String>,
}

// ============================================================================
// Accounts
// ============================================================================

/// `{"accountSetting": {...}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettingEnvelope {
    pub account_setting: AccountSetting,
}

/// A domain account as returned by the account endpoints
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSetting {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub links: Links,
}

impl AccountSetting {
    /// The account as a [`PlatformUser`]
    ///
    /// # Errors
    /// [`RestError::InvalidResponse`] when the account has no login or URI.
    pub fn into_user(self) -> Result<PlatformUser, RestError> {
        let login = self
            .login
            .ok_or_else(|| RestError::InvalidResponse("account without login".into()))?;
        let uri = self
            .links
            .self_uri
            .ok_or_else(|| RestError::InvalidResponse(format!("account {login} without URI")))?;
        let uri = ObjectUri::new(uri).map_err(|e| RestError::InvalidResponse(e.to_string()))?;
        let mut user = PlatformUser::new(login, uri);
        user.email = self.email;
        user.first_name = self.first_name;
        user.last_name = self.last_name;
        Ok(user)
    }
}

/// `{"accountSettings": {"items": [...]}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettingsResponse {
    pub account_settings: Items<AccountSettingEnvelope>,
}

/// Generic `{"items": [...], "paging": {...}}` list
#[derive(Debug, Deserialize)]
pub struct Items<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

/// Body used to create or update a domain account
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayload {
    pub login: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_modes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_whitelist: Option<Vec<String>>,
}

impl AccountPayload {
    /// Builds the payload of a record; `None` when the record has no identity
    ///
    /// First and last name default to the login, as the platform requires
    /// both.
    #[must_use]
    pub fn from_record(record: &UserRecord) -> Option<Self> {
        let login = record.identity()?.to_string();
        Some(Self {
            email: record.email.clone().unwrap_or_else(|| login.clone()),
            first_name: record.first_name.clone().unwrap_or_else(|| login.clone()),
            last_name: record.last_name.clone().unwrap_or_else(|| login.clone()),
            password: record.password.clone(),
            sso_provider: record.sso_provider.clone(),
            authentication_modes: record.authentication_modes.clone(),
            language: record.language.clone(),
            company_name: record.company.clone(),
            position: record.position.clone(),
            country: record.country.clone(),
            phone_number: record.phone.clone(),
            ip_whitelist: record.ip_whitelist.clone(),
            login,
        })
    }

    /// Whether applying the payload would change `user`
    #[must_use]
    pub fn differs_from(&self, user: &PlatformUser) -> bool {
        user.email.as_deref() != Some(self.email.as_str())
            || user.first_name.as_deref() != Some(self.first_name.as_str())
            || user.last_name.as_deref() != Some(self.last_name.as_str())
    }

    #[must_use]
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({ "accountSetting": self })
    }
}

/// `{"uri": "..."}` answer of create calls
#[derive(Debug, Deserialize)]
pub struct CreatedUri {
    pub uri: String,
}

// ============================================================================
// Projects
// ============================================================================

/// `{"project": {...}}`
#[derive(Debug, Deserialize)]
pub struct ProjectEnvelope {
    pub project: ProjectBody,
}

#[derive(Debug, Deserialize)]
pub struct ProjectBody {
    #[serde(default)]
    pub content: ProjectContent,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectContent {
    #[serde(default)]
    pub state: Option<String>,
}

impl ProjectBody {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.content
            .state
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("DELETED"))
            .unwrap_or(false)
    }
}

/// `{"users": [{"user": {...}}]}` listing of project members
#[derive(Debug, Deserialize)]
pub struct ProjectUsersResponse {
    #[serde(default)]
    pub users: Vec<ProjectUserEnvelope>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectUserEnvelope {
    pub user: ProjectUser,
}

#[derive(Debug, Deserialize)]
pub struct ProjectUser {
    pub content: ProjectUserContent,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUserContent {
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "firstname")]
    pub first_name: Option<String>,
    #[serde(default, rename = "lastname")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub user_roles: Vec<String>,
}

impl ProjectUser {
    /// The member as a [`PlatformUser`]
    ///
    /// # Errors
    /// [`RestError::InvalidResponse`] when the member has no profile URI.
    pub fn into_user(self) -> Result<PlatformUser, RestError> {
        let content = self.content;
        let uri = self.links.self_uri.ok_or_else(|| {
            RestError::InvalidResponse(format!("member {} without profile URI", content.login))
        })?;
        let uri = ObjectUri::new(uri).map_err(|e| RestError::InvalidResponse(e.to_string()))?;
        let mut user = PlatformUser::new(content.login, uri);
        user.email = content.email;
        user.first_name = content.first_name;
        user.last_name = content.last_name;
        user.role_uri = content.user_roles.into_iter().next();
        user.enabled = content
            .status
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("ENABLED"))
            .unwrap_or(true);
        Ok(user)
    }
}

/// Membership write entry of `POST /gdc/projects/{pid}/users`
#[must_use]
pub fn membership_entry(profile_uri: &str, status: &str, role_uri: Option<&str>) -> serde_json::Value {
    let mut content = serde_json::json!({ "status": status });
    if let Some(role) = role_uri {
        content["userRoles"] = serde_json::json!([role]);
    }
    serde_json::json!({ "user": { "content": content, "links": { "self": profile_uri } } })
}

/// `{"projectUsersUpdateResult": {...}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUsersUpdateEnvelope {
    pub project_users_update_result: UpdateResult,
}

/// Successful and failed entries of a bulk write
#[derive(Debug, Default, Deserialize)]
pub struct UpdateResult {
    #[serde(default)]
    pub successful: Vec<String>,
    #[serde(default)]
    pub failed: Vec<FailedEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FailedEntry {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `{"projectRoles": {"roles": [uri, ...]}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRolesResponse {
    pub project_roles: RoleUris,
}

#[derive(Debug, Deserialize)]
pub struct RoleUris {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// `{"projectRole": {...}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRoleEnvelope {
    pub project_role: ProjectRoleBody,
}

#[derive(Debug, Deserialize)]
pub struct ProjectRoleBody {
    pub meta: Meta,
}

/// `meta` section of metadata objects
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl ProjectRoleBody {
    #[must_use]
    pub fn into_role(self, uri: String) -> ProjectRole {
        ProjectRole {
            identifier: self.meta.identifier.unwrap_or_default(),
            title: self.meta.title.unwrap_or_default(),
            uri,
        }
    }
}

/// `{"metadataItems": {"items": [{"metadataItem": {...}}]}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub metadata_items: Items<MetadataItemEnvelope>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItemEnvelope {
    pub metadata_item: MetadataItem,
}

#[derive(Debug, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

// ============================================================================
// Clients and user groups
// ============================================================================

/// `{"clients": {"items": [{"client": {...}}], "paging": {...}}}`
#[derive(Debug, Deserialize)]
pub struct ClientsResponse {
    pub clients: Items<ClientEnvelope>,
}

#[derive(Debug, Deserialize)]
pub struct ClientEnvelope {
    pub client: ClientBody,
}

#[derive(Debug, Deserialize)]
pub struct ClientBody {
    pub id: String,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

/// `{"userGroups": {"items": [{"userGroup": {...}}]}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroupsResponse {
    pub user_groups: Items<UserGroupEnvelope>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroupEnvelope {
    pub user_group: UserGroupBody,
}

#[derive(Debug, Deserialize)]
pub struct UserGroupBody {
    pub content: UserGroupContent,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Deserialize)]
pub struct UserGroupContent {
    pub name: String,
}

// ============================================================================
// Labels and filters
// ============================================================================

/// `{"identifiers": [{"identifier": ..., "uri": ...}]}`
#[derive(Debug, Deserialize)]
pub struct IdentifiersResponse {
    #[serde(default)]
    pub identifiers: Vec<IdentifierEntry>,
}

#[derive(Debug, Deserialize)]
pub struct IdentifierEntry {
    pub identifier: String,
    pub uri: String,
}

/// `{"attributeDisplayForm": {...}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFormEnvelope {
    pub attribute_display_form: DisplayForm,
}

#[derive(Debug, Deserialize)]
pub struct DisplayForm {
    pub content: DisplayFormContent,
    pub meta: Meta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFormContent {
    pub form_of: String,
}

/// `{"attributeElements": {"elements": [...], "paging": {...}}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementsResponse {
    pub attribute_elements: AttributeElements,
}

#[derive(Debug, Deserialize)]
pub struct AttributeElements {
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub paging: Option<ElementsPaging>,
}

#[derive(Debug, Deserialize)]
pub struct Element {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub struct ElementsPaging {
    /// Reported as a string or a number
    #[serde(default)]
    pub total: Option<serde_json::Value>,
}

impl ElementsPaging {
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        match self.total.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// `{"query": {"entries": [{"link": ...}]}}`
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub query: QueryEntries,
}

#[derive(Debug, Deserialize)]
pub struct QueryEntries {
    #[serde(default)]
    pub entries: Vec<QueryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct QueryEntry {
    pub link: String,
}

/// `{"userFilters": {"items": [{"user": ..., "userFilters": [...]}]}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFiltersResponse {
    pub user_filters: Items<UserFilterAssignment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilterAssignment {
    pub user: String,
    #[serde(default)]
    pub user_filters: Vec<String>,
}
