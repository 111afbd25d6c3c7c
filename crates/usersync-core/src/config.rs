//! Configuration module for usersync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, ProjectId, SyncMode, Whitelist};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for usersync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub platform: PlatformConfig,
    pub users: UsersConfig,
    pub filters: FiltersConfig,
    pub logging: LoggingConfig,
}

/// Remote platform connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Base URL of the platform API.
    pub server: String,
    /// Environment variable holding the API token.
    pub token_env: String,
    /// Organization (domain) name.
    pub domain: Option<String>,
    /// Data product holding the clients; `None` means the default one.
    pub data_product: Option<String>,
}

/// User synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    /// One of the synchronization mode tags, e.g. `sync_domain_and_project`.
    pub sync_mode: String,
    /// Target project for the single-project modes.
    pub project_id: Option<String>,
    /// Column carrying the project id or client id of each row.
    pub multiple_projects_column: Option<String>,
    /// Segment URIs restricting `sync_domain_client_workspaces`.
    pub segments: Vec<String>,
    /// Logins never removed or pruned.
    pub whitelists: Vec<String>,
    /// Regular expressions matching logins never removed or pruned.
    pub regexp_whitelists: Vec<String>,
    pub ignore_failures: bool,
    pub remove_users_from_project: bool,
    pub do_not_touch_users_that_are_not_mentioned: bool,
    pub create_non_existing_user_groups: bool,
    /// Fixed SSO provider, overriding the column.
    pub sso_provider: Option<String>,
    /// Fixed comma-separated authentication modes, overriding the column.
    pub authentication_modes: Option<String>,
    /// Number of partitions synchronized at the same time.
    pub concurrency: usize,
    pub columns: ColumnMapping,
}

/// Source column names for each user field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub first_name: String,
    pub last_name: String,
    pub login: String,
    pub password: String,
    pub email: String,
    pub role: String,
    pub sso_provider: String,
    pub authentication_modes: String,
    pub user_groups: String,
    pub language: String,
    pub company: String,
    pub position: String,
    pub country: String,
    pub phone: String,
    pub ip_whitelist: String,
}

/// Data-access filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Report intended changes without altering any filter.
    pub dry_run: bool,
    /// Skip label values that do not exist instead of failing.
    pub ignore_missing_values: bool,
    /// Column carrying the filter owner's login.
    pub login_column: String,
    /// Which source column feeds which label.
    pub labels: Vec<LabelColumn>,
}

/// Mapping of one source column to a label clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelColumn {
    /// Label identifier or URI.
    pub label: String,
    /// Source column with the label values.
    pub column: String,
    #[serde(default)]
    pub over: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/usersync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("usersync")
            .join("config.yaml")
    }
}

impl UsersConfig {
    /// The parsed synchronization mode.
    pub fn mode(&self) -> Result<SyncMode, DomainError> {
        self.sync_mode.parse()
    }

    /// The configured target project, if any.
    pub fn project_id(&self) -> Result<Option<ProjectId>, DomainError> {
        self.project_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(ProjectId::new)
            .transpose()
    }

    /// Literal and pattern whitelist, without the running identity.
    pub fn whitelist(&self) -> Result<Whitelist, DomainError> {
        Whitelist::new(&self.whitelists, &self.regexp_whitelists)
    }

    /// Fixed authentication modes: comma-split, trimmed and upper-cased.
    ///
    /// `None` when unset or blank, in which case the column is used.
    pub fn authentication_modes_override(&self) -> Option<Vec<String>> {
        let modes: Vec<String> = self
            .authentication_modes
            .as_deref()?
            .split(',')
            .map(|m| m.trim().to_uppercase())
            .filter(|m| !m.is_empty())
            .collect();
        if modes.is_empty() {
            None
        } else {
            Some(modes)
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            server: "https://secure.gooddata.com".to_string(),
            token_env: "USERSYNC_API_TOKEN".to_string(),
            domain: None,
            data_product: None,
        }
    }
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default().as_str().to_string(),
            project_id: None,
            multiple_projects_column: None,
            segments: Vec::new(),
            whitelists: Vec::new(),
            regexp_whitelists: Vec::new(),
            ignore_failures: false,
            remove_users_from_project: false,
            do_not_touch_users_that_are_not_mentioned: false,
            create_non_existing_user_groups: true,
            sso_provider: None,
            authentication_modes: None,
            concurrency: 1,
            columns: ColumnMapping::default(),
        }
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            first_name: "first_name".to_string(),
            last_name: "last_name".to_string(),
            login: "login".to_string(),
            password: "password".to_string(),
            email: "email".to_string(),
            role: "role".to_string(),
            sso_provider: "sso_provider".to_string(),
            authentication_modes: "authentication_modes".to_string(),
            user_groups: "user_groups".to_string(),
            language: "language".to_string(),
            company: "company".to_string(),
            position: "position".to_string(),
            country: "country".to_string(),
            phone: "phone".to_string(),
            ip_whitelist: "ip_whitelist".to_string(),
        }
    }
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            ignore_missing_values: false,
            login_column: "login".to_string(),
            labels: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"users.sync_mode"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `users.concurrency`.
const MAX_CONCURRENCY: usize = 32;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- platform ---
        if !self.platform.server.starts_with("http://")
            && !self.platform.server.starts_with("https://")
        {
            errors.push(ValidationError {
                field: "platform.server".into(),
                message: format!("must be an http(s) URL, got '{}'", self.platform.server),
            });
        }
        if self.platform.token_env.trim().is_empty() {
            errors.push(ValidationError {
                field: "platform.token_env".into(),
                message: "must name an environment variable".into(),
            });
        }

        // --- users ---
        match self.users.mode() {
            Ok(mode) => {
                if mode.requires_project() && self.users.project_id.is_none() {
                    errors.push(ValidationError {
                        field: "users.project_id".into(),
                        message: format!("is required for sync_mode '{mode}'"),
                    });
                }
                if mode.uses_partition_key() && self.users.multiple_projects_column.is_none() {
                    errors.push(ValidationError {
                        field: "users.multiple_projects_column".into(),
                        message: format!("is required for sync_mode '{mode}'"),
                    });
                }
            }
            Err(e) => errors.push(ValidationError {
                field: "users.sync_mode".into(),
                message: e.to_string(),
            }),
        }
        if let Err(e) = self.users.project_id() {
            errors.push(ValidationError {
                field: "users.project_id".into(),
                message: e.to_string(),
            });
        }
        if let Err(e) = self.users.whitelist() {
            errors.push(ValidationError {
                field: "users.regexp_whitelists".into(),
                message: e.to_string(),
            });
        }
        if self.users.concurrency == 0 || self.users.concurrency > MAX_CONCURRENCY {
            errors.push(ValidationError {
                field: "users.concurrency".into(),
                message: format!("must be in range 1..={MAX_CONCURRENCY}"),
            });
        }

        // --- filters ---
        if self.filters.login_column.trim().is_empty() {
            errors.push(ValidationError {
                field: "filters.login_column".into(),
                message: "must not be empty".into(),
            });
        }
        for (i, label) in self.filters.labels.iter().enumerate() {
            if label.label.trim().is_empty() || label.column.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("filters.labels[{i}]"),
                    message: "label and column must not be empty".into(),
                });
            }
            if label.over.is_some() != label.to.is_some() {
                errors.push(ValidationError {
                    field: format!("filters.labels[{i}]"),
                    message: "over and to must be set together".into(),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use usersync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .domain("acme")
///     .sync_mode("sync_project")
///     .project_id("pid123")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- platform ---

    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.platform.server = server.into();
        self
    }

    pub fn token_env(mut self, name: impl Into<String>) -> Self {
        self.config.platform.token_env = name.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config.platform.domain = Some(domain.into());
        self
    }

    pub fn data_product(mut self, data_product: impl Into<String>) -> Self {
        self.config.platform.data_product = Some(data_product.into());
        self
    }

    // --- users ---

    pub fn sync_mode(mut self, mode: impl Into<String>) -> Self {
        self.config.users.sync_mode = mode.into();
        self
    }

    pub fn project_id(mut self, pid: impl Into<String>) -> Self {
        self.config.users.project_id = Some(pid.into());
        self
    }

    pub fn multiple_projects_column(mut self, column: impl Into<String>) -> Self {
        self.config.users.multiple_projects_column = Some(column.into());
        self
    }

    pub fn segments(mut self, segments: Vec<String>) -> Self {
        self.config.users.segments = segments;
        self
    }

    pub fn whitelists(mut self, whitelists: Vec<String>) -> Self {
        self.config.users.whitelists = whitelists;
        self
    }

    pub fn regexp_whitelists(mut self, patterns: Vec<String>) -> Self {
        self.config.users.regexp_whitelists = patterns;
        self
    }

    pub fn ignore_failures(mut self, enabled: bool) -> Self {
        self.config.users.ignore_failures = enabled;
        self
    }

    pub fn remove_users_from_project(mut self, enabled: bool) -> Self {
        self.config.users.remove_users_from_project = enabled;
        self
    }

    pub fn do_not_touch_users_that_are_not_mentioned(mut self, enabled: bool) -> Self {
        self.config.users.do_not_touch_users_that_are_not_mentioned = enabled;
        self
    }

    pub fn create_non_existing_user_groups(mut self, enabled: bool) -> Self {
        self.config.users.create_non_existing_user_groups = enabled;
        self
    }

    pub fn sso_provider(mut self, provider: impl Into<String>) -> Self {
        self.config.users.sso_provider = Some(provider.into());
        self
    }

    pub fn authentication_modes(mut self, modes: impl Into<String>) -> Self {
        self.config.users.authentication_modes = Some(modes.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.users.concurrency = n;
        self
    }

    pub fn columns(mut self, columns: ColumnMapping) -> Self {
        self.config.users.columns = columns;
        self
    }

    // --- filters ---

    pub fn filters_dry_run(mut self, enabled: bool) -> Self {
        self.config.filters.dry_run = enabled;
        self
    }

    pub fn filters_ignore_missing_values(mut self, enabled: bool) -> Self {
        self.config.filters.ignore_missing_values = enabled;
        self
    }

    pub fn filters_label(mut self, label: LabelColumn) -> Self {
        self.config.filters.labels.push(label);
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
