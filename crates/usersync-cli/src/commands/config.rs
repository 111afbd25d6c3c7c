//! Config command - View and manage usersync configuration
//!
//! Provides the `usersync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use usersync_core::config::{ColumnMapping, Config};

use crate::commands::load_config;
use crate::output::{get_formatter, OutputFormat};

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("platform.server", "Base URL of the platform API"),
    ("platform.token_env", "Environment variable holding the API token"),
    ("platform.domain", "Domain (organization) name"),
    ("platform.data_product", "Data product of client modes"),
    ("users.sync_mode", "Synchronization mode"),
    ("users.project_id", "Target project id"),
    ("users.multiple_projects_column", "Column routing rows to projects or clients"),
    ("users.segments", "Comma-separated segment URIs"),
    ("users.whitelists", "Comma-separated logins never removed"),
    ("users.regexp_whitelists", "Comma-separated patterns never removed"),
    ("users.ignore_failures", "true|false"),
    ("users.remove_users_from_project", "true|false"),
    ("users.do_not_touch_users_that_are_not_mentioned", "true|false"),
    ("users.create_non_existing_user_groups", "true|false"),
    ("users.sso_provider", "SSO provider for every user"),
    ("users.authentication_modes", "Comma-separated modes for every user"),
    ("users.concurrency", "Partitions processed at once (1-32)"),
    ("users.columns.<field>", "CSV column of a user field"),
    ("filters.dry_run", "true|false"),
    ("filters.ignore_missing_values", "true|false"),
    ("filters.login_column", "CSV column with the filter owner"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.json", "true|false"),
];

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "users.sync_mode")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(config_path, format).await,
            ConfigCommand::Set { key, value } => {
                self.execute_set(config_path, key, value, format).await
            }
            ConfigCommand::Validate => self.execute_validate(config_path, format).await,
        }
    }

    async fn execute_show(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let (path, config) = load_config(config_path)?;

        info!(config_path = %path.display(), "Showing configuration");

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", path.display()));
            formatter.info("");
            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    async fn execute_set(
        &self,
        config_path: Option<&Path>,
        key: &str,
        value: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let path = config_path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);
        let mut config = Config::load_or_default(&path);

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{key}': {e}"));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, description) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<50} - {description}"));
                }
            }
            return Ok(());
        }

        // Only errors of the key being set block the save
        let errors: Vec<String> = config
            .validate()
            .iter()
            .filter(|e| e.field == key || key.starts_with(&format!("{}.", e.field)))
            .map(ToString::to_string)
            .collect();
        if !errors.is_empty() {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{key}': {}", errors.join("; ")));
            }
            return Ok(());
        }

        save_config(&config, &path)?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {key} = {value}"));
            formatter.info(&format!("Saved to {}", path.display()));
        }
        Ok(())
    }

    async fn execute_validate(
        &self,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let path = config_path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);

        if !path.exists() {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": path.display().to_string(),
                    "errors": ["Configuration file not found. Using defaults."],
                }));
            } else {
                formatter.info(&format!("Configuration file not found at {}", path.display()));
                formatter.info(
                    "Using default configuration. Run 'usersync config set <key> <value>' to create one.",
                );
            }
            return Ok(());
        }

        let config = match Config::load(&path) {
            Ok(config) => config,
            Err(e) => {
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": path.display().to_string(),
                        "errors": [format!("Failed to parse configuration: {e}")],
                    }));
                } else {
                    formatter.error(&format!("Failed to parse configuration: {e}"));
                    formatter.info(&format!("File: {}", path.display()));
                }
                return Ok(());
            }
        };

        info!(config_path = %path.display(), "Validating configuration");
        let errors = config.validate();

        if matches!(format, OutputFormat::Json) {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": path.display().to_string(),
                "errors": messages,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", path.display()));
        } else {
            formatter.error(&format!("Configuration has {} error(s):", errors.len()));
            for error in &errors {
                formatter.info(&format!("  {error}"));
            }
        }
        Ok(())
    }
}

fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    std::fs::write(path, yaml).context("Failed to write configuration file")
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => anyhow::bail!("Expected true or false for {key}"),
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(value.to_string())
    }
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn column_mut<'a>(columns: &'a mut ColumnMapping, field: &str) -> Option<&'a mut String> {
    Some(match field {
        "first_name" => &mut columns.first_name,
        "last_name" => &mut columns.last_name,
        "login" => &mut columns.login,
        "password" => &mut columns.password,
        "email" => &mut columns.email,
        "role" => &mut columns.role,
        "sso_provider" => &mut columns.sso_provider,
        "authentication_modes" => &mut columns.authentication_modes,
        "user_groups" => &mut columns.user_groups,
        "language" => &mut columns.language,
        "company" => &mut columns.company,
        "position" => &mut columns.position,
        "country" => &mut columns.country,
        "phone" => &mut columns.phone,
        "ip_whitelist" => &mut columns.ip_whitelist,
        _ => return None,
    })
}

/// Applies a single dot-notation `key = value` to `config`
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    if let Some(field) = key.strip_prefix("users.columns.") {
        let column = column_mut(&mut config.users.columns, field)
            .with_context(|| format!("Unknown user field '{field}'"))?;
        *column = value.trim().to_lowercase();
        return Ok(());
    }

    match key {
        // --- platform ---
        "platform.server" => config.platform.server = value.trim().to_string(),
        "platform.token_env" => config.platform.token_env = value.trim().to_string(),
        "platform.domain" => config.platform.domain = optional(value),
        "platform.data_product" => config.platform.data_product = optional(value),

        // --- users ---
        "users.sync_mode" => config.users.sync_mode = value.trim().to_string(),
        "users.project_id" => config.users.project_id = optional(value),
        "users.multiple_projects_column" => {
            config.users.multiple_projects_column = optional(value).map(|c| c.to_lowercase());
        }
        "users.segments" => config.users.segments = list(value),
        "users.whitelists" => config.users.whitelists = list(value),
        "users.regexp_whitelists" => config.users.regexp_whitelists = list(value),
        "users.ignore_failures" => config.users.ignore_failures = parse_bool(key, value)?,
        "users.remove_users_from_project" => {
            config.users.remove_users_from_project = parse_bool(key, value)?;
        }
        "users.do_not_touch_users_that_are_not_mentioned" => {
            config.users.do_not_touch_users_that_are_not_mentioned = parse_bool(key, value)?;
        }
        "users.create_non_existing_user_groups" => {
            config.users.create_non_existing_user_groups = parse_bool(key, value)?;
        }
        "users.sso_provider" => config.users.sso_provider = optional(value),
        "users.authentication_modes" => config.users.authentication_modes = optional(value),
        "users.concurrency" => {
            config.users.concurrency = value
                .trim()
                .parse::<usize>()
                .context("Expected a positive integer for users.concurrency")?;
        }

        // --- filters ---
        "filters.dry_run" => config.filters.dry_run = parse_bool(key, value)?,
        "filters.ignore_missing_values" => {
            config.filters.ignore_missing_values = parse_bool(key, value)?;
        }
        "filters.login_column" => config.filters.login_column = value.trim().to_lowercase(),

        // --- logging ---
        "logging.level" => config.logging.level = value.trim().to_lowercase(),
        "logging.json" => config.logging.json = parse_bool(key, value)?,

        _ => anyhow::bail!("Unknown configuration key '{key}'"),
    }
    Ok(())
}
