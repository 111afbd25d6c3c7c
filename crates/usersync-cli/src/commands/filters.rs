//! Filters command - Reconcile per-user data filters of a project
//!
//! Provides the `usersync filters` CLI command which reads filter
//! definitions from a CSV file and brings the project's user filters in line
//! with them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use usersync_core::config::Config;
use usersync_core::domain::{EventType, ProjectId};
use usersync_core::ports::{IDomain, IPlatformClient, IProject, TracingReporter};
use usersync_core::usecases::{LoadRecordsUseCase, LoaderOptions};
use usersync_filters::{DefinitionLoader, FilterReconciler, ReconcileOptions, ReconcileResult};

use crate::commands::{connect, ensure_valid, load_config};
use crate::output::{get_formatter, OutputFormat, OutputFormatter};
use crate::source::CsvRecordSource;

/// Reconcile user filters from a CSV file of filter definitions
#[derive(Debug, Args)]
pub struct FiltersCommand {
    /// CSV file with a login column and one column per configured label
    pub input: PathBuf,

    /// Target project id (overrides users.project_id)
    #[arg(long)]
    pub project: Option<String>,

    /// Report the changes without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Skip label values missing from the project instead of failing
    #[arg(long)]
    pub ignore_missing_values: bool,

    /// CSV of managed users; only their filters are deleted
    #[arg(long)]
    pub users: Option<PathBuf>,
}

impl FiltersCommand {
    pub async fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        // Step 1: Configuration
        let (path, mut config) = load_config(config_path)?;
        if let Some(project) = &self.project {
            config.users.project_id = Some(project.clone());
        }
        config.filters.dry_run |= self.dry_run;
        config.filters.ignore_missing_values |= self.ignore_missing_values;
        ensure_valid(&config)?;
        let pid = config
            .users
            .project_id()?
            .context("A project id is required, set users.project_id or pass --project")?;
        info!(config_path = %path.display(), pid = %pid, "Starting filter reconciliation");

        // Step 2: Definitions and managed users
        let mut source = CsvRecordSource::from_path(&self.input)?;
        let definitions = DefinitionLoader::from_config(&config.filters).load(&mut source)?;
        let users_brick_input = match &self.users {
            Some(users) => Some(managed_logins(users, &config)?),
            None => None,
        };

        // Step 3: Platform
        let platform = Arc::new(connect(&config)?);
        let project = open_project(platform.as_ref(), &pid).await?;
        let domain: Option<Arc<dyn IDomain>> = match &config.platform.domain {
            Some(name) => Some(platform.domain(name).await?),
            None => None,
        };

        // Step 4: Reconcile
        let options = ReconcileOptions {
            dry_run: config.filters.dry_run,
            ignore_missing_values: config.filters.ignore_missing_values,
            users_brick_input,
        };
        let reconciler = FilterReconciler::new(platform, Arc::new(TracingReporter));
        let result = reconciler
            .execute(project.as_ref(), domain, &definitions, &options)
            .await
            .context("Filter reconciliation failed")?;

        print_result(formatter.as_ref(), format, &result)?;
        let failures = result.failure_count();
        if failures > 0 {
            anyhow::bail!("Filter reconciliation finished with {failures} failures");
        }
        Ok(())
    }
}

async fn open_project(
    platform: &dyn IPlatformClient,
    pid: &ProjectId,
) -> Result<Arc<dyn IProject>> {
    platform.project(pid).await?.with_context(|| {
        format!("Project \"{pid}\" was not found. Please check your project ids in the source file")
    })
}

/// Logins of the users file, read with the configured user columns
fn managed_logins(path: &Path, config: &Config) -> Result<Vec<String>> {
    let mut source = CsvRecordSource::from_path(path)?;
    let records = LoadRecordsUseCase::new(LoaderOptions::from_config(&config.users))
        .execute(&mut source)?;
    Ok(records
        .iter()
        .filter_map(|r| r.identity())
        .map(str::to_string)
        .collect())
}

fn print_result(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    result: &ReconcileResult,
) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        let json = serde_json::to_value(result).context("Failed to serialize filter result")?;
        formatter.print_json(&json);
        return Ok(());
    }

    formatter.success("User filters reconciled");
    formatter.field("created", &result.created.to_string());
    formatter.field("deleted", &result.deleted.to_string());
    for event in result.errors.iter().chain(&result.results) {
        let line = format!("{} {} {}", event.event_type, event.subject, event.detail);
        match event.event_type {
            EventType::Failed | EventType::Error => formatter.warn(line.trim_end()),
            _ => formatter.info(line.trim_end()),
        }
    }
    Ok(())
}
