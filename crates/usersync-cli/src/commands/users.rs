//! Users command - Synchronize users from a CSV file
//!
//! Provides the `usersync users` CLI command which:
//! 1. Loads and validates the configuration (with command-line overrides)
//! 2. Connects to the platform with the token from the environment
//! 3. Runs `SyncUsersUseCase` over the CSV input
//! 4. Prints the run summary

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use usersync_core::domain::RunSummary;
use usersync_core::ports::TracingReporter;
use usersync_engine::{SyncError, SyncUsersUseCase};

use crate::commands::{connect, ensure_valid, load_config};
use crate::output::{get_formatter, OutputFormat, OutputFormatter};
use crate::source::CsvRecordSource;

/// Synchronize users described by a CSV file
#[derive(Debug, Args)]
pub struct UsersCommand {
    /// CSV file with one user per row
    pub input: PathBuf,

    /// Synchronization mode (overrides users.sync_mode)
    #[arg(long)]
    pub mode: Option<String>,

    /// Target project id (overrides users.project_id)
    #[arg(long)]
    pub project: Option<String>,

    /// Record failures and keep going instead of stopping at the first one
    #[arg(long)]
    pub ignore_failures: bool,
}

impl UsersCommand {
    pub async fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        // Step 1: Configuration
        let (path, mut config) = load_config(config_path)?;
        if let Some(mode) = &self.mode {
            config.users.sync_mode = mode.clone();
        }
        if let Some(project) = &self.project {
            config.users.project_id = Some(project.clone());
        }
        if self.ignore_failures {
            config.users.ignore_failures = true;
        }
        ensure_valid(&config)?;
        info!(
            config_path = %path.display(),
            input = %self.input.display(),
            mode = %config.users.sync_mode,
            "Starting user synchronization"
        );

        // Step 2: Platform
        let platform = connect(&config)?;

        // Step 3: Run
        let mut source = CsvRecordSource::from_path(&self.input)?;
        let use_case = SyncUsersUseCase::new(Arc::new(platform), Arc::new(TracingReporter), &config);

        match use_case.execute(&mut source).await {
            Ok(summary) => {
                print_summary(formatter.as_ref(), format, &summary)?;
                Ok(())
            }
            Err(SyncError::RunFailed { summary }) => {
                print_summary(formatter.as_ref(), format, &summary)?;
                anyhow::bail!(SyncError::RunFailed { summary })
            }
            Err(e) => Err(e).context("User synchronization failed"),
        }
    }
}

/// Prints counts per event type and the first failures
pub fn print_summary(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    summary: &RunSummary,
) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        let json = serde_json::to_value(summary).context("Failed to serialize run summary")?;
        formatter.print_json(&json);
        return Ok(());
    }

    if summary.is_success() {
        formatter.success(&format!(
            "Run {} finished: {} events in {} ms",
            summary.run_id,
            summary.total_events,
            summary.duration_ms()
        ));
    } else {
        formatter.error(&format!(
            "Run {} finished with {} failures",
            summary.run_id,
            summary.failure_count()
        ));
    }
    for (event_type, count) in &summary.counts {
        formatter.field(event_type.as_str(), &count.to_string());
    }
    for failure in summary.first_failures() {
        formatter.warn(&format!("{}: {}", failure.subject, failure.detail));
    }
    Ok(())
}
