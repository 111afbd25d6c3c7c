//! User synchronization use case
//!
//! Runs a whole synchronization: load the desired records, dispatch them
//! according to the mode, aggregate the events.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use usersync_core::config::Config;
use usersync_core::domain::{RunId, RunSummary};
use usersync_core::ports::{IPlatformClient, IRecordSource, IRunReporter};
use usersync_core::usecases::{LoadRecordsUseCase, LoaderOptions};

use crate::aggregate::ResultAggregator;
use crate::dispatcher::{DispatchSettings, ModeDispatcher};
use crate::SyncError;

/// End-to-end user synchronization run
pub struct SyncUsersUseCase {
    loader: LoadRecordsUseCase,
    dispatcher: ModeDispatcher,
    aggregator: ResultAggregator,
}

impl SyncUsersUseCase {
    pub fn new(
        client: Arc<dyn IPlatformClient>,
        reporter: Arc<dyn IRunReporter>,
        config: &Config,
    ) -> Self {
        Self {
            loader: LoadRecordsUseCase::new(LoaderOptions::from_config(&config.users)),
            dispatcher: ModeDispatcher::new(
                client,
                Arc::clone(&reporter),
                DispatchSettings::from_config(config),
            ),
            aggregator: ResultAggregator::new(reporter),
        }
    }

    /// Synchronizes the users described by `source`
    ///
    /// # Errors
    /// Any fatal error of the run, or [`SyncError::RunFailed`] when the run
    /// completed with failed or error events.
    #[tracing::instrument(skip(self, source))]
    pub async fn execute(&self, source: &mut dyn IRecordSource) -> Result<RunSummary, SyncError> {
        let run_id = RunId::new();
        let started_at = Utc::now();

        // Step 1: Reject an unknown mode before reading anything
        let mode = self.dispatcher.settings().mode()?;

        // Step 2: Load the desired records
        let records = self.loader.execute(source)?;
        info!(run_id = %run_id, mode = %mode, data_rows = records.len(), "Synchronizing users");

        // Step 3: Dispatch
        let events = self.dispatcher.dispatch(&records).await?;

        // Step 4: Aggregate
        self.aggregator.finish(run_id, started_at, &events)
    }
}
