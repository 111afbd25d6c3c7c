//! Project synchronizer
//!
//! Imports one partition into its project and translates the remote
//! failures that make a whole project unreachable into messages naming the
//! project. Per-record failures are the adapter's business: they come back
//! as `failed`/`error` events, or as an error when failures are not
//! tolerated.

use std::sync::Arc;

use tracing::{debug, info};

use usersync_core::domain::{ProjectId, ResultEvent};
use usersync_core::ports::{IPlatformClient, IProject, ImportOptions, PlatformError};

use crate::partition::{Partition, ProjectTarget};
use crate::SyncError;

/// Imports partitions into projects
pub struct ProjectSynchronizer {
    client: Arc<dyn IPlatformClient>,
    options: ImportOptions,
    /// Login of the account running the synchronization
    current_login: String,
}

impl ProjectSynchronizer {
    pub fn new(
        client: Arc<dyn IPlatformClient>,
        options: ImportOptions,
        current_login: impl Into<String>,
    ) -> Self {
        Self {
            client,
            options,
            current_login: current_login.into(),
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Opens a project, translating lookup failures
    pub async fn open(&self, pid: &ProjectId) -> Result<Arc<dyn IProject>, SyncError> {
        match self.client.project(pid).await {
            Ok(Some(project)) => Ok(project),
            Ok(None) => Err(SyncError::ProjectNotFound {
                pid: pid.to_string(),
            }),
            Err(err) => Err(self.translate(err, pid)),
        }
    }

    /// Imports the partition's records into its project
    ///
    /// Every returned event is tagged with the partition key.
    #[tracing::instrument(skip(self, partition), fields(partition = %partition.key, records = partition.records.len()))]
    pub async fn synchronize(&self, partition: Partition) -> Result<Vec<ResultEvent>, SyncError> {
        let project = match partition.target {
            ProjectTarget::Loaded(project) => project,
            ProjectTarget::Id(pid) => self.open(&pid).await?,
        };

        info!(
            pid = %project.pid(),
            data_rows = partition.records.len(),
            "Importing users into project"
        );
        let events = project
            .import_users(&partition.records, &self.options)
            .await
            .map_err(|err| self.translate(err, project.pid()))?;
        debug!(events = events.len(), "Import finished");

        let key = partition.key;
        Ok(events
            .into_iter()
            .map(|event| match event.partition {
                Some(_) => event,
                None => event.with_partition(key.clone()),
            })
            .collect())
    }

    /// Maps a remote failure on project `pid` to a run error
    pub fn translate(&self, err: anyhow::Error, pid: &ProjectId) -> SyncError {
        let pid = pid.to_string();
        match PlatformError::find(&err) {
            Some(PlatformError::NotFound(_)) => SyncError::ProjectNotFound { pid },
            Some(PlatformError::Gone(_)) | Some(PlatformError::Unauthorized(_)) => {
                SyncError::AccessRevoked {
                    login: self.current_login.clone(),
                    pid,
                }
            }
            Some(PlatformError::Forbidden(_)) => SyncError::NotEnabled {
                login: self.current_login.clone(),
                pid,
            },
            None => SyncError::PartitionFailed {
                partition: pid,
                message: format!("{err:#}"),
            },
        }
    }
}
