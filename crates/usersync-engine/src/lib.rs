//! usersync Engine - User synchronization across domains and projects
//!
//! Provides:
//! - Mode dispatch over the nine synchronization strategies
//! - Project membership synchronization with remote error translation
//! - Bounded, cancellable partition execution
//! - Result aggregation and the end-to-end run use case
//!
//! ## Modules
//!
//! - [`dispatcher`] - Mode dispatcher, one handler per synchronization mode
//! - [`partition`] - Partition types and partition-key grouping
//! - [`synchronizer`] - Imports one partition into its project
//! - [`pool`] - Bounded worker pool running partitions
//! - [`aggregate`] - Result aggregator
//! - [`service`] - `SyncUsersUseCase`, load + dispatch + aggregate

pub mod aggregate;
pub mod dispatcher;
pub mod partition;
pub mod pool;
pub mod service;
pub mod synchronizer;

use thiserror::Error;

use usersync_core::domain::{DomainError, RunSummary};
use usersync_core::usecases::LoadError;

pub use aggregate::ResultAggregator;
pub use dispatcher::{DispatchSettings, ModeDispatcher};
pub use partition::{Partition, ProjectTarget};
pub use pool::PartitionPool;
pub use service::SyncUsersUseCase;
pub use synchronizer::ProjectSynchronizer;

/// Errors that can occur during a user synchronization run
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid configuration value (unknown mode, malformed project id)
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The input source could not be read
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A configuration value the selected mode needs is missing
    #[error("{parameter} is required for sync_mode \"{mode}\"")]
    MissingParameter {
        parameter: &'static str,
        mode: String,
    },

    /// A record has no partition key in a partitioned mode
    #[error("Column for determining the project assignment is empty for \"{login}\"")]
    BlankPartitionKey { login: String },

    /// A record has no client id in a client-based mode
    #[error("Client id cannot be empty")]
    BlankClientId,

    #[error("Project \"{pid}\" was not found. Please check your project ids in the source file")]
    ProjectNotFound { pid: String },

    #[error("Seems like you (user executing the script - {login}) do not have access to project \"{pid}\"")]
    AccessRevoked { login: String, pid: String },

    #[error("User {login} is not enabled within project \"{pid}\"")]
    NotEnabled { login: String, pid: String },

    #[error("The client \"{client}\" does not exist in data product \"{data_product}\"")]
    UnknownClient {
        client: String,
        data_product: String,
    },

    #[error("Client {client} does not have project.")]
    ClientWithoutProject { client: String },

    /// Neither project metadata nor a client identify the custom id
    #[error("Project \"{pid}\" has neither a GOODOT_CUSTOM_PROJECT_ID metadata value nor a client in data product \"{data_product}\". We are unable to get the value to filter users.")]
    CustomIdUnresolved { pid: String, data_product: String },

    /// A partition aborted on a failure that is not a known target error
    #[error("Synchronization of \"{partition}\" failed: {message}")]
    PartitionFailed { partition: String, message: String },

    /// A remote call outside any partition failed
    #[error(transparent)]
    Remote(#[from] anyhow::Error),

    /// A partition task panicked or was aborted
    #[error("Partition task failed: {0}")]
    TaskFailed(String),

    /// Outstanding work was cancelled after a sibling failure
    #[error("Synchronization cancelled")]
    Cancelled,

    /// The run finished with failed or error events
    #[error("There was an error syncing users")]
    RunFailed { summary: Box<RunSummary> },
}

impl SyncError {
    /// The run summary, when the run got far enough to produce one
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            SyncError::RunFailed { summary } => Some(summary),
            _ => None,
        }
    }
}
