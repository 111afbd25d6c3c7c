//! Partitions of desired records
//!
//! A [`Partition`] is the subset of records routed to one project. The
//! project is either known by id and opened by the worker, or already
//! loaded by the dispatcher.

use std::fmt;
use std::sync::Arc;

use usersync_core::domain::{ProjectId, UserRecord};
use usersync_core::ports::IProject;

use crate::SyncError;

/// The project a partition is synchronized into
#[derive(Clone)]
pub enum ProjectTarget {
    /// Opened lazily; lookup failures are translated per partition
    Id(ProjectId),
    /// Already resolved by the dispatcher
    Loaded(Arc<dyn IProject>),
}

impl ProjectTarget {
    pub fn pid(&self) -> &ProjectId {
        match self {
            ProjectTarget::Id(pid) => pid,
            ProjectTarget::Loaded(project) => project.pid(),
        }
    }
}

impl fmt::Debug for ProjectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectTarget::Id(pid) => f.debug_tuple("Id").field(pid).finish(),
            ProjectTarget::Loaded(project) => f.debug_tuple("Loaded").field(project.pid()).finish(),
        }
    }
}

/// Records routed to one project
#[derive(Debug, Clone)]
pub struct Partition {
    /// Partition key as it appeared in the input (project id or client id)
    pub key: String,
    pub target: ProjectTarget,
    pub records: Vec<UserRecord>,
}

impl Partition {
    pub fn new(key: impl Into<String>, target: ProjectTarget, records: Vec<UserRecord>) -> Self {
        Self {
            key: key.into(),
            target,
            records,
        }
    }
}

/// Groups records by partition key, keeping first-appearance order
///
/// Record order within a group mirrors input order.
///
/// # Errors
/// Returns [`SyncError::BlankPartitionKey`] for the first record without a key.
pub fn group_by_key(records: &[UserRecord]) -> Result<Vec<(String, Vec<UserRecord>)>, SyncError> {
    let mut groups: Vec<(String, Vec<UserRecord>)> = Vec::new();
    for record in records {
        let key = require_key(record)?;
        match groups.iter_mut().find(|(k, _)| k == key) {
            Some((_, members)) => members.push(record.clone()),
            None => groups.push((key.to_string(), vec![record.clone()])),
        }
    }
    Ok(groups)
}

/// The record's partition key, or a blank-key error naming its login
pub fn require_key(record: &UserRecord) -> Result<&str, SyncError> {
    record
        .partition_key()
        .ok_or_else(|| SyncError::BlankPartitionKey {
            login: record.identity().unwrap_or_default().to_string(),
        })
}
