//! Result events emitted by every mutating operation
//!
//! Events are never dropped: the synchronizer and the filter reconciler
//! return them and the run summary aggregates them at the end of a run.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Outcome class of a single operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
    Failed,
    Error,
    Skipped,
    DryRun,
}

impl EventType {
    /// `failed` and `error` events make a run unsuccessful
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, EventType::Failed | EventType::Error)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "created",
            EventType::Updated => "updated",
            EventType::Deleted => "deleted",
            EventType::Failed => "failed",
            EventType::Error => "error",
            EventType::Skipped => "skipped",
            EventType::DryRun => "dry_run",
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation an event refers to, used to describe dry-run intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A single outcome of a mutating call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEvent {
    /// Outcome class
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// User identity or filter reference the event is about
    pub subject: String,
    /// Human-readable detail, empty when there is nothing to add
    pub detail: String,
    /// Operation the event describes, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    /// Partition key (project id or client id) that produced the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
}

impl ResultEvent {
    /// Creates an event with an empty detail
    pub fn new(event_type: EventType, subject: impl Into<String>) -> Self {
        Self {
            event_type,
            subject: subject.into(),
            detail: String::new(),
            operation: None,
            partition: None,
        }
    }

    pub fn created(subject: impl Into<String>) -> Self {
        Self::new(EventType::Created, subject).with_operation(Operation::Create)
    }

    pub fn updated(subject: impl Into<String>) -> Self {
        Self::new(EventType::Updated, subject).with_operation(Operation::Update)
    }

    pub fn deleted(subject: impl Into<String>) -> Self {
        Self::new(EventType::Deleted, subject).with_operation(Operation::Delete)
    }

    pub fn failed(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(EventType::Failed, subject).with_detail(detail)
    }

    pub fn error(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(EventType::Error, subject).with_detail(detail)
    }

    pub fn skipped(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(EventType::Skipped, subject).with_detail(detail)
    }

    /// A would-be operation reported instead of being executed
    pub fn dry_run(subject: impl Into<String>, operation: Operation) -> Self {
        Self::new(EventType::DryRun, subject).with_operation(operation)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.event_type.is_failure()
    }
}

impl Display for ResultEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.event_type, self.subject)?;
        if let Some(partition) = &self.partition {
            write!(f, " ({partition})")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}
