//! Run summary
//!
//! Merges the result events of every partition, counts them per type and
//! decides whether the run succeeded.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RunId;
use super::result_event::{EventType, ResultEvent};

/// How many failing events are surfaced for diagnostics
pub const MAX_REPORTED_FAILURES: usize = 10;

/// Aggregated outcome of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of events per type, only types that occurred
    pub counts: BTreeMap<EventType, usize>,
    /// Every `failed` and `error` event, in merge order
    pub failures: Vec<ResultEvent>,
    pub total_events: usize,
}

impl RunSummary {
    /// Aggregates `events`, finishing the run now
    #[must_use]
    pub fn from_events(run_id: RunId, started_at: DateTime<Utc>, events: &[ResultEvent]) -> Self {
        let mut counts = BTreeMap::new();
        for event in events {
            *counts.entry(event.event_type).or_insert(0) += 1;
        }
        let failures = events.iter().filter(|e| e.is_failure()).cloned().collect();

        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            counts,
            failures,
            total_events: events.len(),
        }
    }

    /// Number of events of `event_type`
    #[must_use]
    pub fn count(&self, event_type: EventType) -> usize {
        self.counts.get(&event_type).copied().unwrap_or(0)
    }

    /// Count of `error` plus `failed` events
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Up to the first ten failing events
    #[must_use]
    pub fn first_failures(&self) -> &[ResultEvent] {
        let end = self.failures.len().min(MAX_REPORTED_FAILURES);
        &self.failures[..end]
    }

    /// Wall-clock duration of the run in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}
