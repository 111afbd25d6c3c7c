//! Result aggregation
//!
//! Merges the events of a run into a [`RunSummary`], reports the count per
//! event type and fails the run once, at the end, if any event is a failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use usersync_core::domain::{ResultEvent, RunId, RunSummary, MAX_REPORTED_FAILURES};
use usersync_core::ports::IRunReporter;

use crate::SyncError;

/// Turns the merged events of a run into its final outcome
pub struct ResultAggregator {
    reporter: Arc<dyn IRunReporter>,
}

impl ResultAggregator {
    pub fn new(reporter: Arc<dyn IRunReporter>) -> Self {
        Self { reporter }
    }

    /// Aggregates `events`
    ///
    /// # Errors
    /// Returns [`SyncError::RunFailed`] carrying the summary when any event
    /// is `failed` or `error`.
    pub fn finish(
        &self,
        run_id: RunId,
        started_at: DateTime<Utc>,
        events: &[ResultEvent],
    ) -> Result<RunSummary, SyncError> {
        let summary = RunSummary::from_events(run_id, started_at, events);

        for (event_type, count) in &summary.counts {
            self.reporter
                .info(&format!("There were {count} events of type {event_type}"));
        }

        if summary.is_success() {
            return Ok(summary);
        }

        self.reporter
            .info(&format!("Printing {MAX_REPORTED_FAILURES} first errors"));
        self.reporter.info("========================");
        for event in summary.first_failures() {
            self.reporter.info(&event.to_string());
        }
        Err(SyncError::RunFailed {
            summary: Box::new(summary),
        })
    }
}
