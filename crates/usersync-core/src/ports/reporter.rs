//! Run reporter port (driven/secondary port)
//!
//! This module defines the reporting context handed to every component of a
//! run. It carries the operator-facing messages of a run (missing users,
//! deletion warnings, event counts, first errors), separately from the
//! `tracing` diagnostics each component emits on its own.
//!
//! ## Design Notes
//!
//! - Reporting is fire-and-forget and synchronous; a reporter must never
//!   fail the run.
//! - [`TracingReporter`] forwards to `tracing`, [`NoopReporter`] discards,
//!   [`RecordingReporter`] keeps messages for assertions.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

// ============================================================================
// ReportLevel
// ============================================================================

/// Severity of a reported message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReportLevel::Debug => "debug",
            ReportLevel::Info => "info",
            ReportLevel::Warn => "warn",
            ReportLevel::Error => "error",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// IRunReporter trait
// ============================================================================

/// Port trait for operator-facing run reporting
pub trait IRunReporter: Send + Sync {
    /// Reports one message at `level`
    fn report(&self, level: ReportLevel, message: &str);

    fn debug(&self, message: &str) {
        self.report(ReportLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.report(ReportLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.report(ReportLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.report(ReportLevel::Error, message);
    }
}

// ============================================================================
// Implementations
// ============================================================================

/// Forwards run messages to `tracing` under the `usersync::run` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl IRunReporter for TracingReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        match level {
            ReportLevel::Debug => tracing::debug!(target: "usersync::run", "{}", message),
            ReportLevel::Info => tracing::info!(target: "usersync::run", "{}", message),
            ReportLevel::Warn => tracing::warn!(target: "usersync::run", "{}", message),
            ReportLevel::Error => tracing::error!(target: "usersync::run", "{}", message),
        }
    }
}

/// Discards every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl IRunReporter for NoopReporter {
    fn report(&self, _level: ReportLevel, _message: &str) {}
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<(ReportLevel, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message reported so far
    pub fn messages(&self) -> Vec<(ReportLevel, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Whether any message at `level` contains `needle`
    pub fn contains(&self, level: ReportLevel, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl IRunReporter for RecordingReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((level, message.to_string()));
        }
    }
}
