//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IPlatformClient`], [`IDomain`], [`IProject`], [`ILabel`] - Remote platform collaborators
//! - [`IRecordSource`] - Tabular input rows with a header
//! - [`IRunReporter`] - Operator-facing run reporting

pub mod platform;
pub mod record_source;
pub mod reporter;

pub use platform::{
    CreateUsersOptions, IDomain, ILabel, IPlatformClient, IProject, ImportOptions, PlatformError,
};
pub use record_source::{IRecordSource, InMemorySource};
pub use reporter::{IRunReporter, NoopReporter, RecordingReporter, ReportLevel, TracingReporter};
