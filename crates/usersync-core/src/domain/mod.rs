//! Domain entities and business logic
//!
//! This module contains the core domain types for user synchronization:
//! - Newtypes for type-safe identifiers
//! - Desired user records and their deduplication
//! - Synchronization modes
//! - Result events and the run summary that aggregates them
//! - Data-access filter definitions and existing filter objects
//! - Clients, platform users, roles and membership planning
//! - Domain-specific error types

pub mod client_record;
pub mod errors;
pub mod filter;
pub mod membership;
pub mod newtypes;
pub mod platform_user;
pub mod result_event;
pub mod summary;
pub mod sync_mode;
pub mod user_record;
pub mod whitelist;

// Re-export commonly used types
pub use client_record::ClientRecord;
pub use errors::DomainError;
pub use filter::{
    merge_definitions, normalize_expression, DesiredFilter, ExistingFilter, FilterClause,
    FilterDefinition,
};
pub use membership::{MembershipChange, MembershipPlan, MembershipPolicy, Unresolved};
pub use newtypes::*;
pub use platform_user::{find_role, PlatformUser, ProjectRole};
pub use result_event::{EventType, Operation, ResultEvent};
pub use summary::{RunSummary, MAX_REPORTED_FAILURES};
pub use sync_mode::SyncMode;
pub use user_record::{dedup_by_identity, UserRecord};
pub use whitelist::Whitelist;
