//! Use cases (interactors) for usersync
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`LoadRecordsUseCase`] - Turns tabular rows into canonical user records
//! - [`IdentityResolver`] - Finds platform users by login, project roster first

pub mod load_records;
pub mod resolve_identity;

pub use load_records::{LoadError, LoadRecordsUseCase, LoaderOptions, RowAccessor};
pub use resolve_identity::IdentityResolver;
