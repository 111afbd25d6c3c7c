//! Integration tests for usersync-engine
//!
//! Runs the dispatcher and the end-to-end use case against an in-memory
//! platform that records every call.

mod common;

mod test_organization;
mod test_projects;
