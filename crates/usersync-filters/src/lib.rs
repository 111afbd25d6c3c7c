//! usersync filters - Data-access filter reconciliation
//!
//! Provides:
//! - Desired filter construction from label/value definitions
//! - A diff plan against the filters stored on a project
//! - Execution of the plan, or a dry run reporting it
//! - Loading of filter definitions from tabular rows

pub mod builder;
pub mod definitions;
pub mod error;
pub mod plan;
pub mod reconciler;

pub use builder::{clause_expression, combine_expressions, BuiltFilters, FilterBuilder};
pub use definitions::DefinitionLoader;
pub use error::FilterError;
pub use plan::FilterPlan;
pub use reconciler::{FilterReconciler, ReconcileOptions, ReconcileResult};
