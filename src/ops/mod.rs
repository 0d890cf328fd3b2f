//! High-level operations.
//!
//! This module contains the implementation of Quay commands.

pub mod project;
pub mod quay_init;
pub mod resolve;
pub mod schema;
pub mod select;

pub use project::Project;
pub use quay_init::{init_project, InitOptions, InitResult};
pub use resolve::{format_tree, resolve_project, ResolveOutcome};
pub use schema::{describe, format_report, SchemaReport};
pub use select::{build_request, parse_attribute_arg, select_variant, SelectOptions};
