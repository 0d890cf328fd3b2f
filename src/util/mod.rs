//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod docs;
pub mod hash;
pub mod interning;
pub mod shell;

pub use config::Config;
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
pub use docs::DocumentationRegistry;
pub use interning::InternedString;
pub use shell::{Shell, Status};
