//! Command implementations

pub mod completions;
pub mod init;
pub mod resolve;
pub mod schema;
pub mod select;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::Result;

use quay::resolver::{SelectionFailure, SessionFailure};
use quay::util::diagnostic::emit;
use quay::util::{GlobalContext, Shell};

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub no_color: bool,
    pub quay_home: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn shell(&self, json: bool) -> Shell {
        Shell::from_flags(self.quiet, self.verbose, self.no_color, json)
    }

    pub fn context(&self, shell: &Shell) -> Result<GlobalContext> {
        let mut ctx = GlobalContext::new()?;
        if let Some(home) = &self.quay_home {
            ctx = ctx.with_home(home.clone());
        }
        ctx.set_verbose(self.verbose);
        ctx.set_color(shell.use_color());
        Ok(ctx)
    }
}

/// Print every failure of a session to stderr.
pub fn report_session_failure(failure: &SessionFailure, manifest: &Path, color: bool) {
    for reported in &failure.failures {
        let mut diagnostic = reported.failure.to_diagnostic().with_location(manifest);
        if let Some(edge) = &reported.edge {
            diagnostic = diagnostic.with_context(format!("required by edge {}", edge));
        }
        emit(&diagnostic, color);
        eprintln!();
    }
}

pub fn report_selection_failure(failure: &SelectionFailure, manifest: &Path, color: bool) {
    emit(&failure.to_diagnostic().with_location(manifest), color);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
