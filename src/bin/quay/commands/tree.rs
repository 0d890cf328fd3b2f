//! `quay tree` command

use anyhow::Result;

use super::{report_session_failure, GlobalOptions};
use crate::cli::TreeArgs;
use quay::ops::{format_tree, resolve_project, Project};

pub fn execute(args: TreeArgs, global: &GlobalOptions) -> Result<()> {
    let shell = global.shell(false);
    let ctx = global.context(&shell)?;
    let project = Project::load(&ctx, args.manifest.manifest.as_deref())?;

    match resolve_project(&project)? {
        Ok(graph) => {
            print!("{}", format_tree(&graph, args.depth));
            Ok(())
        }
        Err(failure) => {
            report_session_failure(&failure, project.manifest_path(), shell.use_color());
            Err(failure.into())
        }
    }
}
