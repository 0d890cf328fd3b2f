//! `quay resolve` command

use anyhow::Result;

use super::{print_json, report_session_failure, GlobalOptions};
use crate::cli::ResolveArgs;
use quay::ops::{resolve_project, Project};
use quay::util::Status;

pub fn execute(args: ResolveArgs, global: &GlobalOptions) -> Result<()> {
    let shell = global.shell(args.json);
    let ctx = global.context(&shell)?;
    let project = Project::load(&ctx, args.manifest.manifest.as_deref())?;

    let spinner = shell.spinner(project.manifest_path().display());
    let outcome = resolve_project(&project)?;
    let elapsed = spinner.finish();

    let graph = match outcome {
        Ok(graph) => graph,
        Err(failure) => {
            if args.json {
                print_json(&failure)?;
            } else if !shell.is_quiet() || failure.has_fatal() {
                report_session_failure(&failure, project.manifest_path(), shell.use_color());
            }
            return Err(failure.into());
        }
    };

    if args.json {
        return print_json(&graph.report());
    }

    for variant in graph.variants() {
        println!("{}", variant.display_name());
        for artifact in variant.artifacts() {
            println!("    {}", artifact);
        }
    }
    for variant in graph.excluded() {
        shell.status(
            Status::Excluded,
            format!("{} (capability conflict)", variant.display_name()),
        );
    }
    for variant in graph.orphaned() {
        shell.status(Status::Orphaned, variant.display_name());
    }
    shell.status(
        Status::Resolved,
        format!(
            "{} variant(s) in {}, fingerprint {}",
            graph.len(),
            elapsed,
            graph.fingerprint()
        ),
    );

    Ok(())
}
