//! `quay schema` command
//!
//! Shows the schema built from the merged global and project config. Works
//! outside a project too, where only the global config applies.

use anyhow::Result;

use super::{print_json, GlobalOptions};
use crate::cli::SchemaArgs;
use quay::ops::{describe, format_report, Project};

pub fn execute(args: SchemaArgs, global: &GlobalOptions) -> Result<()> {
    let shell = global.shell(args.json);
    let ctx = global.context(&shell)?;

    let report = if args.manifest.manifest.is_some() || ctx.find_manifest().is_ok() {
        let project = Project::load(&ctx, args.manifest.manifest.as_deref())?;
        describe(project.schema(), project.capability_rules())
    } else {
        tracing::debug!("no Quay.toml found, showing global config only");
        let config = ctx.load_config(ctx.cwd())?;
        describe(&config.build_schema()?, &config.build_capability_rules()?)
    };

    if args.json {
        print_json(&report)
    } else {
        print!("{}", format_report(&report));
        Ok(())
    }
}
