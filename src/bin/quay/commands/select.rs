//! `quay select` command

use anyhow::{Context, Result};

use super::{print_json, report_selection_failure, GlobalOptions};
use crate::cli::SelectArgs;
use quay::core::ModuleId;
use quay::ops::{parse_attribute_arg, select_variant, Project, SelectOptions};
use quay::util::Status;

pub fn execute(args: SelectArgs, global: &GlobalOptions) -> Result<()> {
    let shell = global.shell(args.json);
    let ctx = global.context(&shell)?;
    let project = Project::load(&ctx, args.manifest.manifest.as_deref())?;

    let component: ModuleId = args
        .component
        .parse()
        .with_context(|| format!("invalid --component `{}`", args.component))?;
    let attributes = args
        .attributes
        .iter()
        .map(|arg| parse_attribute_arg(arg))
        .collect::<Result<Vec<_>>>()?;

    let opts = SelectOptions {
        component,
        attributes,
        configuration: args.configuration,
    };

    match select_variant(&project, &opts)? {
        Ok(variant) => {
            if args.json {
                print_json(&variant)?;
            } else {
                println!("{}", variant.name());
                shell.status(
                    Status::Selected,
                    format!("{} {}", variant.display_name(), variant.attributes()),
                );
            }
            Ok(())
        }
        Err(failure) => {
            if args.json {
                print_json(&failure)?;
            } else {
                report_selection_failure(&failure, project.manifest_path(), shell.use_color());
            }
            Err(failure.into())
        }
    }
}
