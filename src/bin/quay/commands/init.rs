//! `quay init` command

use std::path::PathBuf;

use anyhow::Result;

use super::GlobalOptions;
use crate::cli::InitArgs;
use quay::ops::{init_project, InitOptions};
use quay::util::Status;

pub fn execute(args: InitArgs, global: &GlobalOptions) -> Result<()> {
    let shell = global.shell(false);
    let path = args.path.unwrap_or_else(|| PathBuf::from("."));

    let opts = InitOptions { force: args.force };
    let result = init_project(&path, &opts)?;

    shell.status(Status::Created, result.manifest.display());
    if let Some(config) = result.config {
        shell.status(Status::Created, config.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    /// Helper to parse InitArgs from command-line strings.
    fn parse_init_args(args: &[&str]) -> InitArgs {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            init: InitArgs,
        }
        TestCli::parse_from(args).init
    }

    #[test]
    fn test_init_args_defaults() {
        let args = parse_init_args(&["test"]);
        assert!(args.path.is_none());
        assert!(!args.force);
    }

    #[test]
    fn test_init_with_path_and_force() {
        let args = parse_init_args(&["test", "--force", "mydir"]);
        assert!(args.force);
        assert_eq!(args.path, Some(PathBuf::from("mydir")));
    }
}
