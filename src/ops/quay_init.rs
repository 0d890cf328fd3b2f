//! Implementation of `quay init`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::MANIFEST_NAME;
use crate::util::config::project_config_path;

const STARTER_MANIFEST: &str = r#"# Consumer attributes, merged under every edge request.
[defaults]
usage = "runtime"

[[component]]
module = "com.example:app:1.0"

[[component.variant]]
name = "apiElements"
attributes = { usage = "compile" }

[[component.variant]]
name = "runtimeElements"
attributes = { usage = "runtime" }

[[edge]]
to = "com.example:app"
"#;

const STARTER_CONFIG: &str = r#"[[attribute]]
name = "usage"

[selection]
precedence = ["usage"]
"#;

/// Options for `quay init`.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Overwrite an existing manifest
    pub force: bool,
}

/// Files written by [`init_project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitResult {
    pub manifest: PathBuf,
    /// `None` when a project config already existed
    pub config: Option<PathBuf>,
}

/// Write a starter `Quay.toml` and project config into `path`.
pub fn init_project(path: &Path, opts: &InitOptions) -> Result<InitResult> {
    let manifest = path.join(MANIFEST_NAME);
    if manifest.exists() && !opts.force {
        bail!(
            "`{}` already exists\n\
             \n\
             Use `quay init --force` to overwrite it.",
            manifest.display()
        );
    }

    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory {}", path.display()))?;
    fs::write(&manifest, STARTER_MANIFEST)
        .with_context(|| format!("failed to write {}", manifest.display()))?;

    let config_path = project_config_path(path);
    let config = if config_path.exists() {
        tracing::debug!("keeping existing {}", config_path.display());
        None
    } else {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(&config_path, STARTER_CONFIG)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        Some(config_path)
    };

    Ok(InitResult { manifest, config })
}
