//! Global context for Quay operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::{find_manifest as find_manifest_in, ManifestError};
use crate::util::config::{self, Config};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global Quay data (~/.quay/)
    home: PathBuf,

    verbose: bool,

    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let home = config::global_config_dir().unwrap_or_else(|| PathBuf::from(".quay"));

        Ok(GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Override the home directory (`QUAY_HOME`, tests).
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Global config file (~/.quay/config.toml).
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Project config file (<root>/.quay/config.toml).
    pub fn project_config_path(&self, project_root: &Path) -> PathBuf {
        config::project_config_path(project_root)
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Find `Quay.toml` starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestError> {
        let mut current = self.cwd.clone();
        loop {
            match find_manifest_in(&current) {
                Ok(path) => return Ok(path),
                Err(ManifestError::NotFound { .. }) => {
                    if !current.pop() {
                        return Err(ManifestError::NotFound {
                            dir: self.cwd.clone(),
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Merged global and project configuration for the project at
    /// `project_root`. A file that exists but does not parse is an error.
    pub fn load_config(&self, project_root: &Path) -> Result<Config> {
        let global = self.config_path();
        let project = self.project_config_path(project_root);
        tracing::debug!(
            "loading config from {} and {}",
            global.display(),
            project.display()
        );
        config::load_config(&global, &project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
        assert!(ctx.config_path().ends_with("config.toml"));

        let ctx = ctx.with_home(PathBuf::from("/opt/quay"));
        assert_eq!(ctx.config_path(), PathBuf::from("/opt/quay/config.toml"));
        assert_eq!(
            ctx.project_config_path(Path::new("/work")),
            PathBuf::from("/work/.quay/config.toml")
        );
    }

    #[test]
    fn test_find_manifest_searches_upward() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join("Quay.toml");
        std::fs::write(&manifest, "").unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested).unwrap();
        assert_eq!(ctx.find_manifest().ok(), Some(manifest));
    }

    #[test]
    fn test_find_manifest_missing() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();

        // A Quay.toml in a real ancestor of the temp dir would be found; the
        // error, when there is one, names the starting directory.
        if let Err(ManifestError::NotFound { dir }) = ctx.find_manifest() {
            assert_eq!(dir, tmp.path());
        }
    }

    #[test]
    fn test_load_project_config() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let project = tmp.path().join("project");
        std::fs::create_dir_all(project.join(".quay")).unwrap();
        std::fs::write(
            project.join(".quay").join("config.toml"),
            "[[attribute]]\nname = \"usage\"\n",
        )
        .unwrap();

        let ctx = GlobalContext::with_cwd(project.clone())
            .unwrap()
            .with_home(home);
        let config = ctx.load_config(&project).unwrap();
        assert_eq!(config.attributes.len(), 1);
    }
}
