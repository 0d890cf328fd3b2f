//! Loading a project: manifest, merged config and the rules built from it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::Manifest;
use crate::resolver::{CapabilityRules, ResolutionSession};
use crate::schema::AttributeSchema;
use crate::util::config::Config;
use crate::util::docs::DocumentationRegistry;
use crate::util::GlobalContext;

/// Everything a resolution needs, loaded once.
#[derive(Debug)]
pub struct Project {
    manifest_path: PathBuf,
    manifest: Manifest,
    config: Config,
    schema: AttributeSchema,
    rules: CapabilityRules,
    docs: DocumentationRegistry,
}

impl Project {
    /// Load the project at `manifest_path`, or the nearest `Quay.toml` above
    /// the working directory.
    pub fn load(ctx: &GlobalContext, manifest_path: Option<&Path>) -> Result<Self> {
        let manifest_path = match manifest_path {
            Some(path) => path.to_path_buf(),
            None => ctx.find_manifest().map_err(|e| {
                anyhow::anyhow!("{}\nhelp: Run `quay init` to create a new project", e)
            })?,
        };

        let manifest = Manifest::load(&manifest_path)?;
        let config = ctx.load_config(manifest.manifest_dir())?;

        let schema = config.build_schema().with_context(|| {
            format!(
                "invalid config for project at {}",
                manifest.manifest_dir().display()
            )
        })?;
        let rules = config.build_capability_rules()?;
        let docs = config.docs()?;

        tracing::debug!(
            "loaded {} with {} attribute(s) and {} capability rule(s)",
            manifest_path.display(),
            schema.len(),
            rules.len()
        );

        Ok(Project {
            manifest_path,
            manifest,
            config,
            schema,
            rules,
            docs,
        })
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn root(&self) -> &Path {
        self.manifest.manifest_dir()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    pub fn capability_rules(&self) -> &CapabilityRules {
        &self.rules
    }

    pub fn docs(&self) -> &DocumentationRegistry {
        &self.docs
    }

    /// A resolution session over the manifest's components and edges.
    pub fn session(&self) -> Result<ResolutionSession<'_>> {
        self.manifest
            .session(&self.schema, &self.rules, &self.docs)
            .with_context(|| format!("invalid session in {}", self.manifest_path.display()))
    }
}
