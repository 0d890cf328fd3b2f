//! Quay.toml session manifest.
//!
//! The manifest describes one resolution: the consumer's default attributes,
//! the components taking part with their variants, and the edges between
//! them.
//!
//! ```toml
//! [defaults]
//! usage = "runtime"
//!
//! [[component]]
//! module = "com.example:lib:1.0"
//!
//! [[component.variant]]
//! name = "runtimeElements"
//! attributes = { usage = "runtime", "jvm.version" = 11 }
//!
//! [[edge]]
//! to = "com.example:lib"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::core::{
    AttributeContainer, AttributeContainerBuilder, AttributeValue, Capability, Component,
    ComponentId, ModuleCoordinates, ModuleId, VariantDecl,
};
use crate::resolver::{CapabilityRules, Edge, EdgeSource, ResolutionSession, SessionError};
use crate::schema::AttributeSchema;
use crate::util::docs::DocumentationRegistry;

/// File name of the session manifest.
pub const MANIFEST_NAME: &str = "Quay.toml";

/// Problems with the content of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("could not find `{}` in `{}` or any parent directory", MANIFEST_NAME, .dir.display())]
    NotFound { dir: PathBuf },

    #[error("component `{component}`: {message}")]
    InvalidComponent { component: String, message: String },

    #[error("edge #{index} (`{from}` -> `{to}`): {message}")]
    InvalidEdge {
        index: usize,
        from: String,
        to: String,
        message: String,
    },

    #[error("invalid [defaults]: {message}")]
    InvalidDefaults { message: String },
}

/// Locate `Quay.toml` in `dir`.
pub fn find_manifest(dir: &Path) -> Result<PathBuf, ManifestError> {
    let path = dir.join(MANIFEST_NAME);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ManifestError::NotFound {
            dir: dir.to_path_buf(),
        })
    }
}

/// A parsed session manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    defaults: AttributeContainer,
    components: Vec<Component>,
    edges: Vec<Edge>,
    manifest_dir: PathBuf,
}

/// Raw manifest as deserialized from TOML.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    defaults: BTreeMap<String, AttributeValue>,

    #[serde(default, rename = "component")]
    components: Vec<RawComponent>,

    #[serde(default, rename = "edge")]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawComponent {
    /// `group:name:version`
    module: String,

    /// Project path, for components built by the current build.
    project: Option<String>,

    #[serde(default, rename = "variant")]
    variants: Vec<RawVariant>,

    /// configuration name -> variant name
    #[serde(default)]
    configurations: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVariant {
    name: String,

    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,

    #[serde(default)]
    capabilities: Vec<String>,

    #[serde(default)]
    artifacts: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEdge {
    /// `root` or `group:name/variant`
    #[serde(default = "default_edge_source")]
    from: String,

    /// `group:name`
    to: String,

    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,

    configuration: Option<String>,
}

fn default_edge_source() -> String {
    "root".to_string()
}

fn container(raw: BTreeMap<String, AttributeValue>) -> Result<AttributeContainer, String> {
    let mut builder = AttributeContainerBuilder::new();
    for (name, value) in raw {
        builder
            .insert(name.as_str(), value)
            .map_err(|e| e.to_string())?;
    }
    Ok(builder.build())
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let manifest_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let defaults = container(raw.defaults)
            .map_err(|message| ManifestError::InvalidDefaults { message })?;

        let mut components = Vec::with_capacity(raw.components.len());
        for raw_component in raw.components {
            components.push(Self::convert_component(raw_component)?);
        }

        let mut edges = Vec::with_capacity(raw.edges.len());
        for (index, raw_edge) in raw.edges.into_iter().enumerate() {
            edges.push(Self::convert_edge(index, raw_edge)?);
        }

        tracing::debug!(
            "loaded {}: {} component(s), {} edge(s)",
            path.display(),
            components.len(),
            edges.len()
        );

        Ok(Manifest {
            defaults,
            components,
            edges,
            manifest_dir,
        })
    }

    fn convert_component(raw: RawComponent) -> Result<Component, ManifestError> {
        let invalid = |message: String| ManifestError::InvalidComponent {
            component: raw.module.clone(),
            message,
        };

        let coordinates: ModuleCoordinates =
            raw.module.parse().map_err(|e| invalid(format!("{}", e)))?;
        let id = match &raw.project {
            Some(path) => ComponentId::project(path.as_str(), coordinates),
            None => ComponentId::module(coordinates),
        };

        if raw.variants.is_empty() {
            tracing::warn!("component `{}` declares no variants", id);
        }

        let mut builder = Component::builder(id);
        for variant in raw.variants {
            let attributes = container(variant.attributes)
                .map_err(|e| invalid(format!("variant `{}`: {}", variant.name, e)))?;
            let mut decl = VariantDecl::new(variant.name.as_str()).with_attributes(attributes);
            for notation in &variant.capabilities {
                let capability: Capability = notation
                    .parse()
                    .map_err(|e| invalid(format!("variant `{}`: {}", variant.name, e)))?;
                decl = decl.with_capability(capability);
            }
            for artifact in &variant.artifacts {
                decl = decl.with_artifact(artifact.as_str());
            }
            builder = builder.variant(decl).map_err(|e| invalid(e.to_string()))?;
        }
        for (configuration, variant) in &raw.configurations {
            builder = builder
                .configuration(configuration.as_str(), variant.as_str())
                .map_err(|e| invalid(e.to_string()))?;
        }

        Ok(builder.build())
    }

    fn convert_edge(index: usize, raw: RawEdge) -> Result<Edge, ManifestError> {
        let invalid = |message: String| ManifestError::InvalidEdge {
            index,
            from: raw.from.clone(),
            to: raw.to.clone(),
            message,
        };

        let from = parse_edge_source(&raw.from).map_err(invalid)?;
        let target: ModuleId = raw.to.parse().map_err(|e| invalid(format!("{}", e)))?;
        let request = container(raw.attributes.clone()).map_err(invalid)?;

        if raw.configuration.is_some() && !request.is_empty() {
            return Err(invalid(
                "`configuration` and `attributes` cannot be combined".to_string(),
            ));
        }

        let mut edge = Edge::new(from, target).with_request(request);
        if let Some(configuration) = &raw.configuration {
            edge = edge.with_configuration(configuration.as_str());
        }
        Ok(edge)
    }

    /// Consumer attributes applied to every edge.
    pub fn defaults(&self) -> &AttributeContainer {
        &self.defaults
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, module: &ModuleId) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.id().module_id() == *module)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Directory containing the manifest.
    pub fn manifest_dir(&self) -> &Path {
        &self.manifest_dir
    }

    /// Build a resolution session from this manifest.
    pub fn session<'a>(
        &self,
        schema: &'a AttributeSchema,
        capability_rules: &'a CapabilityRules,
        docs: &'a DocumentationRegistry,
    ) -> Result<ResolutionSession<'a>, SessionError> {
        let mut session = ResolutionSession::new(schema, capability_rules, docs);
        session.set_defaults(self.defaults.clone());
        for component in &self.components {
            session.add_component(component.clone())?;
        }
        for edge in &self.edges {
            session.add_edge(edge.clone())?;
        }
        Ok(session)
    }
}

/// Parse `root` or `group:name/variant`.
fn parse_edge_source(s: &str) -> Result<EdgeSource, String> {
    let s = s.trim();
    if s == "root" {
        return Ok(EdgeSource::Root);
    }

    let Some((module, variant)) = s.split_once('/') else {
        return Err("expected `root` or `group:name/variant`".to_string());
    };
    let component: ModuleId = module.parse().map_err(|e| format!("{}", e))?;
    if variant.trim().is_empty() {
        return Err("source variant name cannot be empty".to_string());
    }

    Ok(EdgeSource::Variant {
        component,
        variant: variant.trim().into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[defaults]
usage = "runtime"
"jvm.version" = 17

[[component]]
module = "com.example:app:1.0"
project = ":app"

[[component.variant]]
name = "runtimeElements"
attributes = { usage = "runtime" }

[[component]]
module = "com.example:lib:1.0"
configurations = { default = "runtimeElements" }

[[component.variant]]
name = "apiElements"
attributes = { usage = "compile", "jvm.version" = 11 }
artifacts = ["lib-1.0.jar"]

[[component.variant]]
name = "runtimeElements"
attributes = { usage = "runtime", "jvm.version" = 11 }
capabilities = ["com.example:lib:1.0", "com.example:lib-runtime"]

[[edge]]
to = "com.example:app"

[[edge]]
from = "com.example:app/runtimeElements"
to = "com.example:lib"
configuration = "default"
"#;

    fn parse(content: &str) -> Result<Manifest> {
        Manifest::parse(content, Path::new("/tmp/Quay.toml"))
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = parse(SAMPLE).unwrap();

        assert_eq!(manifest.defaults().len(), 2);
        assert_eq!(
            manifest.defaults().get_raw("jvm.version"),
            Some(AttributeValue::Integer(17))
        );
        assert_eq!(manifest.components().len(), 2);
        assert_eq!(manifest.manifest_dir(), Path::new("/tmp"));

        let app = &manifest.components()[0];
        assert_eq!(app.id().to_string(), "project :app");

        let lib = manifest
            .component(&ModuleId::new("com.example", "lib"))
            .unwrap();
        assert_eq!(lib.variants().len(), 2);
        assert_eq!(lib.configuration("default").unwrap().name(), "runtimeElements");
        assert_eq!(lib.variants()[0].artifacts().len(), 1);
        assert_eq!(lib.variants()[1].capabilities().len(), 2);

        let edges = manifest.edges();
        assert_eq!(edges[0].from, EdgeSource::Root);
        assert_eq!(edges[1].to_string(), "com.example:app/runtimeElements -> com.example:lib");
        assert_eq!(edges[1].configuration.map(|c| c.as_str()), Some("default"));
    }

    #[test]
    fn test_manifest_builds_session() {
        let manifest = parse(SAMPLE).unwrap();
        let schema = AttributeSchema::empty();
        let rules = CapabilityRules::new();
        let docs = DocumentationRegistry::default();

        let session = manifest.session(&schema, &rules, &docs).unwrap();
        assert_eq!(session.edges().len(), 2);

        let graph = session.resolve().unwrap();
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_invalid_edges() {
        let err = parse("[[edge]]\nfrom = \"app\"\nto = \"com.example:lib\"\n").unwrap_err();
        let err = err.downcast::<ManifestError>().unwrap();
        assert!(matches!(err, ManifestError::InvalidEdge { index: 0, .. }));

        let err = parse(
            "[[edge]]\nto = \"com.example:lib\"\nconfiguration = \"default\"\nattributes = { usage = \"runtime\" }\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn test_invalid_component() {
        let err = parse("[[component]]\nmodule = \"lib\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid module notation"));

        let err = parse(
            "[[component]]\nmodule = \"com.example:lib:1.0\"\n\n[[component.variant]]\nname = \"a\"\n\n[[component.variant]]\nname = \"a\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("already has a variant named `a`"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(parse("[[component]]\nmodule = \"com.example:lib:1.0\"\nversion = \"1.0\"\n").is_err());
    }

    #[test]
    fn test_find_manifest() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            find_manifest(tmp.path()),
            Err(ManifestError::NotFound { .. })
        ));

        std::fs::write(tmp.path().join(MANIFEST_NAME), SAMPLE).unwrap();
        let path = find_manifest(tmp.path()).unwrap();
        assert!(Manifest::load(&path).is_ok());
    }
}
