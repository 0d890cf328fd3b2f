//! Configuration file support for Quay.
//!
//! Quay supports two configuration file locations:
//! - Global: `~/.quay/config.toml` - User-wide defaults
//! - Project: `.quay/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. The configuration
//! declares the attribute schema and the capability resolution rules:
//!
//! ```toml
//! [documentation]
//! base-url = "https://docs.example.com/8.5/userguide"
//!
//! [selection]
//! precedence = ["jvm.version"]
//!
//! [[attribute]]
//! name = "jvm.version"
//! type = "integer"
//! compatibility = "at-most"
//! disambiguation = "highest"
//!
//! [[capability]]
//! id = "com.example:lib"
//! resolution = "highest-version"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::{Attribute, AttributeValue, CapabilityId, ModuleId, ValueType};
use crate::resolver::{CapabilityResolution, CapabilityRules};
use crate::schema::{AttributeSchema, CompatibilityRule, DisambiguationRule, SchemaBuilder};
use crate::util::docs::DocumentationRegistry;

/// Quay configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Documentation links
    pub documentation: DocumentationConfig,

    /// Selection settings
    pub selection: SelectionConfig,

    /// Attribute declarations, in registration order
    #[serde(rename = "attribute")]
    pub attributes: Vec<AttributeConfig>,

    /// Capability resolution rules
    #[serde(rename = "capability")]
    pub capabilities: Vec<CapabilityConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DocumentationConfig {
    /// Base URL of the user manual
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Attributes consulted first when breaking ties
    pub precedence: Vec<String>,
}

/// Built-in compatibility rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompatibilityKind {
    #[default]
    Equality,
    AtMost,
    AtLeast,
}

/// Built-in disambiguation rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisambiguationKind {
    #[default]
    None,
    PreferRequested,
    Highest,
    Lowest,
    Closest,
    PreferUnspecified,
}

/// One `[[attribute]]` declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AttributeConfig {
    pub name: String,

    #[serde(rename = "type", default = "default_value_type")]
    pub value_type: ValueType,

    #[serde(default)]
    pub compatibility: CompatibilityKind,

    /// Requested value -> additional candidate values accepted for it.
    /// Replaces `compatibility` when set.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub accepts: BTreeMap<String, Vec<AttributeValue>>,

    #[serde(default)]
    pub disambiguation: DisambiguationKind,

    /// Preferred values, best first. Replaces `disambiguation` when set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefer: Vec<AttributeValue>,
}

fn default_value_type() -> ValueType {
    ValueType::String
}

impl AttributeConfig {
    pub fn attribute(&self) -> Attribute {
        Attribute::new(self.name.as_str(), self.value_type)
    }

    fn compatibility_rule(&self) -> Result<CompatibilityRule> {
        if !self.accepts.is_empty() {
            if self.compatibility != CompatibilityKind::Equality {
                bail!(
                    "attribute `{}`: `accepts` cannot be combined with `compatibility`",
                    self.name
                );
            }
            let mut table = Vec::with_capacity(self.accepts.len());
            for (requested, accepted) in &self.accepts {
                let requested = AttributeValue::from(requested.as_str())
                    .coerce_to(self.value_type)
                    .with_context(|| {
                        format!(
                            "attribute `{}`: `{}` is not a {} value",
                            self.name, requested, self.value_type
                        )
                    })?;
                table.push((requested, accepted.clone()));
            }
            return Ok(CompatibilityRule::accepts(table));
        }

        Ok(match self.compatibility {
            CompatibilityKind::Equality => CompatibilityRule::Equality,
            CompatibilityKind::AtMost => CompatibilityRule::AtMost,
            CompatibilityKind::AtLeast => CompatibilityRule::AtLeast,
        })
    }

    fn disambiguation_rule(&self) -> Result<DisambiguationRule> {
        if !self.prefer.is_empty() {
            if self.disambiguation != DisambiguationKind::None {
                bail!(
                    "attribute `{}`: `prefer` cannot be combined with `disambiguation`",
                    self.name
                );
            }
            return Ok(DisambiguationRule::prefer_order(self.prefer.iter().copied()));
        }

        Ok(match self.disambiguation {
            DisambiguationKind::None => DisambiguationRule::None,
            DisambiguationKind::PreferRequested => DisambiguationRule::PreferRequested,
            DisambiguationKind::Highest => DisambiguationRule::Highest,
            DisambiguationKind::Lowest => DisambiguationRule::Lowest,
            DisambiguationKind::Closest => DisambiguationRule::Closest,
            DisambiguationKind::PreferUnspecified => DisambiguationRule::PreferUnspecified,
        })
    }
}

/// Built-in capability resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionKind {
    HighestVersion,
    PreferComponent,
    Reject,
}

/// One `[[capability]]` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityConfig {
    /// `group:name`
    pub id: String,

    pub resolution: ResolutionKind,

    /// `group:name` of the preferred module, for `prefer-component`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    /// Message for `reject`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CapabilityConfig {
    fn resolution(&self) -> Result<CapabilityResolution> {
        Ok(match self.resolution {
            ResolutionKind::HighestVersion => CapabilityResolution::SelectHighestVersion,
            ResolutionKind::PreferComponent => {
                let Some(component) = &self.component else {
                    bail!(
                        "capability `{}`: `prefer-component` requires `component`",
                        self.id
                    );
                };
                let module: ModuleId = component
                    .parse()
                    .with_context(|| format!("capability `{}`", self.id))?;
                CapabilityResolution::PreferComponent(module)
            }
            ResolutionKind::Reject => CapabilityResolution::Reject(
                self.reason
                    .clone()
                    .unwrap_or_else(|| format!("conflicts on `{}` are not allowed", self.id)),
            ),
        })
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Attributes and capability rules are merged by name; a redeclared
    /// attribute keeps its original registration slot.
    pub fn merge(&mut self, other: Config) {
        if other.documentation.base_url.is_some() {
            self.documentation.base_url = other.documentation.base_url;
        }
        if !other.selection.precedence.is_empty() {
            self.selection.precedence = other.selection.precedence;
        }

        for attribute in other.attributes {
            match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
                Some(existing) => *existing = attribute,
                None => self.attributes.push(attribute),
            }
        }

        for capability in other.capabilities {
            match self.capabilities.iter_mut().find(|c| c.id == capability.id) {
                Some(existing) => *existing = capability,
                None => self.capabilities.push(capability),
            }
        }
    }

    /// Documentation links for failure messages.
    pub fn docs(&self) -> Result<DocumentationRegistry> {
        match &self.documentation.base_url {
            Some(url) => DocumentationRegistry::new(url),
            None => Ok(DocumentationRegistry::default()),
        }
    }

    /// Register every declared attribute and freeze the schema.
    pub fn build_schema(&self) -> Result<AttributeSchema> {
        let mut builder = SchemaBuilder::new();
        for declaration in &self.attributes {
            builder
                .register(
                    declaration.attribute(),
                    declaration.compatibility_rule()?,
                    declaration.disambiguation_rule()?,
                )
                .context("invalid attribute declaration")?;
        }

        if !self.selection.precedence.is_empty() {
            let mut precedence = Vec::with_capacity(self.selection.precedence.len());
            for name in &self.selection.precedence {
                let Some(declaration) = self.attributes.iter().find(|a| &a.name == name) else {
                    bail!("invalid attribute precedence: `{}` is not a declared attribute", name);
                };
                precedence.push(declaration.attribute());
            }
            builder.set_precedence(precedence)?;
        }

        Ok(builder.freeze())
    }

    /// Capability resolution rules keyed by capability.
    pub fn build_capability_rules(&self) -> Result<CapabilityRules> {
        let mut rules = CapabilityRules::new();
        for declaration in &self.capabilities {
            let id: CapabilityId = declaration
                .id
                .parse()
                .with_context(|| format!("invalid capability rule `{}`", declaration.id))?;
            rules.register(id, declaration.resolution()?);
        }
        Ok(rules)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.quay/config.toml)
/// 2. Global config (~/.quay/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    for path in [global_path, project_path] {
        if path.exists() {
            config.merge(Config::load(path)?);
        }
    }

    Ok(config)
}

/// Get the global quay config directory (~/.quay).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".quay"))
}

/// Get the project config path (.quay/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".quay").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const JVM_CONFIG: &str = r#"
[documentation]
base-url = "https://docs.example.com/8.5/userguide"

[selection]
precedence = ["jvm.version"]

[[attribute]]
name = "usage"
accepts = { runtime = ["compile"] }
prefer = ["runtime", "compile"]

[[attribute]]
name = "jvm.version"
type = "integer"
compatibility = "at-most"
disambiguation = "highest"

[[capability]]
id = "com.example:lib"
resolution = "highest-version"

[[capability]]
id = "com.example:logging"
resolution = "prefer-component"
component = "com.example:logging-api"
"#;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.documentation.base_url.is_none());
        assert!(config.attributes.is_empty());
        assert!(config.build_schema().unwrap().is_empty());
        assert!(config.build_capability_rules().unwrap().is_empty());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, JVM_CONFIG).unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.attributes.len(), 2);
        assert_eq!(config.attributes[1].value_type, ValueType::Integer);
        assert_eq!(config.attributes[1].compatibility, CompatibilityKind::AtMost);
        assert_eq!(config.capabilities[1].resolution, ResolutionKind::PreferComponent);

        let docs = config.docs().unwrap();
        assert!(docs.variant_matching().starts_with("https://docs.example.com/8.5/"));
    }

    #[test]
    fn test_build_schema() {
        let config: Config = toml::from_str(JVM_CONFIG).unwrap();
        let schema = config.build_schema().unwrap();

        let precedence: Vec<&str> = schema
            .precedence()
            .map(|r| r.attribute().name().as_str())
            .collect();
        assert_eq!(precedence, vec!["jvm.version", "usage"]);

        let usage = schema.rules("usage").unwrap();
        assert_eq!(usage.compatibility().name(), "accepts");
        assert!(usage
            .compatibility()
            .check(&"runtime".into(), &"compile".into())
            .is_compatible());
        assert_eq!(usage.disambiguation().name(), "prefer-order");

        let rules = config.build_capability_rules().unwrap();
        assert_eq!(rules.len(), 2);
        assert!(matches!(
            rules.get(&"com.example:logging".parse().unwrap()),
            Some(CapabilityResolution::PreferComponent(_))
        ));
    }

    #[test]
    fn test_invalid_declarations() {
        let config: Config = toml::from_str(
            "[[attribute]]\nname = \"usage\"\ncompatibility = \"at-most\"\n",
        )
        .unwrap();
        let err = config.build_schema().unwrap_err();
        assert!(format!("{:#}", err).contains("cannot be used for string attribute"));

        let config: Config =
            toml::from_str("[selection]\nprecedence = [\"usage\"]\n").unwrap();
        assert!(config.build_schema().is_err());

        let config: Config = toml::from_str(
            "[[capability]]\nid = \"com.example:lib\"\nresolution = \"prefer-component\"\n",
        )
        .unwrap();
        assert!(config.build_capability_rules().is_err());

        assert!(toml::from_str::<Config>("[[attribute]]\nname = \"a\"\ncolour = 1\n").is_err());
    }

    #[test]
    fn test_config_merge() {
        let mut base: Config = toml::from_str(JVM_CONFIG).unwrap();

        let project: Config = toml::from_str(
            r#"
[[attribute]]
name = "usage"

[[attribute]]
name = "category"

[[capability]]
id = "com.example:lib"
resolution = "reject"
reason = "pick one explicitly"
"#,
        )
        .unwrap();
        base.merge(project);

        let names: Vec<&str> = base.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["usage", "jvm.version", "category"]);
        assert!(base.attributes[0].accepts.is_empty());
        assert_eq!(base.selection.precedence, vec!["jvm.version".to_string()]);
        assert_eq!(base.capabilities[0].resolution, ResolutionKind::Reject);
        assert!(base.documentation.base_url.is_some());
    }

    #[test]
    fn test_load_config_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");
        std::fs::write(&global, "[documentation]\nbase-url = \"https://a.example.com/docs\"\n")
            .unwrap();
        std::fs::write(&project, "[documentation]\nbase-url = \"https://b.example.com/docs\"\n")
            .unwrap();

        let config = load_config(&global, &project).unwrap();
        assert_eq!(
            config.documentation.base_url.as_deref(),
            Some("https://b.example.com/docs")
        );

        let config = load_config(&global, &tmp.path().join("missing.toml")).unwrap();
        assert_eq!(
            config.documentation.base_url.as_deref(),
            Some("https://a.example.com/docs")
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");
        std::fs::write(&global, "[[attribute]]\nname = \"usage\"\n").unwrap();
        std::fs::write(
            &project,
            "[[attribute]]\nname = \"jvm.version\"\ntype = \"integer\"\ncompatability = \"at-most\"\n",
        )
        .unwrap();

        let err = load_config(&global, &project).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("failed to parse config file"));
        assert!(message.contains("project.toml"));
        assert!(message.contains("compatability"));
    }
}
