//! Test fixtures for common test scenarios.
//!
//! This module provides pre-built manifests and configs, and a fixture
//! that lays them out as a project directory.

use std::path::{Path, PathBuf};

use crate::core::MANIFEST_NAME;

/// Fixture for a complete project directory.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Directory name under the base path.
    pub name: String,
    /// Quay.toml content.
    pub manifest: String,
    /// `.quay/config.toml` content, if any.
    pub config: Option<String>,
}

impl ProjectFixture {
    /// Create a new project with an empty manifest.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            manifest: String::new(),
            config: None,
        }
    }

    /// A project resolving a runtime classpath over two java libraries.
    pub fn java_libraries(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_manifest(manifests::java_libraries())
            .with_config(configs::usage_schema())
    }

    /// A project where two modules provide the same capability.
    pub fn capability_conflict(name: impl Into<String>, resolution: Option<&str>) -> Self {
        let mut config = configs::usage_schema();
        if let Some(resolution) = resolution {
            config.push_str(&configs::capability_rule("org.logging:api", resolution));
        }
        Self::new(name)
            .with_manifest(manifests::capability_conflict())
            .with_config(config)
    }

    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }

    /// Write the fixture to a directory, returning the project root.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<PathBuf> {
        let project_path = base_path.join(&self.name);
        std::fs::create_dir_all(&project_path)?;

        std::fs::write(project_path.join(MANIFEST_NAME), &self.manifest)?;

        if let Some(config) = &self.config {
            let config_dir = project_path.join(".quay");
            std::fs::create_dir_all(&config_dir)?;
            std::fs::write(config_dir.join("config.toml"), config)?;
        }

        Ok(project_path)
    }
}

/// Common Quay.toml templates.
pub mod manifests {
    /// `app` depends on `lib`; both publish api and runtime variants.
    pub fn java_libraries() -> String {
        r#"[defaults]
usage = "runtime"

[[component]]
module = "com.example:app:1.0"
project = ":app"

[[component.variant]]
name = "apiElements"
attributes = { usage = "compile" }

[[component.variant]]
name = "runtimeElements"
attributes = { usage = "runtime" }

[[component]]
module = "com.example:lib:1.0"

[[component.variant]]
name = "apiElements"
attributes = { usage = "compile" }
artifacts = ["lib-1.0.jar"]

[[component.variant]]
name = "runtimeElements"
attributes = { usage = "runtime" }
artifacts = ["lib-1.0.jar"]

[[edge]]
to = "com.example:app"

[[edge]]
from = "com.example:app/runtimeElements"
to = "com.example:lib"
"#
        .to_string()
    }

    /// `app` pulls in two logging bindings that both provide
    /// `org.logging:api`.
    pub fn capability_conflict() -> String {
        let mut manifest = String::from(
            r#"[defaults]
usage = "runtime"

[[component]]
module = "com.example:app:1.0"

[[component.variant]]
name = "runtimeElements"
attributes = { usage = "runtime" }

[[edge]]
to = "com.example:app"
"#,
        );
        manifest.push_str(&binding("org.logging", "simple", "1.0"));
        manifest.push_str(&binding("org.logging", "fancy", "2.0"));
        manifest
    }

    /// A component with one runtime variant providing `org.logging:api`.
    pub fn binding(group: &str, name: &str, version: &str) -> String {
        format!(
            r#"
[[component]]
module = "{group}:{name}:{version}"

[[component.variant]]
name = "runtimeElements"
attributes = {{ usage = "runtime" }}
capabilities = ["org.logging:api:{version}"]

[[edge]]
from = "com.example:app/runtimeElements"
to = "{group}:{name}"
"#
        )
    }
}

/// Common `.quay/config.toml` templates.
pub mod configs {
    /// `usage` and `category` with default rules.
    pub fn usage_schema() -> String {
        r#"[[attribute]]
name = "usage"

[[attribute]]
name = "category"
"#
        .to_string()
    }

    /// A capability rule block.
    pub fn capability_rule(id: &str, resolution: &str) -> String {
        format!(
            r#"
[[capability]]
id = "{id}"
resolution = "{resolution}"
"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_fixture_write() {
        let tmp = TempDir::new().unwrap();
        let fixture = ProjectFixture::java_libraries("demo");

        let root = fixture.write_to(tmp.path()).unwrap();
        assert!(root.join("Quay.toml").exists());
        assert!(root.join(".quay").join("config.toml").exists());
    }

    #[test]
    fn test_manifest_templates() {
        let conflict = manifests::capability_conflict();
        assert_eq!(conflict.matches("org.logging:api").count(), 2);

        let rule = configs::capability_rule("org.logging:api", "highest-version");
        assert!(rule.contains("resolution = \"highest-version\""));
    }
}
