//! Single-selection operations (`quay select`).

use anyhow::{bail, Context, Result};

use crate::core::{AttributeContainer, AttributeValue, ModuleId, Variant};
use crate::ops::project::Project;
use crate::resolver::{SelectionFailure, VariantSelector};
use crate::schema::AttributeSchema;

/// Options for a single selection.
#[derive(Debug, Clone)]
pub struct SelectOptions {
    /// Component to select from
    pub component: ModuleId,

    /// Requested attributes as `(name, raw value)`
    pub attributes: Vec<(String, String)>,

    /// Select this configuration instead of matching attributes
    pub configuration: Option<String>,
}

/// Split a `name=value` argument.
pub fn parse_attribute_arg(arg: &str) -> Result<(String, String)> {
    let Some((name, value)) = arg.split_once('=') else {
        bail!("invalid attribute `{}`, expected `name=value`", arg);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("invalid attribute `{}`, name cannot be empty", arg);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Build a request from raw `name=value` pairs.
///
/// Declared attributes are parsed to their declared type. Undeclared ones
/// are read as an integer, then a boolean, then a string.
pub fn build_request(
    schema: &AttributeSchema,
    attributes: &[(String, String)],
) -> Result<AttributeContainer> {
    let mut builder = AttributeContainer::builder();
    for (name, raw) in attributes {
        let value = match schema.attribute(name) {
            Some(attribute) => AttributeValue::from(raw.as_str())
                .coerce_to(attribute.value_type())
                .with_context(|| {
                    format!(
                        "attribute `{}` expects a {} value, got `{}`",
                        name,
                        attribute.value_type(),
                        raw
                    )
                })?,
            None => infer_value(raw),
        };
        builder.insert(name.as_str(), value)?;
    }
    Ok(builder.build())
}

fn infer_value(raw: &str) -> AttributeValue {
    if let Ok(i) = raw.parse::<i64>() {
        return AttributeValue::Integer(i);
    }
    match raw {
        "true" => AttributeValue::Boolean(true),
        "false" => AttributeValue::Boolean(false),
        _ => AttributeValue::from(raw),
    }
}

/// Run one selection against a component of the project.
///
/// Session defaults apply to attribute requests. The outer error covers
/// unknown components and malformed requests.
pub fn select_variant(
    project: &Project,
    opts: &SelectOptions,
) -> Result<std::result::Result<Variant, SelectionFailure>> {
    let Some(component) = project.manifest().component(&opts.component) else {
        bail!(
            "component `{}` is not declared in {}",
            opts.component,
            project.manifest_path().display()
        );
    };

    if let Some(configuration) = &opts.configuration {
        if !opts.attributes.is_empty() {
            bail!("`--configuration` cannot be combined with `--attr`");
        }
        let selector = VariantSelector::new(project.schema(), project.docs());
        return Ok(selector.select_configuration(component, configuration));
    }

    let request = build_request(project.schema(), &opts.attributes)?;
    tracing::debug!("selecting from {} with {}", opts.component, request);

    let session = project.session()?;
    match session.select(&opts.component, &request) {
        Some(outcome) => Ok(outcome),
        None => bail!("component `{}` is not part of the session", opts.component),
    }
}
