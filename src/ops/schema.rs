//! Describing the effective attribute schema (`quay schema`).

use serde::Serialize;

use crate::resolver::CapabilityRules;
use crate::schema::AttributeSchema;

/// One attribute and its rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub compatibility: String,
    pub disambiguation: String,
}

/// Capability rule, by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityRuleSummary {
    pub capability: String,
    pub resolution: String,
}

/// The effective schema and capability rules of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    /// In registration order
    pub attributes: Vec<AttributeSummary>,
    /// Order in which attributes break ties
    pub precedence: Vec<String>,
    pub capabilities: Vec<CapabilityRuleSummary>,
}

/// Summarize a schema and rule set.
pub fn describe(schema: &AttributeSchema, rules: &CapabilityRules) -> SchemaReport {
    SchemaReport {
        attributes: schema
            .attributes()
            .map(|rules| {
                let attribute = rules.attribute();
                AttributeSummary {
                    name: attribute.name().to_string(),
                    value_type: attribute.value_type().to_string(),
                    compatibility: rules.compatibility().name().to_string(),
                    disambiguation: rules.disambiguation().name().to_string(),
                }
            })
            .collect(),
        precedence: schema
            .precedence()
            .map(|rules| rules.attribute().name().to_string())
            .collect(),
        capabilities: rules
            .iter()
            .map(|(id, resolution)| CapabilityRuleSummary {
                capability: id.to_string(),
                resolution: resolution.name().to_string(),
            })
            .collect(),
    }
}

/// Human-readable rendering of a [`SchemaReport`].
pub fn format_report(report: &SchemaReport) -> String {
    let mut out = String::new();

    if report.attributes.is_empty() {
        out.push_str("no attributes declared\n");
    } else {
        out.push_str("attributes:\n");
        for attribute in &report.attributes {
            out.push_str(&format!(
                "  {} ({}): compatibility = {}, disambiguation = {}\n",
                attribute.name,
                attribute.value_type,
                attribute.compatibility,
                attribute.disambiguation
            ));
        }
        out.push_str(&format!("precedence: {}\n", report.precedence.join(", ")));
    }

    if !report.capabilities.is_empty() {
        out.push_str("capabilities:\n");
        for rule in &report.capabilities {
            out.push_str(&format!("  {}: {}\n", rule.capability, rule.resolution));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attribute, CapabilityId};
    use crate::resolver::CapabilityResolution;
    use crate::schema::{CompatibilityRule, DisambiguationRule};

    #[test]
    fn test_describe_schema() {
        let mut builder = AttributeSchema::builder();
        builder
            .register_default(Attribute::string("usage"))
            .unwrap()
            .register(
                Attribute::integer("jvm.version"),
                CompatibilityRule::AtMost,
                DisambiguationRule::Highest,
            )
            .unwrap()
            .set_precedence([Attribute::integer("jvm.version")])
            .unwrap();
        let schema = builder.freeze();

        let mut rules = CapabilityRules::new();
        rules.register(
            CapabilityId::new("org.logging", "api"),
            CapabilityResolution::SelectHighestVersion,
        );

        let report = describe(&schema, &rules);
        assert_eq!(report.attributes.len(), 2);
        assert_eq!(report.attributes[1].value_type, "integer");
        assert_eq!(report.attributes[1].compatibility, "at-most");
        assert_eq!(report.precedence, vec!["jvm.version", "usage"]);
        assert_eq!(report.capabilities[0].resolution, "select-highest-version");

        let text = format_report(&report);
        assert!(text.contains("precedence: jvm.version, usage"));
        assert!(text.contains("org.logging:api: select-highest-version"));
    }

    #[test]
    fn test_empty_schema() {
        let report = describe(&AttributeSchema::empty(), &CapabilityRules::new());
        assert_eq!(format_report(&report), "no attributes declared\n");
    }
}
