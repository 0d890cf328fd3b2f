//! Links into the user manual.
//!
//! Every selection failure points at the variant matching documentation. The
//! base URL is configurable so that builds can pin the manual version they
//! were written against.

use anyhow::{Context, Result};
use url::Url;

/// Default manual location.
pub const DEFAULT_DOCS_URL: &str = "https://docs.quay.build/current/userguide";

/// Page and section describing the matching algorithm.
pub const VARIANT_ATTRIBUTES_PAGE: &str = "variant_attributes";
pub const ABM_ALGORITHM_SECTION: &str = "sec:abm_algorithm";

/// Resolves documentation links against a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationRegistry {
    base: String,
}

impl DocumentationRegistry {
    /// Create a registry for `base_url`, which must be an absolute URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("invalid documentation URL `{}`", base_url))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("documentation URL `{}` cannot be used as a base", base_url);
        }

        Ok(DocumentationRegistry {
            base: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `<base>/<page>#<section>`
    pub fn documentation_for(&self, page: &str, section: &str) -> String {
        format!("{}/{}#{}", self.base, page, section)
    }

    /// Link to the variant matching algorithm section.
    pub fn variant_matching(&self) -> String {
        self.documentation_for(VARIANT_ATTRIBUTES_PAGE, ABM_ALGORITHM_SECTION)
    }
}

impl Default for DocumentationRegistry {
    fn default() -> Self {
        DocumentationRegistry {
            base: DEFAULT_DOCS_URL.to_string(),
        }
    }
}
