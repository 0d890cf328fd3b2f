//! User-facing diagnostic messages.
//!
//! Every failure rendered to a user carries the root cause, the facts that
//! led to it (one context line each) and a numbered list of things to try.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages.
pub mod suggestions {
    /// Ambiguous selection.
    pub const ADD_ATTRIBUTES: &str =
        "Add more attributes to the request so that only one variant matches";

    /// Ambiguous selection, schema side.
    pub const ADD_DISAMBIGUATION_RULE: &str =
        "Register a disambiguation rule for one of the attributes that differ";

    /// Capability conflict.
    pub const ADD_CAPABILITY_RULE: &str =
        "Configure a capability resolution rule for the conflicting capability";

    /// Broken rule implementation.
    pub const REPORT_RULE_BUG: &str =
        "This is a bug in a compatibility or disambiguation rule, not in the build configuration";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Help,
}

impl Severity {
    fn label(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Help => "help",
        }
    }

    fn colored_label(&self) -> &'static str {
        match self {
            Severity::Error => "\x1b[1;31merror\x1b[0m",
            Severity::Help => "\x1b[1;32mhelp\x1b[0m",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A diagnostic message with context and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes, in the order they should be tried
    pub suggestions: Vec<String>,
    /// File the diagnostic relates to
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity = if color {
            self.severity.colored_label()
        } else {
            self.severity.label()
        };
        output.push_str(&format!("{}: {}\n", severity, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  → {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help = if color {
                Severity::Help.colored_label()
            } else {
                Severity::Help.label()
            };
            output.push_str(&format!("{}: consider:\n", help));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
