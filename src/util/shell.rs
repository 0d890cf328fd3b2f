//! Centralized shell output.
//!
//! The Shell provides one API for human-facing CLI output:
//! - Status messages right-aligned to a 12 column gutter
//! - A spinner (via indicatif) while a resolution runs
//! - A JSON mode that silences all human output
//!
//! Everything goes to stderr; stdout is reserved for results.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors and a spinner.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable output only; status lines are dropped.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only
    Quiet,
    #[default]
    Normal,
    /// --verbose: no spinner, debug logs interleave with status lines
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors when stderr is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

/// Status labels for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success (green)
    Resolved,
    Selected,
    Created,

    // In progress (cyan)
    Resolving,

    // Warning (yellow)
    Excluded,
    Orphaned,
    Warning,

    // Error (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Resolved => "Resolved",
            Status::Selected => "Selected",
            Status::Created => "Created",
            Status::Resolving => "Resolving",
            Status::Excluded => "Excluded",
            Status::Orphaned => "Orphaned",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Resolved | Status::Selected | Status::Created => "\x1b[1;32m",
            Status::Resolving => "\x1b[1;36m",
            Status::Excluded | Status::Orphaned | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
}

impl Shell {
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell { mode, use_color }
    }

    /// Create a shell from CLI flags.
    ///
    /// JSON mode takes precedence over quiet/verbose.
    pub fn from_flags(quiet: bool, verbose: bool, no_color: bool, json: bool) -> Self {
        if json {
            return Shell::new(ShellMode::Json);
        }

        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        let color = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Shell::new(ShellMode::Human { verbosity, color })
    }

    pub fn mode(&self) -> &ShellMode {
        &self.mode
    }

    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`. Quiet mode keeps errors only; JSON
    /// mode drops everything.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() || (self.is_quiet() && status != Status::Error) {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Start a spinner for a long-running step.
    ///
    /// Only animates in normal human mode on a terminal; otherwise the
    /// spinner only tracks elapsed time.
    pub fn spinner(&self, msg: impl Display) -> Spinner {
        let animate = !self.is_json()
            && !self.is_quiet()
            && !self.is_verbose()
            && io::stderr().is_terminal();

        let bar = animate.then(|| {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
                bar.set_style(style);
            }
            bar.set_message(format!("{} {}", Status::Resolving.as_str(), msg));
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });

        Spinner {
            bar,
            start: Instant::now(),
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

/// A running spinner; cleared on [`Spinner::finish`] or drop.
pub struct Spinner {
    bar: Option<ProgressBar>,
    start: Instant,
}

impl Spinner {
    /// Stop the spinner and return the elapsed time, formatted.
    pub fn finish(self) -> String {
        format_duration(self.start.elapsed())
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
