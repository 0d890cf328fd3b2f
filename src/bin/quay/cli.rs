//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Quay - attribute-based variant selection and capability arbitration
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Directory holding the global config (defaults to ~/.quay)
    #[arg(long, global = true, env = "QUAY_HOME", hide = true)]
    pub quay_home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve every edge of the session and arbitrate capabilities
    Resolve(ResolveArgs),

    /// Select one variant of a component
    Select(SelectArgs),

    /// Display the resolved variant graph
    Tree(TreeArgs),

    /// Show the effective attribute schema and capability rules
    Schema(SchemaArgs),

    /// Create a starter Quay.toml
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ManifestArgs {
    /// Path to Quay.toml (defaults to the nearest one above the current directory)
    #[arg(long, env = "QUAY_MANIFEST")]
    pub manifest: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Print the report or failures as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SelectArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Component to select from (group:name)
    #[arg(short, long)]
    pub component: String,

    /// Requested attribute (name=value), repeatable
    #[arg(short, long = "attr", value_name = "NAME=VALUE")]
    pub attributes: Vec<String>,

    /// Select a named configuration instead of matching attributes
    #[arg(long, conflicts_with = "attributes")]
    pub configuration: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Maximum depth to display
    #[arg(short, long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Print the schema as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,

    /// Overwrite an existing Quay.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
