//! Quay CLI - variant selection and capability arbitration

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::GlobalOptions;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("quay=debug")
    } else {
        EnvFilter::new("quay=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .without_time()
        .init();

    let global = GlobalOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        no_color: cli.no_color,
        quay_home: cli.quay_home,
    };

    // Execute command
    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args, &global),
        Commands::Select(args) => commands::select::execute(args, &global),
        Commands::Tree(args) => commands::tree::execute(args, &global),
        Commands::Schema(args) => commands::schema::execute(args, &global),
        Commands::Init(args) => commands::init::execute(args, &global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
