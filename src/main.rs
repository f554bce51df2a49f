//! confucius CLI
//!
//! Shows which configuration sources a load would use and what they merge into.

use anyhow::Result;
use clap::Parser;
use confucius::Tree;
use confucius::cli::{Cli, Command, MergeArgs, OutputFormat, SourceArgs};
use std::fs::OpenOptions;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG, when set, takes precedence over -v.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    match cli.log.as_str() {
        "0" | "off" => {}
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    match cli.command {
        Command::Sources(args) => run_sources(&args),
        Command::Merge(args) => run_merge(&args),
    }
}

fn run_sources(args: &SourceArgs) -> Result<()> {
    let located = args.loader().locate()?;
    for source in &located.sources {
        println!("{}", source);
    }
    Ok(())
}

fn run_merge(args: &MergeArgs) -> Result<()> {
    let tree = args.loader().resolve()?;
    print!("{}", render(&tree, args.format)?);
    Ok(())
}

fn render(tree: &Tree, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(tree)?),
        OutputFormat::Yaml => serde_yaml::to_string(tree)?,
    })
}
