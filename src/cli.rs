//! CLI command definitions for the `confucius` binary.
//!
//! The binary inspects how a configuration would resolve without binding it
//! to a type: which sources are found, and what the merged tree looks like.

use crate::loader::{DEFAULT_FILENAME, Loader};
use crate::sources::{DEFAULT_PROFILE_LAYOUT, Format};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Inspect layered configuration resolution
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log destination: off, stderr, or a file path (appended)
    #[arg(long, global = true, value_name = "DEST", default_value = "stderr")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List located sources in precedence order, lowest first
    Sources(SourceArgs),

    /// Print the merged configuration tree
    Merge(MergeArgs),
}

/// Where to look for configuration files
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Main configuration filename
    #[arg(short, long, default_value = DEFAULT_FILENAME)]
    pub file: String,

    /// Directory to search (repeatable, searched in order; default: .)
    #[arg(short, long = "dir", value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Profile to layer over the main file (repeatable, later wins)
    #[arg(short, long = "profile", value_name = "NAME")]
    pub profiles: Vec<String>,

    /// Filename template for profile files
    #[arg(long, default_value = DEFAULT_PROFILE_LAYOUT)]
    pub profile_layout: String,
}

impl SourceArgs {
    /// A loader configured from these arguments.
    pub fn loader(&self) -> Loader {
        let mut loader = Loader::new()
            .file(&self.file)
            .profiles(self.profiles.iter().cloned())
            .profile_layout(&self.profile_layout);
        if !self.dirs.is_empty() {
            loader = loader.dirs(self.dirs.iter().cloned());
        }
        loader
    }
}

/// Output format for the merged tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Arguments for the merge subcommand
#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Configuration text merged under every file
    #[arg(long, value_name = "TEXT")]
    pub string: Option<String>,

    /// Format of --string
    #[arg(long, value_name = "FORMAT", default_value = "yaml")]
    pub string_format: Format,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl MergeArgs {
    pub fn loader(&self) -> Loader {
        let loader = self.sources.loader();
        match self.string {
            Some(ref text) => loader.string(text, self.string_format),
            None => loader,
        }
    }
}
