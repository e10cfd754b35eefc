//! Command definitions.

pub mod resolve;

use clap::{Parser, Subcommand};

/// Transitive dependency resolution for Puppetfile manifests.
#[derive(Debug, Parser)]
#[command(name = "marionette", version, about)]
pub struct Cli {
    /// The command to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level: error, warn, info, debug, or trace.
    #[arg(long, global = true, default_value = "warn")]
    pub loglevel: String,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a Puppetfile, pinning every transitive module dependency.
    Resolve(resolve::ResolveArgs),
}
