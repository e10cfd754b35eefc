//! Marionette CLI - transitive dependency resolution for Puppetfiles.

mod commands;

use clap::Parser;
use commands::{Cli, Commands};
use std::process::ExitCode;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Ok(log_level) = Level::from_str(&cli.loglevel) else {
        eprintln!("error: unknown log level '{}'", cli.loglevel);
        return ExitCode::FAILURE;
    };

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Single logical task: all resolver state lives on one thread and
    // suspension happens only at network and filesystem boundaries.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create runtime");

    let result = runtime.block_on(async {
        let cancellation = CancellationToken::new();
        let signal_token = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_token.cancel();
            }
        });

        match cli.command {
            Commands::Resolve(args) => commands::resolve::run(args, cancellation).await,
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
