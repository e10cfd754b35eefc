//! The `resolve` command.

use anyhow::Context as _;
use clap::Args;
use marionette_core::Slug;
use marionette_resolver::{DUMP_FILE_NAME, Resolver, ResolverOptions, write_dump};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Arguments for `marionette resolve`.
#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// Path to the Puppetfile to resolve.
    pub puppetfile: PathBuf,

    /// File listing slugs to omit from the output, one per line.
    #[arg(long)]
    pub hide_file: Option<PathBuf>,

    /// File listing slugs whose deprecation and no-version-found errors
    /// are demoted to warnings, one per line.
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,

    /// File whose contents are placed verbatim above the module list.
    #[arg(long)]
    pub preamble_file: Option<PathBuf>,

    /// Write the resolved manifest here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: ResolveArgs, cancellation: CancellationToken) -> anyhow::Result<ExitCode> {
    let text = tokio::fs::read_to_string(&args.puppetfile)
        .await
        .with_context(|| format!("cannot read {}", args.puppetfile.display()))?;
    let parsed = marionette_manifest::parse(&text)?;

    let options = ResolverOptions {
        hide: load_slug_file(args.hide_file.as_deref()).await?,
        ignore: load_slug_file(args.ignore_file.as_deref()).await?,
        preamble: load_preamble(args.preamble_file.as_deref()).await?,
        cancellation: Some(cancellation),
        ..ResolverOptions::default()
    };

    let mut resolver = Resolver::new(parsed, options)?;
    match resolver.run().await {
        Ok(resolved) => {
            let rendered = resolved.emit();
            match &args.output {
                Some(path) => {
                    tokio::fs::write(path, &rendered)
                        .await
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    info!(path = %path.display(), "resolved manifest written");
                }
                None => print!("{rendered}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let dump_path = PathBuf::from(DUMP_FILE_NAME);
            match write_dump(&dump_path, &resolver.diagnostic_dump()) {
                Ok(()) => error!(dump = %dump_path.display(), "resolution failed, diagnostic dump written"),
                Err(dump_err) => error!(error = %dump_err, "resolution failed, diagnostic dump could not be written"),
            }
            Err(e.into())
        }
    }
}

/// Read a slug-per-line file; `#` comments and blank lines are skipped.
async fn load_slug_file(path: Option<&Path>) -> anyhow::Result<HashSet<Slug>> {
    let Some(path) = path else {
        return Ok(HashSet::new());
    };

    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;

    let mut slugs = HashSet::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let slug = Slug::parse(line)
            .with_context(|| format!("invalid slug '{line}' in {}", path.display()))?;
        slugs.insert(slug);
    }
    Ok(slugs)
}

async fn load_preamble(path: Option<&Path>) -> anyhow::Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(Some(text.trim_end().to_string()))
}
