//! Git operations through the git CLI.
//!
//! The CLI is more reliable than in-process implementations for anonymous
//! network clones, and it is the only git capability this crate needs.

use crate::error::{Result, VcsError};
use crate::metadata::RepoMetadata;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// A cloned repository on disk.
#[derive(Debug)]
pub struct GitRepository {
    path: PathBuf,
}

impl GitRepository {
    /// Clone `url` into `dest`.
    ///
    /// Clones are anonymous: credential prompts are disabled, so a private
    /// repository fails fast instead of hanging.
    pub async fn clone_to(url: &str, dest: &Path, reference: Option<&str>) -> Result<Self> {
        debug!(url = %url, dest = ?dest, reference = ?reference, "cloning repository");

        let mut cmd = Command::new("git");
        cmd.arg("clone").arg("--quiet");
        // A pinned ref may be an arbitrary commit, which a shallow clone
        // cannot check out.
        if reference.is_none() {
            cmd.arg("--depth").arg("1");
        }
        cmd.arg(url).arg(dest);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("GIT_PROTOCOL", "version=2");

        let output = cmd.output().await.map_err(|source| VcsError::Io {
            message: "failed to run git clone".to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(VcsError::CloneFailed {
                url: url.to_string(),
                reason: stderr_reason(&output.stderr),
            });
        }

        let repo = Self {
            path: dest.to_path_buf(),
        };

        if let Some(reference) = reference {
            repo.checkout(url, reference).await?;
        }

        info!(url = %url, "clone complete");
        Ok(repo)
    }

    /// Check out a ref (branch, tag, or commit).
    async fn checkout(&self, url: &str, reference: &str) -> Result<()> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.path)
            .arg("checkout")
            .arg("--quiet")
            .arg(reference)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|source| VcsError::Io {
                message: "failed to run git checkout".to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(VcsError::CheckoutFailed {
                url: url.to_string(),
                reference: reference.to_string(),
                reason: stderr_reason(&output.stderr),
            });
        }

        Ok(())
    }

    /// Read and validate the repository's top-level `metadata.json`.
    pub async fn read_metadata(&self, url: &str) -> Result<RepoMetadata> {
        let path = self.path.join("metadata.json");
        let text = tokio::fs::read(&path)
            .await
            .map_err(|e| VcsError::MetadataMissing {
                url: url.to_string(),
                reason: format!("cannot read metadata.json: {e}"),
            })?;

        RepoMetadata::from_json(url, &text)
    }
}

/// Clone a module repository, read its `metadata.json`, and release the
/// checkout. The temporary directory is removed when this function
/// returns, on success and on error alike.
pub async fn fetch_metadata(url: &str, reference: Option<&str>) -> Result<RepoMetadata> {
    let tmp = tempfile::tempdir().map_err(|source| VcsError::Io {
        message: "failed to create temporary checkout directory".to_string(),
        source,
    })?;

    let repo = GitRepository::clone_to(url, &tmp.path().join("repo"), reference).await?;
    let metadata = repo.read_metadata(url).await?;

    debug!(url = %url, version = %metadata.version, "repository metadata read");
    Ok(metadata)
}

fn stderr_reason(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "git exited with an error".to_string()
    } else {
        trimmed.to_string()
    }
}
