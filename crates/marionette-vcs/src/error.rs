//! VCS error types.

use thiserror::Error;

/// Errors retrieving module metadata from a repository.
#[derive(Debug, Error)]
pub enum VcsError {
    /// Clone failed.
    #[error("clone failed for {url}: {reason}")]
    CloneFailed {
        /// Repository URL.
        url: String,
        /// Failure reason (git stderr).
        reason: String,
    },

    /// Checkout of the requested ref failed.
    #[error("checkout failed for ref '{reference}' in {url}: {reason}")]
    CheckoutFailed {
        /// Repository URL.
        url: String,
        /// Reference that failed.
        reference: String,
        /// Failure reason (git stderr).
        reason: String,
    },

    /// The repository has no usable `metadata.json`.
    #[error("metadata.json missing or unparsable in {url}: {reason}")]
    MetadataMissing {
        /// Repository URL.
        url: String,
        /// What was wrong with the metadata.
        reason: String,
    },

    /// Local I/O failure around the temporary checkout.
    #[error("vcs i/o error: {message}")]
    Io {
        /// What failed.
        message: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for VCS operations.
pub type Result<T> = std::result::Result<T, VcsError>;
