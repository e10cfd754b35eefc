//! Resolution error types.
//!
//! Only `NoVersionFound` and `ModuleDeprecated` have a recovery path (the
//! ignore list demotes them to warnings). Everything else aborts the run.

use marionette_core::Slug;
use marionette_forge::DeprecationStatus;
use thiserror::Error;

/// Errors raised while resolving a manifest.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The release list for a target was exhausted without satisfying the
    /// graph.
    #[error("no version of the required module satisfies {requirement}")]
    NoVersionFound {
        /// The violated requirement, rendered as `source => target (range)`.
        requirement: String,
    },

    /// A required module is flagged deprecated by the registry.
    #[error("module {slug} is {status}")]
    ModuleDeprecated {
        /// The deprecated module.
        slug: Slug,
        /// Its deprecation record.
        status: DeprecationStatus,
    },

    /// Required state was missing where it must be present. Indicates a
    /// programming error, not bad input.
    #[error("resolver state invariant violated: {message}")]
    StateInvariant {
        /// What was missing.
        message: String,
    },

    /// Resolution was cancelled externally.
    #[error("resolution cancelled")]
    Cancelled,

    /// Manifest parsing or materialization failure.
    #[error(transparent)]
    Manifest(#[from] marionette_manifest::ManifestError),

    /// Registry failure.
    #[error(transparent)]
    Forge(#[from] marionette_forge::ForgeError),

    /// Repository failure.
    #[error(transparent)]
    Vcs(#[from] marionette_vcs::VcsError),
}

/// Result alias for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
