//! Manifest error types.

use marionette_core::Slug;
use thiserror::Error;

/// Errors parsing or materializing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A line could not be parsed.
    #[error("manifest syntax error on line {line}: '{text}'")]
    Syntax {
        /// 1-based line number.
        line: usize,
        /// The offending text.
        text: String,
    },

    /// A slug, range, or version inside a declaration is invalid.
    #[error(transparent)]
    Core(#[from] marionette_core::Error),

    /// A forge module is being queried without a configured endpoint.
    #[error("module {slug} has no forge endpoint configured")]
    MissingEndpoint {
        /// The module.
        slug: Slug,
    },

    /// A dependency query needs a selected version and none is set.
    #[error("module {slug} has no version selected")]
    MissingVersion {
        /// The module.
        slug: Slug,
    },

    /// Registry failure.
    #[error(transparent)]
    Forge(#[from] marionette_forge::ForgeError),

    /// Repository failure.
    #[error(transparent)]
    Vcs(#[from] marionette_vcs::VcsError),
}

/// Result alias for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;
