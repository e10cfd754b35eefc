//! Shared parse error types.

use thiserror::Error;

/// Errors produced when parsing core identifiers and constraints.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The text is not a valid `author-name` module slug.
    #[error("invalid module slug '{text}': expected 'author-name' or 'author/name'")]
    InvalidSlug {
        /// The offending text.
        text: String,
    },

    /// The text is not a valid version range.
    #[error("invalid version range '{range}': {reason}")]
    InvalidRange {
        /// The offending range text.
        range: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The text is not a valid semantic version.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The offending version text.
        version: String,
        /// Why parsing failed.
        reason: String,
    },
}

/// Result alias for core parse operations.
pub type Result<T> = std::result::Result<T, Error>;
