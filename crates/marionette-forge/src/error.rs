//! Forge error types.

use thiserror::Error;

/// Errors talking to the Forge registry.
///
/// Transport errors are fatal: the resolver does not retry registry
/// requests.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("forge unavailable at {url}: {source}")]
    Unavailable {
        /// The request URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The registry answered with a non-success status.
    #[error("forge request {url} failed with status {status}")]
    Status {
        /// The request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("forge response from {url} could not be decoded: {reason}")]
    Decode {
        /// The request URL.
        url: String,
        /// Decode failure detail.
        reason: String,
    },

    /// The client configuration is unusable.
    #[error("invalid forge client configuration: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },
}

/// Result alias for forge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;
