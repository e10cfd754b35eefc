//! Forge registry client and metadata cache.
//!
//! The Forge serves module metadata over a small JSON API:
//! - `GET /v3/modules/{author}-{name}` — module record with release list
//!   and deprecation fields
//! - `GET /v3/releases/{author}-{name}-{version}` — one release with its
//!   declared dependencies
//!
//! [`ForgeClient`] performs the HTTP requests; [`ForgeCache`] memoizes the
//! responses for the duration of one resolution run.

mod cache;
mod client;
pub mod error;
mod types;

pub use cache::{CacheSnapshot, ForgeCache};
pub use client::{DEFAULT_FORGE_URL, ForgeClient, ForgeClientConfig};
pub use error::{ForgeError, Result};
pub use types::{
    DependencySpec, DeprecationStatus, ModuleData, ReleaseData, ReleaseMetadata, ReleaseRef,
    SupersededBy,
};
