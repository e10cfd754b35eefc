//! Git repository metadata retrieval.
//!
//! Repository-pinned modules carry their version and dependency list in a
//! top-level `metadata.json`. [`fetch_metadata`] clones the repository
//! anonymously into a scoped temporary directory, optionally checks out a
//! ref, reads the metadata, and releases the checkout — on every exit
//! path, success or failure.

pub mod error;
mod git;
mod metadata;

pub use error::{Result, VcsError};
pub use git::{GitRepository, fetch_metadata};
pub use metadata::{MetadataDependency, RepoMetadata};
