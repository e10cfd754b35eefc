//! Core types for the Marionette Puppetfile resolver.
//!
//! This crate provides the foundational types shared by every other
//! Marionette crate:
//! - Module slugs (`author-name` identifiers)
//! - Version range constraints and matching
//! - Shared parse error types

pub mod error;
mod range;
mod slug;

pub use error::{Error, Result};
pub use range::VersionRange;
pub use slug::Slug;

// Re-export commonly used types
pub use semver::Version;
