//! Wire types for the Forge v3 API.

use marionette_core::Slug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Module record from `GET /v3/modules/{author}-{name}`.
///
/// Only the fields the resolver consumes are modeled; everything else in
/// the payload is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleData {
    /// Module slug as reported by the registry.
    #[serde(default)]
    pub slug: Option<String>,
    /// Releases in registry order (descending by version).
    #[serde(default)]
    pub releases: Vec<ReleaseRef>,
    /// Set when the module has been deprecated.
    #[serde(default)]
    pub deprecated_at: Option<String>,
    /// Deprecation reason.
    #[serde(default)]
    pub deprecated_for: Option<String>,
    /// Module superseding this one, if any.
    #[serde(default)]
    pub superseded_by: Option<SupersededBy>,
}

/// One release entry inside a module record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRef {
    /// Version string.
    pub version: String,
}

/// The `superseded_by` object of a deprecated module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupersededBy {
    /// Slug of the superseding module.
    pub slug: String,
}

/// Release record from `GET /v3/releases/{author}-{name}-{version}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseData {
    /// Release slug as reported by the registry.
    #[serde(default)]
    pub slug: Option<String>,
    /// Release metadata.
    #[serde(default)]
    pub metadata: ReleaseMetadata,
}

/// The `metadata` object of a release record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    /// Declared dependencies.
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

/// One declared dependency of a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Target module, usually in `author/name` form.
    pub name: String,
    /// Range constraint; absent means any version.
    #[serde(default)]
    pub version_requirement: Option<String>,
}

/// Deprecation record derived from module metadata.
///
/// A module is deprecated iff its metadata carries `deprecated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeprecationStatus {
    /// When the module was deprecated, as reported by the registry.
    pub deprecated_at: String,
    /// Deprecation reason.
    pub deprecated_for: Option<String>,
    /// Module superseding this one.
    pub superseded_by: Option<Slug>,
}

impl fmt::Display for DeprecationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deprecated at {}", self.deprecated_at)?;
        if let Some(superseded) = &self.superseded_by {
            write!(f, " and superseded by {superseded}")?;
        }
        if let Some(reason) = &self.deprecated_for {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

impl ModuleData {
    /// Derive the deprecation status of this module, if any.
    #[must_use]
    pub fn deprecation_status(&self) -> Option<DeprecationStatus> {
        self.deprecated_at
            .as_ref()
            .map(|deprecated_at| DeprecationStatus {
                deprecated_at: deprecated_at.clone(),
                deprecated_for: self.deprecated_for.clone(),
                superseded_by: self
                    .superseded_by
                    .as_ref()
                    .and_then(|s| Slug::parse(&s.slug)),
            })
    }
}
