//! Requirements: directed version constraints between modules.

use marionette_core::{Slug, VersionRange};
use marionette_manifest::ModuleDecl;
use std::fmt;

/// Where a requirement came from.
#[derive(Debug, Clone)]
pub enum RequirementSource {
    /// Declared at the manifest's top level.
    Manifest,
    /// Declared as a dependency of another module.
    Dependency(ModuleDecl),
}

impl RequirementSource {
    /// Slug of the source module; `None` for the manifest itself.
    #[must_use]
    pub fn slug(&self) -> Option<&Slug> {
        match self {
            Self::Manifest => None,
            Self::Dependency(module) => Some(module.slug()),
        }
    }

    /// The source module declaration, if any.
    #[must_use]
    pub fn module(&self) -> Option<&ModuleDecl> {
        match self {
            Self::Manifest => None,
            Self::Dependency(module) => Some(module),
        }
    }
}

/// One open constraint: `source` needs `target` within `range`.
///
/// The edge identity of a requirement is
/// `(source_slug ?? "manifest").(target_slug)`; the graph holds at most
/// one edge per identity.
#[derive(Debug, Clone)]
pub struct Requirement {
    /// Where the constraint came from.
    pub source: RequirementSource,
    /// The required module.
    pub target: ModuleDecl,
    /// The range the target's version must satisfy.
    pub range: VersionRange,
}

impl Requirement {
    /// A top-level requirement from the manifest.
    #[must_use]
    pub fn from_manifest(target: ModuleDecl, range: VersionRange) -> Self {
        Self {
            source: RequirementSource::Manifest,
            target,
            range,
        }
    }

    /// A requirement declared by another module.
    #[must_use]
    pub fn from_dependency(source: ModuleDecl, target: ModuleDecl, range: VersionRange) -> Self {
        Self {
            source: RequirementSource::Dependency(source),
            target,
            range,
        }
    }

    /// Slug of the source, or `None` for the manifest.
    #[must_use]
    pub fn source_slug(&self) -> Option<&Slug> {
        self.source.slug()
    }
}

impl fmt::Display for Requirement {
    /// Render as `source => target (range)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source.slug() {
            Some(slug) => write!(f, "{slug}")?,
            None => write!(f, "manifest")?,
        }
        write!(f, " => {} ({})", self.target.slug(), self.range)
    }
}
