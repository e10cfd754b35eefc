//! `metadata.json` contents.

use crate::error::VcsError;
use semver::Version;
use serde::{Deserialize, Serialize};

/// Raw `metadata.json` shape as serialized in module repositories.
#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: Vec<MetadataDependency>,
}

/// One declared dependency inside `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDependency {
    /// Target module, usually in `author/name` form.
    pub name: String,
    /// Range constraint; absent means any version.
    #[serde(default)]
    pub version_requirement: Option<String>,
}

/// Validated module metadata read from a repository.
#[derive(Debug, Clone)]
pub struct RepoMetadata {
    /// Module name as declared, if any.
    pub name: Option<String>,
    /// Declared module version. Required.
    pub version: Version,
    /// Declared dependencies.
    pub dependencies: Vec<MetadataDependency>,
}

impl RepoMetadata {
    /// Parse and validate metadata text. The `url` is only used for error
    /// context.
    pub fn from_json(url: &str, text: &[u8]) -> Result<Self, VcsError> {
        let raw: RawMetadata =
            serde_json::from_slice(text).map_err(|e| VcsError::MetadataMissing {
                url: url.to_string(),
                reason: format!("invalid JSON: {e}"),
            })?;

        let version_text = raw.version.ok_or_else(|| VcsError::MetadataMissing {
            url: url.to_string(),
            reason: "no 'version' field".to_string(),
        })?;

        let version = Version::parse(&version_text).map_err(|e| VcsError::MetadataMissing {
            url: url.to_string(),
            reason: format!("unparsable version '{version_text}': {e}"),
        })?;

        Ok(Self {
            name: raw.name,
            version,
            dependencies: raw.dependencies,
        })
    }
}
