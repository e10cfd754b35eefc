//! Per-run memoization of Forge lookups.

use crate::client::ForgeClient;
use crate::error::Result;
use crate::types::{DependencySpec, DeprecationStatus, ModuleData};
use dashmap::DashMap;
use marionette_core::Slug;
use semver::Version;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Cache of Forge responses for one resolution run.
///
/// Three maps: raw module records, release lists, and per-release
/// dependency lists. The release list for a module is mutable state: the
/// resolver pops candidates off the head while backtracking and pushes the
/// chosen version back once the graph validates.
///
/// Constructed fresh at the start of every resolution run; never shared
/// between runs.
#[derive(Debug)]
pub struct ForgeCache {
    client: ForgeClient,
    module_data: DashMap<Slug, ModuleData>,
    releases: DashMap<Slug, Vec<Version>>,
    release_dependencies: DashMap<(Slug, Version), Vec<DependencySpec>>,
}

impl ForgeCache {
    /// Create an empty cache backed by the given client.
    #[must_use]
    pub fn new(client: ForgeClient) -> Self {
        Self {
            client,
            module_data: DashMap::new(),
            releases: DashMap::new(),
            release_dependencies: DashMap::new(),
        }
    }

    /// The client this cache fetches through.
    #[must_use]
    pub const fn client(&self) -> &ForgeClient {
        &self.client
    }

    /// Raw module record, fetched once per slug.
    pub async fn module_data(&self, slug: &Slug) -> Result<ModuleData> {
        if let Some(data) = self.module_data.get(slug) {
            return Ok(data.clone());
        }

        let data = self.client.module(slug).await?;
        self.module_data.insert(slug.clone(), data.clone());
        Ok(data)
    }

    /// Available releases for a module, in registry order (descending by
    /// version). The returned list reflects any candidates discarded so
    /// far in this run.
    pub async fn releases(&self, slug: &Slug) -> Result<Vec<Version>> {
        if let Some(releases) = self.releases.get(slug) {
            return Ok(releases.clone());
        }

        let data = self.module_data(slug).await?;
        let mut releases = Vec::with_capacity(data.releases.len());
        for release in &data.releases {
            match Version::parse(&release.version) {
                Ok(version) => releases.push(version),
                Err(e) => {
                    warn!(slug = %slug, version = %release.version, error = %e,
                        "skipping unparsable release version");
                }
            }
        }

        debug!(slug = %slug, count = releases.len(), "release list cached");
        self.releases.insert(slug.clone(), releases.clone());
        Ok(releases)
    }

    /// Replace the cached release list for a module.
    pub fn update_available_releases(&self, slug: &Slug, releases: Vec<Version>) {
        self.releases.insert(slug.clone(), releases);
    }

    /// Remove and return the head of the release list (the current best
    /// candidate). Loads the list first when it has not been fetched yet.
    pub async fn pop_release(&self, slug: &Slug) -> Result<Option<Version>> {
        self.releases(slug).await?;
        Ok(self
            .releases
            .get_mut(slug)
            .and_then(|mut releases| if releases.is_empty() {
                None
            } else {
                Some(releases.remove(0))
            }))
    }

    /// Reinsert a version at the head of the release list.
    pub fn push_release(&self, slug: &Slug, version: Version) {
        self.releases
            .entry(slug.clone())
            .or_default()
            .insert(0, version);
    }

    /// Deprecation status for a module, derived from its record.
    pub async fn deprecation_status(&self, slug: &Slug) -> Result<Option<DeprecationStatus>> {
        Ok(self.module_data(slug).await?.deprecation_status())
    }

    /// Declared dependencies of one release, fetched once per
    /// `(slug, version)`. Missing dependency metadata yields an empty list.
    pub async fn dependencies(
        &self,
        slug: &Slug,
        version: &Version,
    ) -> Result<Vec<DependencySpec>> {
        let key = (slug.clone(), version.clone());
        if let Some(dependencies) = self.release_dependencies.get(&key) {
            return Ok(dependencies.clone());
        }

        let release = self.client.release(slug, version).await?;
        let dependencies = release.metadata.dependencies;
        self.release_dependencies.insert(key, dependencies.clone());
        Ok(dependencies)
    }

    /// Snapshot of everything cached, for diagnostic dumps.
    #[must_use]
    pub fn error_information(&self) -> CacheSnapshot {
        CacheSnapshot {
            module_data: self
                .module_data
                .iter()
                .map(|entry| (entry.key().to_string(), entry.value().clone()))
                .collect(),
            releases: self
                .releases
                .iter()
                .map(|entry| {
                    (
                        entry.key().to_string(),
                        entry.value().iter().map(ToString::to_string).collect(),
                    )
                })
                .collect(),
            release_dependencies: self
                .release_dependencies
                .iter()
                .map(|entry| {
                    let (slug, version) = entry.key();
                    (format!("{slug}-{version}"), entry.value().clone())
                })
                .collect(),
        }
    }
}

/// Serializable snapshot of the cache contents.
#[derive(Debug, Serialize)]
pub struct CacheSnapshot {
    /// Module records by slug.
    #[serde(rename = "moduleData")]
    pub module_data: BTreeMap<String, ModuleData>,
    /// Release lists by slug.
    pub releases: BTreeMap<String, Vec<String>>,
    /// Dependency lists by `slug-version`.
    #[serde(rename = "releaseDependencies")]
    pub release_dependencies: BTreeMap<String, Vec<DependencySpec>>,
}
