//! Module declarations.
//!
//! A [`ModuleDecl`] is one module's identity, kind, selected version, and
//! preserved comment block. Forge modules answer version and dependency
//! queries through the per-run [`ForgeCache`]; repository modules carry
//! the metadata read from their repository at construction time.

use crate::error::ManifestError;
use crate::parser::{ModuleEntry, ParsedManifest, RawDeclaration};
use marionette_core::{Slug, Version, VersionRange};
use marionette_forge::{DependencySpec, DeprecationStatus, ForgeCache};
use marionette_vcs::MetadataDependency;
use tracing::debug;
use url::Url;

/// What kind of module a declaration is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    /// Released through the Forge registry.
    Forge,
    /// Pulled from a version-controlled repository.
    Repo {
        /// Repository URL.
        url: String,
        /// Ref to check out, if declared.
        reference: Option<String>,
    },
}

/// One module's declaration and resolution state.
#[derive(Debug, Clone)]
pub struct ModuleDecl {
    slug: Slug,
    kind: ModuleKind,
    version: Option<Version>,
    forge_endpoint: Option<Url>,
    comments: Vec<String>,
    /// Dependencies from `metadata.json`; repository modules only.
    repo_dependencies: Vec<MetadataDependency>,
}

/// A declared dependency of a module: the target declaration plus the
/// range it must satisfy.
#[derive(Debug, Clone)]
pub struct ModuleDependency {
    /// The required module.
    pub target: ModuleDecl,
    /// The range the target's version must satisfy.
    pub range: VersionRange,
}

impl ModuleDecl {
    /// Materialize a parsed entry.
    ///
    /// Repository modules are cloned immediately and take their version
    /// (and dependency list) from `metadata.json`. Forge modules without a
    /// literal version select the newest release the registry reports.
    pub async fn from_entry(
        entry: &ModuleEntry,
        forge: &Url,
        cache: &ForgeCache,
    ) -> Result<Self, ManifestError> {
        match &entry.declaration {
            RawDeclaration::Forge { slug, version } => {
                let version = match version {
                    Some(text) => {
                        Some(Version::parse(text).map_err(|e| {
                            marionette_core::Error::InvalidVersion {
                                version: text.clone(),
                                reason: e.to_string(),
                            }
                        })?)
                    }
                    None => None,
                };
                Self::forge_module(
                    slug.clone(),
                    version,
                    forge.clone(),
                    entry.comments.clone(),
                    cache,
                )
                .await
            }
            RawDeclaration::Repo {
                slug,
                url,
                reference,
            } => {
                Self::repo_module(
                    slug.clone(),
                    url.clone(),
                    reference.clone(),
                    forge.clone(),
                    entry.comments.clone(),
                )
                .await
            }
        }
    }

    /// Construct a forge module. With no literal version the newest
    /// available release is selected.
    pub async fn forge_module(
        slug: Slug,
        version: Option<Version>,
        forge: Url,
        comments: Vec<String>,
        cache: &ForgeCache,
    ) -> Result<Self, ManifestError> {
        let version = match version {
            Some(version) => Some(version),
            None => {
                let releases = cache.releases(&slug).await?;
                let newest = releases.first().cloned();
                debug!(slug = %slug, version = ?newest, "selected newest available release");
                newest
            }
        };

        Ok(Self {
            slug,
            kind: ModuleKind::Forge,
            version,
            forge_endpoint: Some(forge),
            comments,
            repo_dependencies: Vec::new(),
        })
    }

    /// Construct a repository module, reading `metadata.json` from a
    /// scoped clone. The forge endpoint is kept so the module's declared
    /// dependencies resolve against the manifest's registry.
    pub async fn repo_module(
        slug: Slug,
        url: String,
        reference: Option<String>,
        forge: Url,
        comments: Vec<String>,
    ) -> Result<Self, ManifestError> {
        let metadata = marionette_vcs::fetch_metadata(&url, reference.as_deref()).await?;

        Ok(Self {
            slug,
            kind: ModuleKind::Repo { url, reference },
            version: Some(metadata.version),
            forge_endpoint: Some(forge),
            comments,
            repo_dependencies: metadata.dependencies,
        })
    }

    /// Assemble a declaration from already-known parts, with no metadata
    /// retrieval. Used when rebuilding declarations from resolved state.
    #[must_use]
    pub fn from_parts(
        slug: Slug,
        kind: ModuleKind,
        version: Option<Version>,
        forge: Option<Url>,
        comments: Vec<String>,
    ) -> Self {
        Self {
            slug,
            kind,
            version,
            forge_endpoint: forge,
            comments,
            repo_dependencies: Vec::new(),
        }
    }

    /// The module's slug.
    #[must_use]
    pub const fn slug(&self) -> &Slug {
        &self.slug
    }

    /// The module's kind.
    #[must_use]
    pub const fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    /// True for repository modules.
    #[must_use]
    pub const fn is_repo(&self) -> bool {
        matches!(self.kind, ModuleKind::Repo { .. })
    }

    /// The currently selected version, if any.
    #[must_use]
    pub const fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Replace the selected version.
    pub fn set_version(&mut self, version: Version) {
        self.version = Some(version);
    }

    /// Comment block attached to this declaration.
    #[must_use]
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Available release versions, descending. Empty for repository
    /// modules, which have exactly the version their metadata declares.
    pub async fn available_versions(
        &self,
        cache: &ForgeCache,
    ) -> Result<Vec<Version>, ManifestError> {
        if self.is_repo() {
            return Ok(Vec::new());
        }
        self.require_endpoint()?;
        Ok(cache.releases(&self.slug).await?)
    }

    /// True iff at least one release candidate remains.
    pub async fn has_available_version(&self, cache: &ForgeCache) -> Result<bool, ManifestError> {
        Ok(!self.available_versions(cache).await?.is_empty())
    }

    /// Remove and return the best remaining release candidate.
    pub async fn next_available_version(
        &self,
        cache: &ForgeCache,
    ) -> Result<Option<Version>, ManifestError> {
        if self.is_repo() {
            return Ok(None);
        }
        self.require_endpoint()?;
        Ok(cache.pop_release(&self.slug).await?)
    }

    /// Reinsert a chosen candidate at the head of the release list so it
    /// stays selectable for later queries.
    pub fn push_available_version(&self, cache: &ForgeCache, version: Version) {
        cache.push_release(&self.slug, version);
    }

    /// Materialize this module's declared dependencies at its selected
    /// version. Targets are built as versionless forge declarations, so
    /// each starts at the newest release the registry offers.
    pub async fn dependencies(
        &self,
        cache: &ForgeCache,
    ) -> Result<Vec<ModuleDependency>, ManifestError> {
        let specs: Vec<DependencySpec> = if self.is_repo() {
            self.repo_dependencies
                .iter()
                .map(|dep| DependencySpec {
                    name: dep.name.clone(),
                    version_requirement: dep.version_requirement.clone(),
                })
                .collect()
        } else {
            self.require_endpoint()?;
            let version = self.version.as_ref().ok_or_else(|| {
                ManifestError::MissingVersion {
                    slug: self.slug.clone(),
                }
            })?;
            cache.dependencies(&self.slug, version).await?
        };

        let endpoint = self.endpoint_for_targets()?;
        let mut dependencies = Vec::with_capacity(specs.len());
        for spec in specs {
            let slug =
                Slug::parse(&spec.name).ok_or_else(|| marionette_core::Error::InvalidSlug {
                    text: spec.name.clone(),
                })?;
            let range = match &spec.version_requirement {
                Some(text) => VersionRange::parse(text).map_err(ManifestError::Core)?,
                None => VersionRange::any(),
            };

            let target =
                Self::forge_module(slug, None, endpoint.clone(), Vec::new(), cache).await?;
            dependencies.push(ModuleDependency { target, range });
        }

        Ok(dependencies)
    }

    /// Deprecation status from the registry. Repository modules are never
    /// deprecated.
    pub async fn deprecation_status(
        &self,
        cache: &ForgeCache,
    ) -> Result<Option<DeprecationStatus>, ManifestError> {
        if self.is_repo() {
            return Ok(None);
        }
        self.require_endpoint()?;
        Ok(cache.deprecation_status(&self.slug).await?)
    }

    fn require_endpoint(&self) -> Result<&Url, ManifestError> {
        self.forge_endpoint
            .as_ref()
            .ok_or_else(|| ManifestError::MissingEndpoint {
                slug: self.slug.clone(),
            })
    }

    /// Endpoint used when constructing dependency targets. Repository
    /// modules resolve their dependencies against the default Forge
    /// unless an endpoint was set explicitly.
    fn endpoint_for_targets(&self) -> Result<Url, ManifestError> {
        if let Some(endpoint) = &self.forge_endpoint {
            return Ok(endpoint.clone());
        }
        Ok(Url::parse(marionette_forge::DEFAULT_FORGE_URL).expect("default forge URL is valid"))
    }
}

/// A materialized manifest: every declaration turned into a module.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Forge endpoint.
    pub forge: Url,
    /// Top-level modules in declaration order.
    pub top_level: Vec<ModuleDecl>,
    /// Pre-resolved dependent modules from a previous run.
    pub dependent: Vec<ModuleDecl>,
}

impl Manifest {
    /// Materialize every entry of a parsed manifest.
    pub async fn materialize(
        parsed: &ParsedManifest,
        cache: &ForgeCache,
    ) -> Result<Self, ManifestError> {
        let mut top_level = Vec::with_capacity(parsed.top_level.len());
        for entry in &parsed.top_level {
            top_level.push(ModuleDecl::from_entry(entry, &parsed.forge, cache).await?);
        }

        let mut dependent = Vec::with_capacity(parsed.dependent.len());
        for entry in &parsed.dependent {
            dependent.push(ModuleDecl::from_entry(entry, &parsed.forge, cache).await?);
        }

        Ok(Self {
            forge: parsed.forge.clone(),
            top_level,
            dependent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn cache_for(server: &MockServer) -> (Url, ForgeCache) {
        let endpoint = Url::parse(&server.uri()).unwrap();
        let client = marionette_forge::ForgeClient::new(endpoint.clone()).unwrap();
        (endpoint, ForgeCache::new(client))
    }

    fn slug(text: &str) -> Slug {
        Slug::parse(text).unwrap()
    }

    #[tokio::test]
    async fn versionless_forge_module_takes_newest_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/modules/acme-thing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "releases": [{"version": "3.1.0"}, {"version": "3.0.0"}],
            })))
            .mount(&server)
            .await;

        let (endpoint, cache) = cache_for(&server).await;
        let module =
            ModuleDecl::forge_module(slug("acme-thing"), None, endpoint, Vec::new(), &cache)
                .await
                .unwrap();
        assert_eq!(module.version(), Some(&Version::new(3, 1, 0)));
    }

    #[tokio::test]
    async fn pinned_forge_module_skips_the_registry() {
        let server = MockServer::start().await;
        // No mocks mounted: a registry request would fail the test.
        let (endpoint, cache) = cache_for(&server).await;
        let module = ModuleDecl::forge_module(
            slug("acme-pinned"),
            Some(Version::new(1, 2, 3)),
            endpoint,
            Vec::new(),
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(module.version(), Some(&Version::new(1, 2, 3)));
    }

    #[tokio::test]
    async fn dependencies_materialize_targets_at_newest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/releases/acme-parent-1.0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"dependencies": [
                    {"name": "acme/child", "version_requirement": ">= 0.5.0"},
                    {"name": "acme/loose"},
                ]},
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/modules/acme-child"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "releases": [{"version": "0.9.0"}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/modules/acme-loose"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "releases": [{"version": "2.0.0"}],
            })))
            .mount(&server)
            .await;

        let (endpoint, cache) = cache_for(&server).await;
        let module = ModuleDecl::forge_module(
            slug("acme-parent"),
            Some(Version::new(1, 0, 0)),
            endpoint,
            Vec::new(),
            &cache,
        )
        .await
        .unwrap();

        let deps = module.dependencies(&cache).await.unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].target.slug().as_str(), "acme-child");
        assert_eq!(deps[0].target.version(), Some(&Version::new(0, 9, 0)));
        assert!(!deps[0].range.is_any());
        assert!(deps[1].range.is_any());
    }

    #[tokio::test]
    async fn release_set_operations_go_through_the_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/modules/acme-versions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "releases": [{"version": "2.0.0"}, {"version": "1.0.0"}],
            })))
            .mount(&server)
            .await;

        let (endpoint, cache) = cache_for(&server).await;
        let module =
            ModuleDecl::forge_module(slug("acme-versions"), None, endpoint, Vec::new(), &cache)
                .await
                .unwrap();

        assert!(module.has_available_version(&cache).await.unwrap());
        let first = module.next_available_version(&cache).await.unwrap();
        assert_eq!(first, Some(Version::new(2, 0, 0)));
        assert_eq!(
            module.available_versions(&cache).await.unwrap(),
            vec![Version::new(1, 0, 0)]
        );

        module.push_available_version(&cache, Version::new(2, 0, 0));
        assert_eq!(
            module.available_versions(&cache).await.unwrap(),
            vec![Version::new(2, 0, 0), Version::new(1, 0, 0)]
        );
    }
}
