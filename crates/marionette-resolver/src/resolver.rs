//! The resolution driver.

use crate::dump::DiagnosticDump;
use crate::error::{ResolveError, Result};
use crate::graph::{DependencyGraph, EdgeData, NodeId};
use crate::requirement::{Requirement, RequirementSource};
use crate::store::RequirementsStore;
use marionette_core::{Slug, Version};
use marionette_forge::{ForgeCache, ForgeClient, ForgeClientConfig};
use marionette_manifest::{
    DEFAULT_DEPENDENCY_SENTINEL, Manifest, ModuleDecl, ParsedManifest, ResolvedManifest,
};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Slugs omitted from the emitted manifest.
    pub hide: HashSet<Slug>,
    /// Slugs whose deprecation and no-version-found errors are demoted to
    /// warnings.
    pub ignore: HashSet<Slug>,
    /// Preamble block placed above the emitted module list.
    pub preamble: Option<String>,
    /// Sentinel line separating top-level from dependent modules.
    pub dependency_sentinel: String,
    /// Cooperative cancellation, checked between requirements.
    pub cancellation: Option<CancellationToken>,
    /// Forge HTTP client configuration.
    pub client_config: ForgeClientConfig,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            hide: HashSet::new(),
            ignore: HashSet::new(),
            preamble: None,
            dependency_sentinel: DEFAULT_DEPENDENCY_SENTINEL.to_string(),
            cancellation: None,
            client_config: ForgeClientConfig::default(),
        }
    }
}

/// Resolves one parsed manifest.
///
/// Owns all per-run state: the forge cache, the dependency graph, and the
/// requirements store. Construct a fresh resolver per run; there is no
/// shared global state to reset.
#[derive(Debug)]
pub struct Resolver {
    parsed: ParsedManifest,
    options: ResolverOptions,
    cache: ForgeCache,
    graph: DependencyGraph,
    store: RequirementsStore,
}

impl Resolver {
    /// Create a resolver for a parsed manifest.
    pub fn new(parsed: ParsedManifest, options: ResolverOptions) -> Result<Self> {
        let client = ForgeClient::with_config(parsed.forge.clone(), options.client_config.clone())
            .map_err(ResolveError::Forge)?;

        Ok(Self {
            parsed,
            options,
            cache: ForgeCache::new(client),
            graph: DependencyGraph::new(),
            store: RequirementsStore::new(),
        })
    }

    /// Run the resolution to completion and produce the resolved manifest.
    pub async fn run(&mut self) -> Result<ResolvedManifest> {
        // Fresh state per run.
        self.cache = ForgeCache::new(self.cache.client().clone());
        self.graph.clear();
        self.store = RequirementsStore::new();

        let manifest = Manifest::materialize(&self.parsed, &self.cache).await?;
        let input_top: HashSet<Slug> = manifest
            .top_level
            .iter()
            .map(|module| module.slug().clone())
            .collect();

        self.store = RequirementsStore::from_manifest(&manifest);
        info!(seeded = self.store.len(), "requirements seeded from manifest");

        while let Some(requirement) = self.store.next() {
            if let Some(token) = &self.options.cancellation
                && token.is_cancelled()
            {
                return Err(ResolveError::Cancelled);
            }
            self.process(requirement).await?;
        }

        self.emit(&input_top)
    }

    /// Snapshot of the cache and graph for the diagnostic dump.
    #[must_use]
    pub fn diagnostic_dump(&self) -> DiagnosticDump {
        DiagnosticDump {
            forge_cache: self.cache.error_information(),
            dependency_graph: self.graph.snapshot(),
        }
    }

    /// Process one dequeued requirement: deprecation checks, graph
    /// insertion, version selection, application.
    async fn process(&mut self, mut requirement: Requirement) -> Result<()> {
        let target_slug = requirement.target.slug().clone();
        debug!(requirement = %requirement, queued = self.store.len(), "processing requirement");

        if let Some(source) = requirement.source.module() {
            self.check_deprecation(source).await?;
        }
        self.check_deprecation(&requirement.target).await?;

        // Graph insertion: both nodes, then the edge, at most one edge
        // per (source, target) identity.
        let source_id = match &requirement.source {
            RequirementSource::Manifest => {
                self.graph.ensure_manifest();
                NodeId::Manifest
            }
            RequirementSource::Dependency(module) => {
                self.graph.ensure_module(module);
                NodeId::Module(module.slug().clone())
            }
        };
        self.graph.ensure_module(&requirement.target);
        self.graph.add_edge(
            &source_id,
            &target_slug,
            EdgeData {
                range: requirement.range.clone(),
            },
        )?;

        let old_version = self
            .graph
            .module(&target_slug)
            .and_then(|module| module.version().cloned());

        let selected = if old_version.is_some() && self.graph.is_valid(&target_slug) {
            old_version.clone()
        } else {
            self.select_version(&requirement, &target_slug).await?
        };

        let Some(new_version) = selected else {
            if self.options.ignore.contains(&target_slug) {
                warn!(requirement = %requirement, "no satisfying version, module is ignored");
                return Ok(());
            }
            return Err(ResolveError::NoVersionFound {
                requirement: requirement.to_string(),
            });
        };

        if old_version.as_ref() == Some(&new_version) {
            self.enqueue_dependencies(&mut requirement, &target_slug, new_version)
                .await
        } else {
            self.apply_version_change(&requirement, &target_slug, &old_version, new_version);
            Ok(())
        }
    }

    /// Pop release candidates until the graph validates the target.
    ///
    /// The chosen candidate is pushed back onto the cached release list so
    /// later queries still see it as the best available version.
    async fn select_version(
        &mut self,
        requirement: &Requirement,
        slug: &Slug,
    ) -> Result<Option<Version>> {
        while let Some(candidate) = requirement
            .target
            .next_available_version(&self.cache)
            .await
            .map_err(ResolveError::Manifest)?
        {
            self.graph.set_module_version(slug, candidate.clone());
            if self.graph.is_valid(slug) {
                debug!(slug = %slug, version = %candidate, "version selected");
                requirement
                    .target
                    .push_available_version(&self.cache, candidate.clone());
                return Ok(Some(candidate));
            }
            debug!(slug = %slug, version = %candidate, "candidate rejected");
        }

        Ok(None)
    }

    /// Unchanged version: discover the target's dependencies and enqueue
    /// the ones whose edges are not yet recorded. A dependency whose
    /// target already has a graph node is rebound to that node's
    /// declaration so pending requirements agree on the current version.
    async fn enqueue_dependencies(
        &mut self,
        requirement: &mut Requirement,
        target_slug: &Slug,
        version: Version,
    ) -> Result<()> {
        requirement.target.set_version(version);

        let dependencies = requirement
            .target
            .dependencies(&self.cache)
            .await
            .map_err(ResolveError::Manifest)?;

        let source_id = NodeId::Module(target_slug.clone());
        for dependency in dependencies {
            let dep_slug = dependency.target.slug().clone();
            if self.graph.has_edge(&source_id, &dep_slug) {
                continue;
            }

            let target = self
                .graph
                .module(&dep_slug)
                .cloned()
                .unwrap_or(dependency.target);

            debug!(source = %target_slug, target = %dep_slug, range = %dependency.range,
                "dependency discovered");
            self.store.add(Requirement::from_dependency(
                requirement.target.clone(),
                target,
                dependency.range,
            ));
        }

        Ok(())
    }

    /// Changed version: propagate the new version to pending
    /// requirements, invalidate the target's now-stale subgraph, and
    /// re-queue a replacement requirement for every dependent edge.
    fn apply_version_change(
        &mut self,
        requirement: &Requirement,
        target_slug: &Slug,
        old_version: &Option<Version>,
        new_version: Version,
    ) {
        info!(slug = %target_slug, old = ?old_version.as_ref().map(ToString::to_string),
            new = %new_version, "module version changed");

        self.store.update_target_version(target_slug, &new_version);
        self.invalidate_orphans(target_slug);
        self.store.delete_source_requirements(target_slug);

        let mut updated = requirement.target.clone();
        updated.set_version(new_version);

        for in_edge in self.graph.in_edges(target_slug) {
            let source = match in_edge.source_module {
                Some(module) => RequirementSource::Dependency(module),
                None => RequirementSource::Manifest,
            };
            self.store.add(Requirement {
                source,
                target: updated.clone(),
                range: in_edge.range,
            });
        }

        // The next dequeue of a replacement requirement re-adds the node
        // at its new version.
        self.graph.drop_module(target_slug);
    }

    /// Drop every out-edge target that has no inbound edge from another
    /// source, transitively.
    fn invalidate_orphans(&mut self, root: &Slug) {
        let mut visited = HashSet::new();
        visited.insert(root.clone());
        self.invalidate_orphans_from(root, &mut visited);
    }

    fn invalidate_orphans_from(&mut self, node: &Slug, visited: &mut HashSet<Slug>) {
        for neighbor in self.graph.out_neighbors(node) {
            if !visited.insert(neighbor.clone()) {
                continue;
            }

            let has_other_source = self.graph.in_edges(&neighbor).iter().any(
                |edge| !matches!(&edge.source, NodeId::Module(source) if source == node),
            );
            if has_other_source {
                continue;
            }

            self.invalidate_orphans_from(&neighbor, visited);
            debug!(slug = %neighbor, "dropping invalidated subgraph node");
            self.graph.drop_module(&neighbor);
            self.store.delete_source_requirements(&neighbor);
        }
    }

    /// Fail on a deprecated module unless its slug is ignore-listed, in
    /// which case the hit is logged and processing continues.
    async fn check_deprecation(&self, module: &ModuleDecl) -> Result<()> {
        let status = module
            .deprecation_status(&self.cache)
            .await
            .map_err(ResolveError::Manifest)?;
        let Some(status) = status else {
            return Ok(());
        };

        let slug = module.slug().clone();
        if self.options.ignore.contains(&slug) {
            warn!(slug = %slug, status = %status, "using deprecated module");
            return Ok(());
        }

        Err(ResolveError::ModuleDeprecated { slug, status })
    }

    /// Walk the graph into the output manifest. A node lands in the
    /// top-level list iff its slug was in the input's top level or it has
    /// an inbound manifest edge; everything else is a dependent module.
    fn emit(&self, input_top: &HashSet<Slug>) -> Result<ResolvedManifest> {
        let mut top_level = Vec::new();
        let mut dependent = Vec::new();

        for (slug, module) in self.graph.module_nodes() {
            if self.options.hide.contains(slug) {
                continue;
            }
            if input_top.contains(slug) || self.graph.has_manifest_edge(slug) {
                top_level.push(module.clone());
            } else {
                dependent.push(module.clone());
            }
        }

        info!(
            top_level = top_level.len(),
            dependent = dependent.len(),
            "resolution complete"
        );

        Ok(ResolvedManifest {
            forge: self.parsed.forge.clone(),
            preamble: self.options.preamble.clone(),
            top_level,
            dependent,
            dependency_sentinel: self.options.dependency_sentinel.clone(),
        })
    }
}
