//! The dependency graph.
//!
//! A directed graph with one node per referenced module slug plus the
//! `manifest` node, and one edge per requirement identity. Node weights
//! hold the module declarations; edge weights hold the declared range.
//!
//! Built on `petgraph`'s `StableDiGraph` so node removal during subgraph
//! invalidation keeps the remaining indices stable.

use crate::error::{ResolveError, Result};
use marionette_core::{Slug, Version, VersionRange};
use marionette_manifest::ModuleDecl;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Identity of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// The manifest itself.
    Manifest,
    /// A module node.
    Module(Slug),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest => write!(f, "manifest"),
            Self::Module(slug) => write!(f, "{slug}"),
        }
    }
}

#[derive(Debug)]
struct Node {
    id: NodeId,
    module: Option<ModuleDecl>,
}

/// Attributes carried by one requirement edge.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// The range the edge's target must satisfy.
    pub range: VersionRange,
}

/// One incoming edge of a node, as seen by the resolver.
#[derive(Debug, Clone)]
pub struct InEdge {
    /// Source node identity.
    pub source: NodeId,
    /// Source module declaration; `None` for the manifest node.
    pub source_module: Option<ModuleDecl>,
    /// Declared range.
    pub range: VersionRange,
}

/// Directed graph of modules and version-constrained requirement edges.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: StableDiGraph<Node, EdgeData>,
    index: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every node and edge.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.index.clear();
    }

    /// Number of module nodes (the manifest node is not counted).
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.index
            .keys()
            .filter(|id| matches!(id, NodeId::Module(_)))
            .count()
    }

    /// Add the manifest node if absent.
    pub fn ensure_manifest(&mut self) {
        if !self.index.contains_key(&NodeId::Manifest) {
            let idx = self.graph.add_node(Node {
                id: NodeId::Manifest,
                module: None,
            });
            self.index.insert(NodeId::Manifest, idx);
        }
    }

    /// Add a module node if absent. An existing node keeps its current
    /// declaration (and thus its selected version).
    pub fn ensure_module(&mut self, module: &ModuleDecl) {
        let id = NodeId::Module(module.slug().clone());
        if !self.index.contains_key(&id) {
            let idx = self.graph.add_node(Node {
                id: id.clone(),
                module: Some(module.clone()),
            });
            self.index.insert(id, idx);
        }
    }

    /// True iff a node exists for the slug.
    #[must_use]
    pub fn has_module(&self, slug: &Slug) -> bool {
        self.index.contains_key(&NodeId::Module(slug.clone()))
    }

    /// The module declaration stored on a node.
    #[must_use]
    pub fn module(&self, slug: &Slug) -> Option<&ModuleDecl> {
        let idx = self.index.get(&NodeId::Module(slug.clone()))?;
        self.graph[*idx].module.as_ref()
    }

    /// Overwrite the selected version on a node's declaration.
    pub fn set_module_version(&mut self, slug: &Slug, version: Version) {
        if let Some(idx) = self.index.get(&NodeId::Module(slug.clone()))
            && let Some(module) = self.graph[*idx].module.as_mut()
        {
            module.set_version(version);
        }
    }

    /// Add an edge if no edge with that identity exists yet. Both
    /// endpoints must already be present.
    pub fn add_edge(&mut self, source: &NodeId, target: &Slug, data: EdgeData) -> Result<bool> {
        let from = self.node_index(source)?;
        let to = self.node_index(&NodeId::Module(target.clone()))?;

        if self.graph.find_edge(from, to).is_some() {
            return Ok(false);
        }
        self.graph.add_edge(from, to, data);
        Ok(true)
    }

    /// True iff an edge with the given identity exists.
    #[must_use]
    pub fn has_edge(&self, source: &NodeId, target: &Slug) -> bool {
        let Some(from) = self.index.get(source) else {
            return false;
        };
        let Some(to) = self.index.get(&NodeId::Module(target.clone())) else {
            return false;
        };
        self.graph.find_edge(*from, *to).is_some()
    }

    /// Incoming edges of a module node.
    #[must_use]
    pub fn in_edges(&self, slug: &Slug) -> Vec<InEdge> {
        let Some(&idx) = self.index.get(&NodeId::Module(slug.clone())) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| {
                let source = &self.graph[edge.source()];
                InEdge {
                    source: source.id.clone(),
                    source_module: source.module.clone(),
                    range: edge.weight().range.clone(),
                }
            })
            .collect()
    }

    /// Slugs of the modules a node points at.
    #[must_use]
    pub fn out_neighbors(&self, slug: &Slug) -> Vec<Slug> {
        let Some(&idx) = self.index.get(&NodeId::Module(slug.clone())) else {
            return Vec::new();
        };

        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .filter_map(|n| match &self.graph[n].id {
                NodeId::Module(s) => Some(s.clone()),
                NodeId::Manifest => None,
            })
            .collect()
    }

    /// Remove a module node and every edge touching it.
    pub fn drop_module(&mut self, slug: &Slug) {
        let id = NodeId::Module(slug.clone());
        if let Some(idx) = self.index.remove(&id) {
            self.graph.remove_node(idx);
        }
    }

    /// Check a node against its incoming ranges.
    ///
    /// A module with no selected version is trivially valid, as is a slug
    /// with no node.
    #[must_use]
    pub fn is_valid(&self, slug: &Slug) -> bool {
        let Some(&idx) = self.index.get(&NodeId::Module(slug.clone())) else {
            return true;
        };
        let Some(version) = self.graph[idx].module.as_ref().and_then(ModuleDecl::version)
        else {
            return true;
        };

        self.graph
            .edges_directed(idx, Direction::Incoming)
            .all(|edge| edge.weight().range.matches(version))
    }

    /// True iff every node currently present validates.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.module_nodes()
            .all(|(slug, _)| self.is_valid(slug))
    }

    /// True iff the node has an incoming edge from the manifest.
    #[must_use]
    pub fn has_manifest_edge(&self, slug: &Slug) -> bool {
        self.has_edge(&NodeId::Manifest, slug)
    }

    /// Iterate module nodes and their declarations.
    pub fn module_nodes(&self) -> impl Iterator<Item = (&Slug, &ModuleDecl)> {
        self.graph.node_weights().filter_map(|node| match &node.id {
            NodeId::Module(slug) => node.module.as_ref().map(|module| (slug, module)),
            NodeId::Manifest => None,
        })
    }

    /// Serializable snapshot for diagnostic dumps. Nodes carry string
    /// ids; edges reference those ids, so cycles in the module structure
    /// cannot recurse.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<NodeSnapshot> = self
            .graph
            .node_weights()
            .map(|node| NodeSnapshot {
                id: node.id.to_string(),
                version: node
                    .module
                    .as_ref()
                    .and_then(ModuleDecl::version)
                    .map(ToString::to_string),
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut edges: Vec<EdgeSnapshot> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some(EdgeSnapshot {
                    source: self.graph[from].id.to_string(),
                    target: self.graph[to].id.to_string(),
                    range: self.graph[e].range.to_string(),
                })
            })
            .collect();
        edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

        GraphSnapshot { nodes, edges }
    }

    fn node_index(&self, id: &NodeId) -> Result<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ResolveError::StateInvariant {
                message: format!("graph node '{id}' referenced before creation"),
            })
    }
}

/// Serializable node record.
#[derive(Debug, Serialize)]
pub struct NodeSnapshot {
    /// Node id (`manifest` or a slug).
    pub id: String,
    /// Selected version, if any.
    pub version: Option<String>,
}

/// Serializable edge record; endpoints reference node ids.
#[derive(Debug, Serialize)]
pub struct EdgeSnapshot {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Declared range.
    pub range: String,
}

/// Serializable graph snapshot.
#[derive(Debug, Serialize)]
pub struct GraphSnapshot {
    /// All nodes, sorted by id.
    pub nodes: Vec<NodeSnapshot>,
    /// All edges, sorted by endpoints.
    pub edges: Vec<EdgeSnapshot>,
}
