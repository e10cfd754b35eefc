//! Dependency resolution for Puppetfile manifests.
//!
//! The resolver seeds a FIFO requirements store from the manifest's
//! top-level modules, then drains it one requirement at a time. Each
//! requirement is checked for deprecation, inserted into the dependency
//! graph, and validated; when the target's current version violates an
//! incoming range, candidate versions are popped off the cached release
//! list until the graph validates again. A version change invalidates the
//! target's subgraph and re-queues its dependents. When the store drains,
//! the graph is walked to emit the resolved manifest.

mod dump;
pub mod error;
mod graph;
mod requirement;
mod resolver;
mod store;

pub use dump::{DUMP_FILE_NAME, DiagnosticDump, write_dump};
pub use error::{ResolveError, Result};
pub use graph::{
    DependencyGraph, EdgeData, EdgeSnapshot, GraphSnapshot, InEdge, NodeId, NodeSnapshot,
};
pub use requirement::{Requirement, RequirementSource};
pub use resolver::{Resolver, ResolverOptions};
pub use store::RequirementsStore;
