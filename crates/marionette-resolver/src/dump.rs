//! Diagnostic dumps for failed resolutions.
//!
//! On a fatal error the resolver's cache contents and graph are written
//! as JSON for offline analysis. Nodes are serialized as a flat list with
//! string ids and edges reference those ids, so the module/requirement
//! reference cycles in the live structures cannot recurse.

use crate::graph::GraphSnapshot;
use marionette_forge::CacheSnapshot;
use serde::Serialize;
use std::io;
use std::path::Path;

/// Default file name of the diagnostic dump.
pub const DUMP_FILE_NAME: &str = "errorDump.js";

/// The serialized diagnostic payload.
#[derive(Debug, Serialize)]
pub struct DiagnosticDump {
    /// Forge cache contents at failure time.
    #[serde(rename = "forgeCache")]
    pub forge_cache: CacheSnapshot,
    /// Dependency graph at failure time.
    #[serde(rename = "dependencyGraph")]
    pub dependency_graph: GraphSnapshot,
}

/// Write a diagnostic dump to `path` as pretty-printed JSON.
pub fn write_dump(path: &Path, dump: &DiagnosticDump) -> io::Result<()> {
    let text = serde_json::to_string_pretty(dump)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, text)
}
