//! Persisted shape of a stream graph.
//!
//! A [`Snapshot`] is the full serializable state: the registry as ordered
//! `(id, stream)` pairs, the graph's node and edge lists, and the optional
//! output stream id. Saving is an explicit step the caller takes after a
//! mutation; nothing in the engine writes to disk on its own.

use std::path::Path;

use serde::{Deserialize, Serialize};

use rivulet_types::{Result, Stream, StreamId};

use crate::graph::{DagEdge, DagNode, StreamGraph};
use crate::registry::StreamRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub streams: Vec<(StreamId, Stream)>,
    pub nodes: Vec<DagNode>,
    pub edges: Vec<DagEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_stream_id: Option<StreamId>,
}

impl Snapshot {
    pub fn capture(registry: &StreamRegistry, graph: &StreamGraph) -> Self {
        Self {
            streams: registry.entries(),
            nodes: graph.all_nodes().to_vec(),
            edges: graph.all_edges().to_vec(),
            output_stream_id: graph.output_stream_id().cloned(),
        }
    }

    /// Rebuild the registry and graph. Node and edge lists are restored
    /// verbatim, dangling references included.
    pub fn restore(self) -> Result<(StreamRegistry, StreamGraph)> {
        let registry = StreamRegistry::from_entries(self.streams)?;
        let graph = StreamGraph::from_parts(self.nodes, self.edges, self.output_stream_id);
        Ok((registry, graph))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the snapshot as JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::debug!(path = %path.display(), streams = self.streams.len(), "Snapshot saved");
        Ok(())
    }

    /// Read a snapshot. Returns `Ok(None)` when no file exists at `path`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&json).inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Snapshot could not be parsed");
        })?;
        Ok(Some(snapshot))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
