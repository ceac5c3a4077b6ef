use serde::{Deserialize, Serialize};

use rivulet_types::{Stream, StreamId};

/// Kind tag carried by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Source,
    Transform,
}

impl NodeKind {
    pub fn of(stream: &Stream) -> Self {
        if stream.is_source() {
            NodeKind::Source
        } else {
            NodeKind::Transform
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNode {
    pub id: StreamId,
    pub kind: NodeKind,
}

impl DagNode {
    pub fn for_stream(stream: &Stream) -> Self {
        Self {
            id: stream.id.clone(),
            kind: NodeKind::of(stream),
        }
    }
}

/// Producer → consumer link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagEdge {
    /// Derived from the endpoint pair, see [`DagEdge::edge_id`].
    pub id: String,
    pub source: StreamId,
    pub target: StreamId,
}

impl DagEdge {
    pub fn new(source: StreamId, target: StreamId) -> Self {
        Self {
            id: Self::edge_id(&source, &target),
            source,
            target,
        }
    }

    /// Deterministic edge id: one id per (source, target) pair.
    pub fn edge_id(source: &StreamId, target: &StreamId) -> String {
        format!("{source}->{target}")
    }

    pub fn connects(&self, source: &StreamId, target: &StreamId) -> bool {
        &self.source == source && &self.target == target
    }

    pub fn touches(&self, id: &StreamId) -> bool {
        &self.source == id || &self.target == id
    }
}

/// Pipeline topology: nodes reference streams by id, edges link them, and an
/// optional output stream marks the end of the pipeline.
///
/// The graph never owns stream definitions (see
/// [`StreamRegistry`](crate::StreamRegistry)) and does not reject dangling
/// edges; those are reported by [`validate`](crate::validate).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamGraph {
    nodes: Vec<DagNode>,
    edges: Vec<DagEdge>,
    output_stream_id: Option<StreamId>,
}

impl StreamGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a graph from raw parts exactly as given, e.g. from storage.
    pub fn from_parts(
        nodes: Vec<DagNode>,
        edges: Vec<DagEdge>,
        output_stream_id: Option<StreamId>,
    ) -> Self {
        Self {
            nodes,
            edges,
            output_stream_id,
        }
    }

    pub fn all_nodes(&self) -> &[DagNode] {
        &self.nodes
    }

    pub fn all_edges(&self) -> &[DagEdge] {
        &self.edges
    }

    pub fn node(&self, id: &StreamId) -> Option<&DagNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn has_node(&self, id: &StreamId) -> bool {
        self.node(id).is_some()
    }

    /// Add a node unless one with the same id already exists.
    pub fn add_node(&mut self, node: DagNode) -> bool {
        if self.has_node(&node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Remove a node together with every edge touching it. Clears the output
    /// stream if it pointed at the removed node.
    pub fn remove_node(&mut self, id: &StreamId) -> Option<DagNode> {
        let pos = self.nodes.iter().position(|n| &n.id == id)?;
        let node = self.nodes.remove(pos);
        self.edges.retain(|e| !e.touches(id));
        if self.output_stream_id.as_ref() == Some(id) {
            self.output_stream_id = None;
        }
        Some(node)
    }

    pub fn has_edge(&self, source: &StreamId, target: &StreamId) -> bool {
        self.edges.iter().any(|e| e.connects(source, target))
    }

    /// Insert an edge unless the same (source, target) pair is present.
    ///
    /// This only touches topology; [`add_edge`](crate::add_edge) is the
    /// mutation that also keeps transform inputs in step.
    pub fn insert_edge(&mut self, edge: DagEdge) -> bool {
        if self.has_edge(&edge.source, &edge.target) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn take_edge(&mut self, source: &StreamId, target: &StreamId) -> Option<DagEdge> {
        let pos = self.edges.iter().position(|e| e.connects(source, target))?;
        Some(self.edges.remove(pos))
    }

    pub fn incoming_edges<'a>(&'a self, id: &'a StreamId) -> impl Iterator<Item = &'a DagEdge> {
        self.edges.iter().filter(move |e| &e.target == id)
    }

    pub fn outgoing_edges<'a>(&'a self, id: &'a StreamId) -> impl Iterator<Item = &'a DagEdge> {
        self.edges.iter().filter(move |e| &e.source == id)
    }

    pub fn in_degree(&self, id: &StreamId) -> usize {
        self.incoming_edges(id).count()
    }

    pub fn out_degree(&self, id: &StreamId) -> usize {
        self.outgoing_edges(id).count()
    }

    pub fn output_stream_id(&self) -> Option<&StreamId> {
        self.output_stream_id.as_ref()
    }

    pub fn set_output_stream(&mut self, id: Option<StreamId>) {
        self.output_stream_id = id;
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.output_stream_id = None;
    }
}
