//! Pipeline state: the registry and graph mutated together.
//!
//! [`PipelineState`] keeps the two halves of a pipeline in step: adding a
//! stream gives it a node, removing one drops its node, edges, and any
//! output/selection pointing at it. Callers that prefer message passing send
//! a [`Mutation`] to [`PipelineState::apply`], which returns a new state and
//! leaves the original untouched.

use chrono::{DateTime, Utc};

use rivulet_types::{Result, RivuletError, Stream, StreamId, StreamStatus};

use crate::builder;
use crate::graph::{DagEdge, DagNode, StreamGraph};
use crate::reachability;
use crate::registry::StreamRegistry;
use crate::schedule::{self, ExecutionOrder};
use crate::snapshot::Snapshot;
use crate::validation::{self, ValidationResult};

/// Partial update of a stream's descriptive and status fields.
///
/// Configuration is not part of an update: inputs change through edges so
/// the graph and the recorded inputs never drift apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<StreamStatus>,
    pub error_message: Option<Option<String>>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddStream(Stream),
    UpdateStream { id: StreamId, update: StreamUpdate },
    RemoveStream(StreamId),
    AddEdge { source: StreamId, target: StreamId },
    RemoveEdge { source: StreamId, target: StreamId },
    SetOutput(Option<StreamId>),
    SetSelected(Option<StreamId>),
    Clear,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    registry: StreamRegistry,
    graph: StreamGraph,
    selected_stream_id: Option<StreamId>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let (registry, graph) = snapshot.restore()?;
        Ok(Self {
            registry,
            graph,
            selected_stream_id: None,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.registry, &self.graph)
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &StreamGraph {
        &self.graph
    }

    pub fn stream(&self, id: &StreamId) -> Option<&Stream> {
        self.registry.get(id)
    }

    pub fn sources(&self) -> impl Iterator<Item = &Stream> {
        self.registry.sources()
    }

    pub fn transforms(&self) -> impl Iterator<Item = &Stream> {
        self.registry.transforms()
    }

    pub fn output_stream(&self) -> Option<&Stream> {
        self.graph.output_stream_id().and_then(|id| self.registry.get(id))
    }

    pub fn selected_stream_id(&self) -> Option<&StreamId> {
        self.selected_stream_id.as_ref()
    }

    pub fn selected_stream(&self) -> Option<&Stream> {
        self.selected_stream_id
            .as_ref()
            .and_then(|id| self.registry.get(id))
    }

    // --- Mutations ---

    /// Register a stream and give it a node.
    ///
    /// A transform is also wired to each of its declared inputs that is
    /// already registered; inputs that do not exist yet are left for the
    /// validator to report.
    pub fn add_stream(&mut self, stream: Stream) -> Result<()> {
        if self.registry.contains(&stream.id) {
            return Err(RivuletError::DuplicateStream(stream.id));
        }
        let node = DagNode::for_stream(&stream);
        let id = stream.id.clone();
        let inputs: Vec<StreamId> = stream
            .input_ids()
            .iter()
            .filter(|input| self.registry.contains(input))
            .cloned()
            .collect();

        self.registry.insert(stream)?;
        self.graph.add_node(node);
        for input in inputs {
            self.graph.insert_edge(DagEdge::new(input, id.clone()));
        }
        tracing::debug!(%id, "Stream added");
        Ok(())
    }

    pub fn update_stream(&mut self, id: &StreamId, update: StreamUpdate) -> Result<()> {
        let stream = self
            .registry
            .get_mut(id)
            .ok_or_else(|| RivuletError::UnknownStream(id.clone()))?;
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(RivuletError::invalid_config(
                    stream.type_name(),
                    "name must not be empty",
                ));
            }
            stream.name = name;
        }
        if let Some(description) = update.description {
            stream.description = description;
        }
        if let Some(status) = update.status {
            stream.status = status;
        }
        if let Some(error_message) = update.error_message {
            stream.error_message = error_message;
        }
        if let Some(at) = update.last_fetched_at {
            stream.last_fetched_at = Some(at);
        }
        Ok(())
    }

    pub fn set_status(&mut self, id: &StreamId, status: StreamStatus) -> Result<()> {
        self.update_stream(
            id,
            StreamUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    /// Remove a stream, its node, every edge touching it, and any output or
    /// selection that pointed at it.
    ///
    /// Transforms downstream keep the removed id in their recorded inputs;
    /// validation reports them as having a missing input.
    pub fn remove_stream(&mut self, id: &StreamId) -> Result<Stream> {
        let stream = self
            .registry
            .remove(id)
            .ok_or_else(|| RivuletError::UnknownStream(id.clone()))?;
        self.graph.remove_node(id);
        if self.selected_stream_id.as_ref() == Some(id) {
            self.selected_stream_id = None;
        }
        tracing::debug!(%id, "Stream removed");
        Ok(stream)
    }

    /// See [`builder::add_edge`] for the input recording policy.
    pub fn add_edge(&mut self, source: &StreamId, target: &StreamId) -> bool {
        builder::add_edge(&mut self.registry, &mut self.graph, source, target)
    }

    pub fn remove_edge(&mut self, source: &StreamId, target: &StreamId) -> bool {
        builder::remove_edge(&mut self.registry, &mut self.graph, source, target)
    }

    pub fn set_output(&mut self, id: Option<StreamId>) -> Result<()> {
        self.ensure_known(id.as_ref())?;
        self.graph.set_output_stream(id);
        Ok(())
    }

    pub fn set_selected(&mut self, id: Option<StreamId>) -> Result<()> {
        self.ensure_known(id.as_ref())?;
        self.selected_stream_id = id;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.registry.clear();
        self.graph.clear();
        self.selected_stream_id = None;
    }

    /// Apply `mutation` to a copy of this state and return the copy.
    pub fn apply(&self, mutation: Mutation) -> Result<PipelineState> {
        let mut next = self.clone();
        next.apply_in_place(mutation)?;
        Ok(next)
    }

    pub fn apply_in_place(&mut self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::AddStream(stream) => self.add_stream(stream),
            Mutation::UpdateStream { id, update } => self.update_stream(&id, update),
            Mutation::RemoveStream(id) => self.remove_stream(&id).map(|_| ()),
            Mutation::AddEdge { source, target } => {
                self.add_edge(&source, &target);
                Ok(())
            }
            Mutation::RemoveEdge { source, target } => {
                self.remove_edge(&source, &target);
                Ok(())
            }
            Mutation::SetOutput(id) => self.set_output(id),
            Mutation::SetSelected(id) => self.set_selected(id),
            Mutation::Clear => {
                self.clear();
                Ok(())
            }
        }
    }

    fn ensure_known(&self, id: Option<&StreamId>) -> Result<()> {
        match id {
            Some(id) if !self.registry.contains(id) => Err(RivuletError::UnknownStream(id.clone())),
            _ => Ok(()),
        }
    }

    // --- Queries ---

    pub fn validate(&self) -> ValidationResult {
        validation::validate(&self.registry, &self.graph)
    }

    pub fn topological_order(&self) -> ExecutionOrder {
        schedule::topological_order(&self.graph)
    }

    pub fn upstream_of(&self, id: &StreamId) -> Vec<StreamId> {
        reachability::upstream_of(&self.graph, id)
    }

    pub fn downstream_of(&self, id: &StreamId) -> Vec<StreamId> {
        reachability::downstream_of(&self.graph, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{MixerOptions, RssOptions, StreamBuilder};

    fn feed(b: &StreamBuilder, name: &str) -> Stream {
        b.create_rss_source(name, "https://example.com/rss", RssOptions::default())
            .unwrap()
    }

    #[test]
    fn add_transform_wires_existing_inputs() {
        let b = StreamBuilder::default();
        let mut state = PipelineState::new();
        let a = feed(&b, "A");
        let mix = b
            .create_mixer("M", vec![a.id.clone(), "later".into()], MixerOptions::default())
            .unwrap();
        state.add_stream(a.clone()).unwrap();
        state.add_stream(mix.clone()).unwrap();

        assert_eq!(state.graph().all_nodes().len(), 2);
        assert_eq!(state.graph().all_edges().len(), 1);
        assert!(state.graph().has_edge(&a.id, &mix.id));
        assert_eq!(state.sources().count(), 1);
        assert_eq!(state.transforms().count(), 1);
    }

    #[test]
    fn duplicate_add_rejected() {
        let b = StreamBuilder::default();
        let mut state = PipelineState::new();
        let a = feed(&b, "A");
        state.add_stream(a.clone()).unwrap();
        assert!(matches!(
            state.add_stream(a),
            Err(RivuletError::DuplicateStream(_))
        ));
    }

    #[test]
    fn remove_clears_output_and_selection() {
        let b = StreamBuilder::default();
        let mut state = PipelineState::new();
        let a = feed(&b, "A");
        state.add_stream(a.clone()).unwrap();
        state.set_output(Some(a.id.clone())).unwrap();
        state.set_selected(Some(a.id.clone())).unwrap();
        assert_eq!(state.output_stream().unwrap().name, "A");
        assert_eq!(state.selected_stream().unwrap().name, "A");

        let removed = state.remove_stream(&a.id).unwrap();
        assert_eq!(removed.id, a.id);
        assert!(state.output_stream().is_none());
        assert!(state.selected_stream_id().is_none());
        assert!(state.graph().all_nodes().is_empty());
    }

    #[test]
    fn unknown_output_rejected() {
        let mut state = PipelineState::new();
        assert!(matches!(
            state.set_output(Some("nope".into())),
            Err(RivuletError::UnknownStream(_))
        ));
        state.set_output(None).unwrap();
    }

    #[test]
    fn update_stream_fields() {
        let b = StreamBuilder::default();
        let mut state = PipelineState::new();
        let a = feed(&b, "A");
        state.add_stream(a.clone()).unwrap();
        state
            .update_stream(
                &a.id,
                StreamUpdate {
                    name: Some("Renamed".into()),
                    description: Some(Some("Morning reads".into())),
                    error_message: Some(Some("timeout".into())),
                    status: Some(StreamStatus::Error),
                    ..Default::default()
                },
            )
            .unwrap();
        let s = state.stream(&a.id).unwrap();
        assert_eq!(s.name, "Renamed");
        assert_eq!(s.description.as_deref(), Some("Morning reads"));
        assert_eq!(s.status, StreamStatus::Error);

        state.set_status(&a.id, StreamStatus::Paused).unwrap();
        assert_eq!(state.stream(&a.id).unwrap().status, StreamStatus::Paused);
        assert!(state
            .update_stream(&"ghost".into(), StreamUpdate::default())
            .is_err());
    }

    #[test]
    fn apply_returns_new_state_and_keeps_original() {
        let b = StreamBuilder::default();
        let a = feed(&b, "A");
        let empty = PipelineState::new();
        let next = empty.apply(Mutation::AddStream(a.clone())).unwrap();

        assert!(empty.registry().is_empty());
        assert_eq!(next.registry().len(), 1);

        let cleared = next.apply(Mutation::Clear).unwrap();
        assert!(cleared.registry().is_empty());
        assert_eq!(next.registry().len(), 1);
    }

    #[test]
    fn failed_apply_leaves_state_unchanged() {
        let state = PipelineState::new();
        assert!(state.apply(Mutation::RemoveStream("ghost".into())).is_err());
        assert_eq!(state, PipelineState::new());
    }
}
