//! Stream graph validation: lint rules and findings.
//!
//! Every rule runs on every call so a single [`validate`] surfaces all
//! independent problems. Errors make a graph unschedulable; warnings are
//! advisory. Use [`validate_or_raise`] to turn errors into a
//! [`RivuletError::ValidationError`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use rivulet_types::{Result, RivuletError, StreamId, TransformConfig};

use crate::builder::validate_stream_config;
use crate::graph::StreamGraph;
use crate::registry::StreamRegistry;

// ---------------------------------------------------------------------------
// Finding types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Cycle,
    Disconnected,
    MissingInput,
    InvalidConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UnusedStream,
    SingleInputMixer,
    /// Reserved; no built-in rule emits it yet.
    RedundantTransform,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
    pub node_ids: Vec<StreamId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub kind: WarningKind,
    pub message: String,
    pub node_ids: Vec<StreamId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Error(ValidationError),
    Warning(ValidationWarning),
}

impl Finding {
    fn error(kind: ErrorKind, message: String, node_ids: Vec<StreamId>) -> Self {
        Finding::Error(ValidationError {
            kind,
            message,
            node_ids,
        })
    }

    fn warning(kind: WarningKind, message: String, node_ids: Vec<StreamId>) -> Self {
        Finding::Warning(ValidationWarning {
            kind,
            message,
            node_ids,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn has_error(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

/// A single independent check. Rules only read the registry and graph.
pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, registry: &StreamRegistry, graph: &StreamGraph) -> Vec<Finding>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn join_ids(ids: &[StreamId]) -> String {
    ids.iter()
        .map(StreamId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Depth-first search over edge adjacency.
///
/// The recursion stack is explicit: each frame is a node on the current path
/// plus the index of the next neighbour to try, so graph depth never touches
/// the thread stack.
struct CycleSearch<'a> {
    adjacency: HashMap<&'a StreamId, Vec<&'a StreamId>>,
    visited: HashSet<&'a StreamId>,
    frames: Vec<(&'a StreamId, usize)>,
    on_path: HashSet<&'a StreamId>,
}

impl<'a> CycleSearch<'a> {
    fn new(graph: &'a StreamGraph) -> Self {
        let mut adjacency: HashMap<&StreamId, Vec<&StreamId>> = HashMap::new();
        for edge in graph.all_edges() {
            adjacency.entry(&edge.source).or_default().push(&edge.target);
        }
        Self {
            adjacency,
            visited: HashSet::new(),
            frames: Vec::new(),
            on_path: HashSet::new(),
        }
    }

    fn enter(&mut self, node: &'a StreamId) {
        self.visited.insert(node);
        self.on_path.insert(node);
        self.frames.push((node, 0));
    }

    /// Returns `true` when a back edge is found; [`path`](Self::path) then
    /// holds the nodes that were on the stack at that point.
    fn visit(&mut self, start: &'a StreamId) -> bool {
        self.enter(start);

        while let Some(&(node, index)) = self.frames.last() {
            let next = self.adjacency.get(node).and_then(|n| n.get(index)).copied();
            let Some(next) = next else {
                self.frames.pop();
                self.on_path.remove(node);
                continue;
            };
            if let Some(top) = self.frames.last_mut() {
                top.1 += 1;
            }
            if self.on_path.contains(next) {
                return true;
            }
            if !self.visited.contains(next) {
                self.enter(next);
            }
        }

        false
    }

    fn path(&self) -> Vec<StreamId> {
        self.frames.iter().map(|&(id, _)| id.clone()).collect()
    }
}

struct CycleRule;
impl LintRule for CycleRule {
    fn name(&self) -> &str { "cycle" }
    fn apply(&self, _registry: &StreamRegistry, graph: &StreamGraph) -> Vec<Finding> {
        let mut search = CycleSearch::new(graph);
        for node in graph.all_nodes() {
            if !search.visited.contains(&node.id) && search.visit(&node.id) {
                let node_ids = search.path();
                return vec![Finding::error(
                    ErrorKind::Cycle,
                    format!(
                        "The graph contains a cycle through {}; content cannot flow in a loop",
                        join_ids(&node_ids)
                    ),
                    node_ids,
                )];
            }
        }
        vec![]
    }
}

struct MissingInputRule;
impl LintRule for MissingInputRule {
    fn name(&self) -> &str { "missing_input" }
    fn apply(&self, registry: &StreamRegistry, graph: &StreamGraph) -> Vec<Finding> {
        graph
            .all_nodes()
            .iter()
            .filter_map(|node| {
                let stream = registry.get(&node.id).filter(|s| s.is_transform())?;
                let missing: Vec<StreamId> = stream
                    .input_ids()
                    .iter()
                    .filter(|id| !registry.contains(id))
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    return None;
                }
                let message = format!(
                    "Transform \"{}\" has missing input streams: {}",
                    stream.name,
                    join_ids(&missing)
                );
                let mut node_ids = vec![node.id.clone()];
                node_ids.extend(missing);
                Some(Finding::error(ErrorKind::MissingInput, message, node_ids))
            })
            .collect()
    }
}

/// A transform with zero incoming edges that either declares inputs or, as a
/// single-input kind, needs one. Mixers may legitimately start empty.
struct DisconnectedRule;
impl LintRule for DisconnectedRule {
    fn name(&self) -> &str { "disconnected" }
    fn apply(&self, registry: &StreamRegistry, graph: &StreamGraph) -> Vec<Finding> {
        graph
            .all_nodes()
            .iter()
            .filter_map(|node| {
                let stream = registry.get(&node.id)?;
                let config = stream.transform_config()?;
                if graph.in_degree(&node.id) > 0 {
                    return None;
                }
                let message = if !stream.input_ids().is_empty() {
                    format!("Transform \"{}\" has no connected inputs", stream.name)
                } else if !config.accepts_multiple_inputs() {
                    format!("Transform \"{}\" has no input stream", stream.name)
                } else {
                    return None;
                };
                Some(Finding::error(
                    ErrorKind::Disconnected,
                    message,
                    vec![node.id.clone()],
                ))
            })
            .collect()
    }
}

struct UnusedSourceRule;
impl LintRule for UnusedSourceRule {
    fn name(&self) -> &str { "unused_stream" }
    fn apply(&self, registry: &StreamRegistry, graph: &StreamGraph) -> Vec<Finding> {
        graph
            .all_nodes()
            .iter()
            .filter_map(|node| {
                let stream = registry.get(&node.id).filter(|s| s.is_source())?;
                if graph.out_degree(&node.id) > 0 {
                    return None;
                }
                Some(Finding::warning(
                    WarningKind::UnusedStream,
                    format!("Source \"{}\" is not connected to any transform", stream.name),
                    vec![node.id.clone()],
                ))
            })
            .collect()
    }
}

struct SingleInputMixerRule;
impl LintRule for SingleInputMixerRule {
    fn name(&self) -> &str { "single_input_mixer" }
    fn apply(&self, registry: &StreamRegistry, graph: &StreamGraph) -> Vec<Finding> {
        graph
            .all_nodes()
            .iter()
            .filter_map(|node| {
                let stream = registry.get(&node.id)?;
                if !matches!(stream.transform_config(), Some(TransformConfig::Mixer(_))) {
                    return None;
                }
                if graph.in_degree(&node.id) != 1 {
                    return None;
                }
                Some(Finding::warning(
                    WarningKind::SingleInputMixer,
                    format!(
                        "Mixer \"{}\" has only one input; add more inputs or remove the mixer",
                        stream.name
                    ),
                    vec![node.id.clone()],
                ))
            })
            .collect()
    }
}

/// Dangling references between registry and graph: edges to unknown nodes,
/// nodes without streams, streams without nodes, duplicate node ids, and an
/// output stream that is not in the graph.
struct DanglingReferenceRule;
impl LintRule for DanglingReferenceRule {
    fn name(&self) -> &str { "dangling_reference" }
    fn apply(&self, registry: &StreamRegistry, graph: &StreamGraph) -> Vec<Finding> {
        let mut findings = Vec::new();

        let mut seen = HashSet::new();
        for node in graph.all_nodes() {
            if !seen.insert(&node.id) {
                findings.push(Finding::error(
                    ErrorKind::InvalidConfig,
                    format!("Node '{}' appears more than once", node.id),
                    vec![node.id.clone()],
                ));
            }
            if !registry.contains(&node.id) {
                findings.push(Finding::error(
                    ErrorKind::InvalidConfig,
                    format!("Node '{}' has no stream definition", node.id),
                    vec![node.id.clone()],
                ));
            }
        }

        for stream in registry.iter() {
            if !graph.has_node(&stream.id) {
                findings.push(Finding::error(
                    ErrorKind::InvalidConfig,
                    format!("Stream \"{}\" has no node in the graph", stream.name),
                    vec![stream.id.clone()],
                ));
            }
        }

        for edge in graph.all_edges() {
            let dangling: Vec<StreamId> = [&edge.source, &edge.target]
                .into_iter()
                .filter(|id| !graph.has_node(id))
                .cloned()
                .collect();
            if !dangling.is_empty() {
                findings.push(Finding::error(
                    ErrorKind::InvalidConfig,
                    format!(
                        "Edge {} references unknown node(s): {}",
                        edge.id,
                        join_ids(&dangling)
                    ),
                    vec![edge.source.clone(), edge.target.clone()],
                ));
            }
        }

        if let Some(output) = graph.output_stream_id() {
            if !graph.has_node(output) {
                findings.push(Finding::error(
                    ErrorKind::InvalidConfig,
                    format!("Output stream '{output}' is not in the graph"),
                    vec![output.clone()],
                ));
            }
        }

        findings
    }
}

/// Re-checks stored configurations with the builder's construction rules,
/// catching definitions that were edited or loaded rather than built.
struct StreamConfigRule;
impl LintRule for StreamConfigRule {
    fn name(&self) -> &str { "stream_config" }
    fn apply(&self, registry: &StreamRegistry, graph: &StreamGraph) -> Vec<Finding> {
        graph
            .all_nodes()
            .iter()
            .filter_map(|node| {
                let stream = registry.get(&node.id)?;
                let err = validate_stream_config(&stream.kind).err()?;
                Some(Finding::error(
                    ErrorKind::InvalidConfig,
                    format!("{} \"{}\": {err}", stream.type_name(), stream.name),
                    vec![node.id.clone()],
                ))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The built-in rules in reporting order.
pub fn default_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(CycleRule),
        Box::new(MissingInputRule),
        Box::new(DisconnectedRule),
        Box::new(UnusedSourceRule),
        Box::new(SingleInputMixerRule),
        Box::new(DanglingReferenceRule),
        Box::new(StreamConfigRule),
    ]
}

/// Run `rules` in order and collect their findings.
pub fn validate_with(
    rules: &[Box<dyn LintRule>],
    registry: &StreamRegistry,
    graph: &StreamGraph,
) -> ValidationResult {
    let mut result = ValidationResult::default();
    for rule in rules {
        for finding in rule.apply(registry, graph) {
            match finding {
                Finding::Error(e) => result.errors.push(e),
                Finding::Warning(w) => result.warnings.push(w),
            }
        }
    }
    result.is_valid = result.errors.is_empty();
    tracing::debug!(
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "Stream graph validated"
    );
    result
}

/// Run all built-in lint rules.
pub fn validate(registry: &StreamRegistry, graph: &StreamGraph) -> ValidationResult {
    validate_with(&default_rules(), registry, graph)
}

/// Run all lint rules; return `Err` if any error was found.
pub fn validate_or_raise(
    registry: &StreamRegistry,
    graph: &StreamGraph,
) -> Result<ValidationResult> {
    let result = validate(registry, graph);
    if !result.is_valid {
        let messages: Vec<_> = result.errors.iter().map(|e| e.message.clone()).collect();
        return Err(RivuletError::ValidationError(messages.join("; ")));
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
