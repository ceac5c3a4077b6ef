//! Stream graph engine: registry, builder, validation, and scheduling.
//!
//! This crate implements the core Rivulet graph: the stream registry, the
//! DAG of nodes and edges, stream construction with config checks, the lint
//! rules that validate a pipeline, execution ordering, reachability queries,
//! and JSON snapshots.

pub mod builder;
pub mod graph;
pub mod pipeline;
pub mod reachability;
pub mod registry;
pub mod schedule;
pub mod snapshot;
pub mod validation;

pub use builder::{
    add_edge, remove_edge, validate_source_config, validate_stream_config,
    validate_transform_config, BuilderDefaults, FilterOptions, MixerOptions, RssOptions,
    SorterOptions, StreamBuilder, SummarizerOptions, TaggerOptions,
};
pub use graph::{DagEdge, DagNode, NodeKind, StreamGraph};
pub use pipeline::{Mutation, PipelineState, StreamUpdate};
pub use reachability::{downstream_of, upstream_of};
pub use registry::StreamRegistry;
pub use schedule::{topological_order, ExecutionOrder};
pub use snapshot::Snapshot;
pub use validation::{
    default_rules, validate, validate_or_raise, validate_with, ErrorKind, Finding, LintRule,
    ValidationError, ValidationResult, ValidationWarning, WarningKind,
};
