//! End-to-end tests for the Rivulet stream graph.
//!
//! Each test drives the public API the way an editor would: build streams,
//! register them, wire edges, then validate, schedule, and query.

use std::collections::HashSet;

use rivulet_graph::{
    add_edge, remove_edge, topological_order, upstream_of, validate, DagNode, ErrorKind,
    FilterOptions, MixerOptions, Mutation, PipelineState, RssOptions, Snapshot, SorterOptions,
    StreamBuilder, StreamGraph, StreamRegistry, WarningKind,
};
use rivulet_types::{
    FilterField, FilterOperator, FilterRule, SortKey, Stream, StreamId, TransformConfig,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn builder() -> StreamBuilder {
    StreamBuilder::default()
}

fn rss(name: &str) -> Stream {
    builder()
        .create_rss_source(name, "https://example.com/feed.xml", RssOptions::default())
        .expect("rss source should build")
}

fn limiter(name: &str, input: &StreamId, cap: u32) -> Stream {
    builder()
        .create_limiter(name, input.clone(), cap, None)
        .expect("limiter should build")
}

fn id_set(ids: Vec<StreamId>) -> HashSet<StreamId> {
    ids.into_iter().collect()
}

/// Register streams without creating any edges.
fn register_only(streams: &[&Stream]) -> (StreamRegistry, StreamGraph) {
    let mut reg = StreamRegistry::new();
    let mut graph = StreamGraph::new();
    for s in streams {
        reg.insert((*s).clone()).expect("unique id");
        graph.add_node(DagNode::for_stream(s));
    }
    (reg, graph)
}

// ---------------------------------------------------------------------------
// Source -> Mixer -> Limiter
// ---------------------------------------------------------------------------

#[test]
fn source_mixer_limiter_pipeline() {
    let s1 = rss("S1");
    let m = builder()
        .create_mixer("M", vec![s1.id.clone()], MixerOptions::default())
        .unwrap();
    let l = limiter("L", &m.id, 5);

    let mut state = PipelineState::new();
    for s in [&s1, &m, &l] {
        state.add_stream(s.clone()).unwrap();
    }

    let result = state.validate();
    assert!(result.is_valid, "unexpected errors: {:?}", result.errors);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::SingleInputMixer);
    assert_eq!(result.warnings[0].node_ids, vec![m.id.clone()]);

    let order = state.topological_order().into_complete().unwrap();
    assert_eq!(order, vec![s1.id.clone(), m.id.clone(), l.id.clone()]);

    assert_eq!(
        id_set(state.upstream_of(&l.id)),
        id_set(vec![s1.id.clone(), m.id.clone()])
    );
    assert_eq!(
        id_set(state.downstream_of(&s1.id)),
        id_set(vec![m.id.clone(), l.id.clone()])
    );
}

// ---------------------------------------------------------------------------
// Missing and disconnected inputs
// ---------------------------------------------------------------------------

#[test]
fn filter_with_unregistered_input() {
    let x = StreamId::from("never-added");
    let f = builder()
        .create_filter(
            "F",
            x.clone(),
            vec![FilterRule::new(FilterField::Title, FilterOperator::Contains, "rust")],
            FilterOptions::default(),
        )
        .unwrap();
    let (reg, graph) = register_only(&[&f]);

    let result = validate(&reg, &graph);
    assert!(!result.is_valid);

    let missing: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.kind == ErrorKind::MissingInput)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].node_ids, vec![f.id.clone(), x.clone()]);

    let disconnected: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.kind == ErrorKind::Disconnected)
        .collect();
    assert_eq!(disconnected.len(), 1);
    assert_eq!(disconnected[0].node_ids, vec![f.id.clone()]);

    assert!(!result.has_error(ErrorKind::Cycle));
}

#[test]
fn zero_edges_schedules_in_discovery_order() {
    let a = rss("A");
    let b = rss("B");
    let sorter = builder()
        .create_sorter("Sort", a.id.clone(), SortKey::PublishedAt, SorterOptions::default())
        .unwrap();
    let (reg, graph) = register_only(&[&a, &b, &sorter]);

    let order = topological_order(&graph);
    assert!(order.is_complete());
    assert_eq!(order.order, vec![a.id.clone(), b.id.clone(), sorter.id.clone()]);

    let result = validate(&reg, &graph);
    assert!(!result.has_error(ErrorKind::Cycle));
    assert!(result.has_error(ErrorKind::Disconnected));
    let unused = result
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::UnusedStream)
        .count();
    assert_eq!(unused, 2);
}

// ---------------------------------------------------------------------------
// Cycles
// ---------------------------------------------------------------------------

#[test]
fn two_node_cycle_reported_once() {
    let seed = StreamId::from("seed");
    let a = limiter("A", &seed, 10);
    let b = limiter("B", &a.id, 10);
    let (mut reg, mut graph) = register_only(&[&a, &b]);
    add_edge(&mut reg, &mut graph, &a.id, &b.id);
    add_edge(&mut reg, &mut graph, &b.id, &a.id);

    let result = validate(&reg, &graph);
    let cycles: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.kind == ErrorKind::Cycle)
        .collect();
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].node_ids.contains(&a.id));
    assert!(cycles[0].node_ids.contains(&b.id));

    let order = topological_order(&graph);
    assert!(order.order.len() < graph.all_nodes().len());
    assert!(order.into_complete().is_err());

    // Traversal still terminates.
    assert_eq!(upstream_of(&graph, &a.id), vec![b.id.clone()]);
}

// ---------------------------------------------------------------------------
// Edge semantics
// ---------------------------------------------------------------------------

#[test]
fn add_edge_twice_is_idempotent() {
    let a = rss("A");
    let m = builder().create_mixer("M", vec![], MixerOptions::default()).unwrap();
    let (mut reg, mut graph) = register_only(&[&a, &m]);

    assert!(add_edge(&mut reg, &mut graph, &a.id, &m.id));
    assert!(!add_edge(&mut reg, &mut graph, &a.id, &m.id));

    assert_eq!(graph.all_edges().len(), 1);
    assert_eq!(reg.get(&m.id).unwrap().input_ids(), &[a.id.clone()]);
}

#[test]
fn single_input_transform_keeps_last_edge() {
    let a = rss("A");
    let b = rss("B");
    let t = limiter("T", &a.id, 3);
    let (mut reg, mut graph) = register_only(&[&a, &b, &t]);
    add_edge(&mut reg, &mut graph, &a.id, &t.id);

    add_edge(&mut reg, &mut graph, &b.id, &t.id);
    assert_eq!(reg.get(&t.id).unwrap().input_ids(), &[b.id.clone()]);

    assert!(remove_edge(&mut reg, &mut graph, &a.id, &t.id));
    assert_eq!(reg.get(&t.id).unwrap().input_ids(), &[b.id.clone()]);
    assert_eq!(graph.all_edges().len(), 1);
}

#[test]
fn removing_mixer_edge_forgets_input() {
    let a = rss("A");
    let b = rss("B");
    let m = builder()
        .create_mixer("M", vec![a.id.clone(), b.id.clone()], MixerOptions::default())
        .unwrap();
    let mut state = PipelineState::new();
    for s in [&a, &b, &m] {
        state.add_stream(s.clone()).unwrap();
    }
    assert!(state.remove_edge(&a.id, &m.id));

    match state.stream(&m.id).unwrap().transform_config().unwrap() {
        TransformConfig::Mixer(c) => assert_eq!(c.input_stream_ids, vec![b.id.clone()]),
        other => panic!("expected mixer, got {other:?}"),
    }
    let result = state.validate();
    assert!(result.has_warning(WarningKind::SingleInputMixer));
    assert!(result.has_warning(WarningKind::UnusedStream));
}

#[test]
fn removing_only_edge_into_limiter_disconnects_it() {
    let a = rss("A");
    let l = limiter("L", &a.id, 5);
    let mut state = PipelineState::new();
    state.add_stream(a.clone()).unwrap();
    state.add_stream(l.clone()).unwrap();
    assert!(state.validate().is_valid);

    assert!(state.remove_edge(&a.id, &l.id));
    assert!(state.stream(&l.id).unwrap().input_ids().is_empty());

    let result = state.validate();
    assert!(!result.is_valid);
    let disconnected: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.kind == ErrorKind::Disconnected)
        .collect();
    assert_eq!(disconnected.len(), 1);
    assert_eq!(disconnected[0].node_ids, vec![l.id.clone()]);
}

// ---------------------------------------------------------------------------
// Removal
// ---------------------------------------------------------------------------

#[test]
fn removing_middle_node_drops_its_edges() {
    let a = rss("A");
    let b = limiter("B", &a.id, 20);
    let c = limiter("C", &b.id, 5);
    let mut state = PipelineState::new();
    for s in [&a, &b, &c] {
        state.add_stream(s.clone()).unwrap();
    }
    assert_eq!(state.graph().all_edges().len(), 2);

    state.remove_stream(&b.id).unwrap();
    assert!(state.graph().all_edges().is_empty());
    assert!(state.upstream_of(&c.id).is_empty());

    // C still names B as its input.
    let result = state.validate();
    assert!(result.has_error(ErrorKind::MissingInput));
    assert!(result.has_error(ErrorKind::Disconnected));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn snapshot_round_trip_is_byte_identical() {
    let a = rss("A");
    let m = builder()
        .create_mixer("M", vec![a.id.clone()], MixerOptions::default())
        .unwrap();
    let state = PipelineState::new()
        .apply(Mutation::AddStream(a))
        .and_then(|s| s.apply(Mutation::AddStream(m.clone())))
        .and_then(|s| s.apply(Mutation::SetOutput(Some(m.id.clone()))))
        .unwrap();

    let first = state.snapshot().to_json().unwrap();
    let restored = PipelineState::from_snapshot(Snapshot::from_json(&first).unwrap()).unwrap();
    let second = restored.snapshot().to_json().unwrap();

    assert_eq!(first, second);
    assert_eq!(restored.registry(), state.registry());
    assert_eq!(restored.graph(), state.graph());
    assert_eq!(restored.output_stream().unwrap().id, m.id);
}

#[test]
fn snapshot_file_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    let a = rss("A");
    let l = limiter("L", &a.id, 5);
    let mut state = PipelineState::new();
    state.add_stream(a).unwrap();
    state.add_stream(l).unwrap();

    state.snapshot().save(&path).unwrap();
    let loaded = Snapshot::load(&path).unwrap().expect("snapshot present");
    let restored = PipelineState::from_snapshot(loaded).unwrap();

    assert!(restored.validate().is_valid);
    assert_eq!(restored.topological_order(), state.topological_order());
}
