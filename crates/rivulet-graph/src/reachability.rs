//! Upstream / downstream traversal.
//!
//! Both queries are breadth-first with a visited guard, so they terminate on
//! cyclic or otherwise invalid graphs. Results are in discovery order and
//! never contain the starting node.

use std::collections::{HashSet, VecDeque};

use rivulet_types::StreamId;

use crate::graph::{DagEdge, StreamGraph};

#[derive(Clone, Copy)]
enum Direction {
    Upstream,
    Downstream,
}

fn traverse(graph: &StreamGraph, start: &StreamId, direction: Direction) -> Vec<StreamId> {
    let mut visited: HashSet<&StreamId> = HashSet::new();
    let mut queue = VecDeque::new();
    let mut found = Vec::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for edge in graph.all_edges() {
            let Some(next) = step(edge, current, direction) else {
                continue;
            };
            if visited.insert(next) {
                found.push(next.clone());
                queue.push_back(next);
            }
        }
    }

    found
}

fn step<'a>(edge: &'a DagEdge, current: &StreamId, direction: Direction) -> Option<&'a StreamId> {
    match direction {
        Direction::Upstream if &edge.target == current => Some(&edge.source),
        Direction::Downstream if &edge.source == current => Some(&edge.target),
        _ => None,
    }
}

/// Every stream that (transitively) feeds into `id`.
pub fn upstream_of(graph: &StreamGraph, id: &StreamId) -> Vec<StreamId> {
    traverse(graph, id, Direction::Upstream)
}

/// Every stream that `id` (transitively) feeds into.
pub fn downstream_of(graph: &StreamGraph, id: &StreamId) -> Vec<StreamId> {
    traverse(graph, id, Direction::Downstream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DagNode, NodeKind};

    fn graph(edges: &[(&str, &str)]) -> StreamGraph {
        let mut g = StreamGraph::new();
        for &(s, t) in edges {
            for id in [s, t] {
                g.add_node(DagNode {
                    id: id.into(),
                    kind: NodeKind::Transform,
                });
            }
            g.insert_edge(DagEdge::new(s.into(), t.into()));
        }
        g
    }

    fn set(ids: Vec<StreamId>) -> HashSet<String> {
        ids.into_iter().map(|id| id.as_str().to_string()).collect()
    }

    fn expected(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn diamond_upstream_and_downstream() {
        let g = graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert_eq!(set(upstream_of(&g, &"d".into())), expected(&["a", "b", "c"]));
        assert_eq!(set(downstream_of(&g, &"a".into())), expected(&["b", "c", "d"]));
        assert!(upstream_of(&g, &"a".into()).is_empty());
        assert!(downstream_of(&g, &"d".into()).is_empty());
    }

    #[test]
    fn results_are_in_discovery_order() {
        let g = graph(&[("s", "m"), ("m", "l")]);
        let up = upstream_of(&g, &"l".into());
        assert_eq!(up, vec![StreamId::from("m"), StreamId::from("s")]);
    }

    #[test]
    fn terminates_on_cycles_and_excludes_start() {
        let g = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
        assert_eq!(set(downstream_of(&g, &"a".into())), expected(&["b", "c"]));
        assert_eq!(set(upstream_of(&g, &"a".into())), expected(&["b", "c"]));
    }

    #[test]
    fn unknown_id_has_no_neighbours() {
        let g = graph(&[("a", "b")]);
        assert!(upstream_of(&g, &"zzz".into()).is_empty());
    }
}
