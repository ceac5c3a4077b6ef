//! Execution order via Kahn's algorithm.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use rivulet_types::{Result, RivuletError, StreamId};

use crate::graph::StreamGraph;

/// Outcome of scheduling a graph.
///
/// When the graph has a cycle the order is partial: `unscheduled` then lists
/// every node that could never reach in-degree zero, in node order. A partial
/// order must not be executed; use [`ExecutionOrder::into_complete`] to get
/// an error instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOrder {
    pub order: Vec<StreamId>,
    pub unscheduled: Vec<StreamId>,
}

impl ExecutionOrder {
    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }

    /// The full order, or [`RivuletError::IncompleteOrder`].
    pub fn into_complete(self) -> Result<Vec<StreamId>> {
        if self.is_complete() {
            return Ok(self.order);
        }
        Err(RivuletError::IncompleteOrder {
            scheduled: self.order.len(),
            total: self.order.len() + self.unscheduled.len(),
            unscheduled: self.unscheduled,
        })
    }
}

/// Order the graph's nodes so every edge points forward.
///
/// Ready nodes are taken first-in first-out: the queue is seeded in node
/// order and successors become ready in edge insertion order, so the result
/// is deterministic. Edges with an endpoint outside the node list are
/// skipped here, and a node id listed twice is scheduled once; the
/// validator reports both.
pub fn topological_order(graph: &StreamGraph) -> ExecutionOrder {
    let nodes = graph.all_nodes();
    let mut index: HashMap<&StreamId, usize> = HashMap::with_capacity(nodes.len());
    let mut repeated = vec![false; nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        if index.contains_key(&node.id) {
            repeated[i] = true;
            continue;
        }
        index.insert(&node.id, i);
    }

    let mut in_degree = vec![0usize; nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for edge in graph.all_edges() {
        let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&edge.target)) else {
            continue;
        };
        successors[from].push(to);
        in_degree[to] += 1;
    }

    let mut queue: VecDeque<usize> = (0..nodes.len())
        .filter(|&i| !repeated[i] && in_degree[i] == 0)
        .collect();
    let mut scheduled = vec![false; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(current) = queue.pop_front() {
        if scheduled[current] {
            continue;
        }
        scheduled[current] = true;
        order.push(nodes[current].id.clone());
        for &next in &successors[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    let unscheduled: Vec<StreamId> = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| !scheduled[*i] && !repeated[*i])
        .map(|(_, n)| n.id.clone())
        .collect();

    if !unscheduled.is_empty() {
        tracing::warn!(
            scheduled = order.len(),
            blocked = unscheduled.len(),
            "Execution order is incomplete; the graph contains a cycle"
        );
    }

    ExecutionOrder { order, unscheduled }
}
