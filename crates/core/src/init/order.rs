//! Topological ordering, cycle detection and level sanity.

use super::graph::{InitGraph, NodeId};
use crate::error::{Error, Result};
use crate::graph;

fn cyclic_names(graph: &InitGraph, adjacency: &[Vec<usize>], components: &[Vec<usize>]) -> Vec<String> {
    components
        .iter()
        .filter(|c| graph::is_cyclic(adjacency, c))
        .flatten()
        .map(|&i| graph.node(NodeId(i as u32)).name.clone())
        .collect()
}

/// Fails with [`Error::CycleDetected`] when hard dependencies loop.
pub fn check_acyclic(graph: &InitGraph) -> Result<()> {
    let adjacency = graph.adjacency(false);
    let components = graph::strongly_connected(&adjacency);
    let nodes = cyclic_names(graph, &adjacency, &components);
    if nodes.is_empty() {
        Ok(())
    } else {
        Err(Error::CycleDetected { nodes })
    }
}

/// Orders the graph, level edges included, and numbers the real nodes.
///
/// Components are walked leaves-first, members in insertion order; markers do
/// not consume ordinals. Any real node left without an ordinal (it sits in a
/// cyclic component) fails the run.
///
/// # Returns
///
/// Real node ids in priority order.
pub fn assign_ordinals(graph: &mut InitGraph) -> Result<Vec<NodeId>> {
    let adjacency = graph.adjacency(true);
    let components = graph::strongly_connected(&adjacency);

    let mut order = Vec::new();
    let mut next = 0u32;
    for c in graph::leaves_first(&adjacency, &components) {
        let members = &components[c];
        if graph::is_cyclic(&adjacency, members) {
            continue;
        }
        for &i in members {
            let id = NodeId(i as u32);
            if graph.node(id).is_marker() {
                continue;
            }
            graph.set_ordinal(id, next);
            next += 1;
            order.push(id);
        }
    }

    let unordered: Vec<String> = graph
        .real_ids()
        .filter(|&id| graph.node(id).dep_ordinal.is_none())
        .map(|id| graph.node(id).name.clone())
        .collect();
    if unordered.is_empty() {
        Ok(order)
    } else {
        Err(Error::CycleDetected { nodes: unordered })
    }
}

/// Checks that no node transitively requires a node on a later level.
///
/// Every real node with a level is compared against everything reachable
/// through its hard dependencies. The walk is bounded by the vertex count.
pub fn check_level_sanity(graph: &InitGraph) -> Result<()> {
    let bound = graph.len();
    for id in graph.real_ids() {
        let node = graph.node(id);
        let Some(level) = node.level() else {
            continue;
        };
        let mut seen = vec![false; bound];
        seen[id.index()] = true;
        // (node, depth)
        let mut stack: Vec<(NodeId, usize)> = node.deps.iter().map(|&d| (d, 1)).collect();
        while let Some((dep, depth)) = stack.pop() {
            if depth == bound {
                return Err(Error::DepthExceeded {
                    node: node.name.clone(),
                    depth: bound,
                });
            }
            if std::mem::replace(&mut seen[dep.index()], true) {
                continue;
            }
            let dep_node = graph.node(dep);
            if let Some(dep_level) = dep_node.level() {
                if dep_level.rank() > level.rank() {
                    return Err(Error::LevelSanity {
                        node: node.name.clone(),
                        level: level.name(),
                        dependency: dep_node.name.clone(),
                        dependency_level: dep_level.name(),
                    });
                }
            }
            if dep_node.is_marker() {
                continue;
            }
            stack.extend(dep_node.deps.iter().map(|&d| (d, depth + 1)));
        }
    }
    Ok(())
}
