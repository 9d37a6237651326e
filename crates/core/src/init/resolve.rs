//! Implicit level propagation.
//!
//! A real node without an explicit level inherits the highest-ranked level
//! among its hard dependencies, resolving those first. Nodes whose
//! dependencies carry no level stay unleveled.

use tracing::debug;

use super::graph::{InitGraph, NodeId, NodeKind};
use super::level::Level;
use crate::error::{Error, Result};

struct Resolver<'g> {
    graph: &'g mut InitGraph,
    done: Vec<bool>,
    bound: usize,
}

impl Resolver<'_> {
    fn resolve(&mut self, id: NodeId, depth: usize) -> Result<()> {
        if depth == self.bound {
            return Err(Error::DepthExceeded {
                node: self.graph.node(id).name.clone(),
                depth: self.bound,
            });
        }
        if self.done[id.index()] {
            return Ok(());
        }
        match self.graph.node(id).kind {
            NodeKind::Level(_) | NodeKind::Real { explicit: true, .. } => {
                self.done[id.index()] = true;
                return Ok(());
            }
            NodeKind::Real { .. } => {}
        }

        let deps = self.graph.node(id).deps.clone();
        let mut best: Option<Level> = None;
        for dep in deps {
            if self.graph.node(dep).level().is_none() {
                self.resolve(dep, depth + 1)?;
            }
            let candidate = self.graph.node(dep).level();
            if let Some(candidate) = candidate {
                if best.is_none_or(|b| candidate.rank() > b.rank()) {
                    best = Some(candidate);
                }
            }
        }

        if let Some(level) = best {
            debug!(node = %self.graph.node(id).name, level = %level, "implicit level");
        }
        self.graph.set_level(id, best, false);
        self.done[id.index()] = true;
        Ok(())
    }
}

/// Assigns implicit levels to every real node lacking an explicit one.
///
/// Recursion is bounded by the number of vertices; hitting the bound means the
/// dependencies loop and is reported as [`Error::DepthExceeded`].
pub fn resolve_levels(graph: &mut InitGraph) -> Result<()> {
    let bound = graph.len();
    let ids: Vec<NodeId> = graph.real_ids().collect();
    let mut resolver = Resolver {
        done: vec![false; bound],
        graph,
        bound,
    };
    for id in ids {
        resolver.resolve(id, 0)?;
    }
    Ok(())
}
