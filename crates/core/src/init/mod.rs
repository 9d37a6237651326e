//! Devicetree-driven init-order resolver.
//!
//! This module turns the devicetree, YAML overlays and Kconfig into per-node
//! init levels and priorities. It performs:
//! 1. **Merge:** EDT nodes and their dependencies, then overlay levels and dependencies ([`overlay`]).
//! 2. **Cycle check:** SCC decomposition of the hard-dependency graph ([`order`]).
//! 3. **Levels:** Implicit level propagation up the dependency chains ([`resolve`]).
//! 4. **Order:** Leaves-first numbering and level monotonicity check ([`order`]).
//! 5. **Emit:** `ZINIT_*` header rendering ([`emit`]).

/// Header rendering.
pub mod emit;
/// Init graph arena.
pub mod graph;
/// Level markers.
pub mod level;
/// Ordering and checks.
pub mod order;
/// Overlay parsing and merging.
pub mod overlay;
/// Implicit level resolution.
pub mod resolve;

use std::path::PathBuf;

use tracing::info;

use crate::config::InitConfig;
use crate::edt::Edt;
use crate::error::Result;
use crate::kconfig::Kconfig;
use crate::output;

pub use graph::{InitGraph, InitNode, NodeId, NodeKind};
pub use level::Level;
pub use overlay::{Merger, Overlay};

/// What a generator run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitSummary {
    /// Real nodes emitted.
    pub nodes: usize,
    /// Nodes with an explicit level.
    pub explicit: usize,
    /// Nodes with an implicit level.
    pub implicit: usize,
    /// Header written.
    pub header: PathBuf,
}

/// Builds, levels, orders and checks the init graph.
///
/// # Arguments
///
/// * `edt` - Devicetree.
/// * `kconfig` - Resolved Kconfig symbols, consulted by `if:` clauses.
/// * `overlays` - Overlays, applied in order.
///
/// # Returns
///
/// The fully ordered graph.
pub fn build(edt: &Edt, kconfig: &Kconfig, overlays: &[Overlay]) -> Result<InitGraph> {
    let mut merger = Merger::new(edt, kconfig);
    for overlay in overlays {
        merger.apply(overlay)?;
    }
    let mut graph = merger.into_graph();

    order::check_acyclic(&graph)?;
    resolve::resolve_levels(&mut graph)?;
    let _ = order::assign_ordinals(&mut graph)?;
    order::check_level_sanity(&graph)?;
    Ok(graph)
}

/// Runs the init generator end to end: read inputs, build, write the header.
pub fn generate(config: &InitConfig) -> Result<InitSummary> {
    let kconfig = Kconfig::load(&config.dotconfig_file)?;
    let edt = Edt::load(&config.edt_pickle)?;
    let overlays = config
        .overlays
        .iter()
        .map(|p| Overlay::load(p))
        .collect::<Result<Vec<_>>>()?;

    let graph = build(&edt, &kconfig, &overlays)?;
    output::write_atomic(&config.header_out, &emit::render(&graph))?;

    let ordered = graph.by_priority();
    let summary = InitSummary {
        nodes: ordered.len(),
        explicit: ordered
            .iter()
            .filter(|&&id| graph.node(id).is_explicit())
            .count(),
        implicit: ordered
            .iter()
            .filter(|&&id| {
                let n = graph.node(id);
                !n.is_explicit() && n.level().is_some()
            })
            .count(),
        header: config.header_out.clone(),
    };
    info!(
        nodes = summary.nodes,
        explicit = summary.explicit,
        implicit = summary.implicit,
        header = %summary.header.display(),
        "init priorities generated"
    );
    Ok(summary)
}
