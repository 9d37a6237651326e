//! System IRQ dispatch generator.
//!
//! Builds the [`IrqTree`] from the devicetree and renders the four dispatch
//! artefacts described in [`emit`].

/// Header and source rendering.
pub mod emit;
/// Controller/line/device tree.
pub mod tree;

use std::path::PathBuf;

use tracing::info;

use crate::config::IrqConfig;
use crate::edt::Edt;
use crate::error::Result;
use crate::output;

pub use tree::{IntBranch, Intc, Intl, Irq, IrqTree};

/// What a generator run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrqSummary {
    /// Interrupt controllers found.
    pub controllers: usize,
    /// Branches (controller lines) in total.
    pub branches: usize,
    /// Implemented branches.
    pub implemented: usize,
    /// Device interrupts.
    pub irqs: usize,
    /// Files written.
    pub written: Vec<PathBuf>,
}

/// Runs the IRQ generator end to end.
pub fn generate(config: &IrqConfig) -> Result<IrqSummary> {
    let edt = Edt::load(&config.edt_pickle)?;
    let tree = IrqTree::build(&edt)?;

    let outputs = [
        (&config.irq_h, emit::render_irq_h(&tree)),
        (&config.irq_internal_h, emit::render_irq_internal_h(&tree)),
        (&config.irq_handler_h, emit::render_irq_handler_h(&tree, config)),
        (&config.irq_handler_c, emit::render_irq_handler_c(&tree)),
    ];
    let mut written = Vec::with_capacity(outputs.len());
    for (path, contents) in outputs {
        output::write_atomic(path, &contents)?;
        written.push(path.clone());
    }

    let summary = IrqSummary {
        controllers: tree.controllers().len(),
        branches: tree.branches().len(),
        implemented: tree.implemented_count(),
        irqs: tree.irqs().count(),
        written,
    };
    info!(
        controllers = summary.controllers,
        implemented = summary.implemented,
        irqs = summary.irqs,
        "irq dispatch generated"
    );
    Ok(summary)
}
