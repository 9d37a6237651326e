//! IRQ tree: controllers, lines and the devices raising them.
//!
//! Every line of every interrupt controller gets a branch. A branch is
//! implemented once at least one enabled device routes an interrupt to it;
//! implemented branches are numbered densely in (controller, line) order.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::edt::Edt;
use crate::error::{Error, Result};

/// Interrupt controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intc {
    /// Devicetree ordinal.
    pub ordinal: u32,
    /// Devicetree path.
    pub path: String,
    /// Number of input lines.
    pub interrupt_lines: u32,
}

/// An implemented interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intl {
    /// Controller ordinal.
    pub intc: u32,
    /// Line index on the controller.
    pub line: u32,
}

/// A device raising an interrupt on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Irq {
    /// Controller ordinal.
    pub intc: u32,
    /// Line index on the controller.
    pub line: u32,
    /// Device ordinal.
    pub device: u32,
    /// Device path.
    pub device_path: String,
}

impl Irq {
    /// Name of the device's handler for this line.
    pub fn handler_name(&self) -> String {
        format!(
            "__sys_irq_handler_{}_{}_{}",
            self.intc, self.line, self.device
        )
    }
}

/// Everything attached to one (controller, line) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntBranch {
    /// Controller ordinal.
    pub intc: u32,
    /// Line index.
    pub line: u32,
    /// The implemented line, if any device uses it.
    pub intl: Option<Intl>,
    /// Devices on the line, in devicetree order.
    pub irqs: Vec<Irq>,
    /// Dense identifier; set only on implemented branches.
    pub identifier: Option<u32>,
}

impl IntBranch {
    /// Returns true when some device uses the line.
    pub const fn is_implemented(&self) -> bool {
        self.intl.is_some()
    }

    /// Name of the inline dispatcher for this line.
    pub fn handler_name(&self) -> String {
        format!("__sys_intl_handler_{}_{}", self.intc, self.line)
    }
}

/// All controllers and branches of a devicetree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrqTree {
    controllers: Vec<Intc>,
    branches: Vec<IntBranch>,
}

impl IrqTree {
    /// Builds the tree from a devicetree.
    ///
    /// # Arguments
    ///
    /// * `edt` - Devicetree; enabled nodes with interrupts and all nodes with
    ///   an `interrupt-controller` property are considered.
    ///
    /// # Returns
    ///
    /// The tree with identifiers assigned, or the first routing error.
    pub fn build(edt: &Edt) -> Result<Self> {
        let mut controllers = Vec::new();
        let mut branches: BTreeMap<(u32, u32), IntBranch> = BTreeMap::new();

        for node in edt.nodes().filter(|n| n.is_interrupt_controller()) {
            let lines = node
                .int_prop("interrupt-lines")
                .filter(|&l| l > 0)
                .and_then(|l| u32::try_from(l).ok())
                .ok_or_else(|| Error::InvalidInterruptLines {
                    path: node.path.clone(),
                })?;
            for line in 0..lines {
                let _ = branches.insert(
                    (node.dep_ordinal, line),
                    IntBranch {
                        intc: node.dep_ordinal,
                        line,
                        intl: None,
                        irqs: Vec::new(),
                        identifier: None,
                    },
                );
            }
            controllers.push(Intc {
                ordinal: node.dep_ordinal,
                path: node.path.clone(),
                interrupt_lines: lines,
            });
        }

        let mut seen_irqs = BTreeSet::new();
        for node in edt
            .nodes()
            .filter(|n| n.is_enabled() && !n.interrupts.is_empty())
        {
            for interrupt in &node.interrupts {
                let intc = controllers
                    .iter()
                    .find(|c| c.ordinal == interrupt.controller)
                    .ok_or_else(|| Error::UnknownInterruptController {
                        device: node.path.clone(),
                        controller: interrupt.controller,
                    })?;
                let raw_line = interrupt.data.get("irq").copied().ok_or_else(|| {
                    Error::MissingInterruptLine {
                        device: node.path.clone(),
                    }
                })?;
                let line = u32::try_from(raw_line)
                    .ok()
                    .filter(|&l| l < intc.interrupt_lines)
                    .ok_or_else(|| Error::InterruptLineOutOfRange {
                        device: node.path.clone(),
                        controller: intc.path.clone(),
                        line: u32::try_from(raw_line).unwrap_or(u32::MAX),
                        lines: intc.interrupt_lines,
                    })?;

                let key = (intc.ordinal, line);
                let Some(branch) = branches.get_mut(&key) else {
                    continue;
                };
                let _ = branch.intl.get_or_insert(Intl {
                    intc: intc.ordinal,
                    line,
                });
                if seen_irqs.insert((intc.ordinal, line, node.dep_ordinal)) {
                    debug!(device = %node.path, intc = %intc.path, line, "irq");
                    branch.irqs.push(Irq {
                        intc: intc.ordinal,
                        line,
                        device: node.dep_ordinal,
                        device_path: node.path.clone(),
                    });
                }
            }
        }

        let mut branches: Vec<IntBranch> = branches.into_values().collect();
        let mut next = 0u32;
        for branch in branches.iter_mut().filter(|b| b.is_implemented()) {
            branch.identifier = Some(next);
            next += 1;
        }
        info!(
            controllers = controllers.len(),
            branches = branches.len(),
            implemented = next,
            "irq tree built"
        );

        Ok(Self {
            controllers,
            branches,
        })
    }

    /// Controllers in ordinal order.
    pub fn controllers(&self) -> &[Intc] {
        &self.controllers
    }

    /// Looks a controller up by ordinal.
    pub fn controller(&self, ordinal: u32) -> Option<&Intc> {
        self.controllers.iter().find(|c| c.ordinal == ordinal)
    }

    /// Every branch in (controller, line) order.
    pub fn branches(&self) -> &[IntBranch] {
        &self.branches
    }

    /// Branches of one controller, in line order.
    pub fn branches_of(&self, ordinal: u32) -> impl Iterator<Item = &IntBranch> {
        self.branches.iter().filter(move |b| b.intc == ordinal)
    }

    /// Implemented branches, in identifier order.
    pub fn implemented(&self) -> impl Iterator<Item = &IntBranch> {
        self.branches.iter().filter(|b| b.is_implemented())
    }

    /// Number of implemented branches (`SYS_DT_IRQN_SIZE`).
    pub fn implemented_count(&self) -> usize {
        self.implemented().count()
    }

    /// Every IRQ, branch by branch.
    pub fn irqs(&self) -> impl Iterator<Item = &Irq> {
        self.branches.iter().flat_map(|b| b.irqs.iter())
    }
}
