//! # System IRQ Tests

/// Tree construction and identifier assignment.
pub mod tree;

use crate::common::edt::EdtBuilder;

/// Two controllers at ordinals 5 (3 lines) and 9 (2 lines). D1 sits on
/// (5, 0), D2 and D3 share (9, 0) and D4 uses (5, 2).
pub fn two_controllers() -> EdtBuilder {
    EdtBuilder::new()
        .node("/soc")
        .node("/soc/f2")
        .node("/soc/f3")
        .node("/soc/f4")
        .controller("/soc/intc@5", 3)
        .node("/soc/f6")
        .node("/soc/f7")
        .node("/soc/f8")
        .controller("/soc/intc@9", 2)
        .device_irqs("/soc/d1", &[("/soc/intc@5", 0)])
        .device_irqs("/soc/d2", &[("/soc/intc@9", 0)])
        .device_irqs("/soc/d3", &[("/soc/intc@9", 0)])
        .device_irqs("/soc/d4", &[("/soc/intc@5", 2)])
}
