//! IRQ header and source rendering.
//!
//! Four artefacts are produced from one [`IrqTree`]:
//! 1. **`irq.h`:** `SYS_DT_IRQN_<intc>_<line>` identifiers and `SYS_DT_IRQN_SIZE`.
//! 2. **`irq_internal.h`:** The `__sys_irq_intls[]` line table.
//! 3. **`irq_handler.h`:** Handler prototypes, inline per-line dispatchers, per-controller counts and FOREACH macros.
//! 4. **`irq_handler.c`:** Weak default handlers.

use std::fmt::Write as _;

use super::tree::{IntBranch, IrqTree};
use crate::config::IrqConfig;

const BANNER: &str = "/*\n * Generated from devicetree, do not edit.\n */\n";

/// Writes the provenance comment of a branch, each line prefixed by `indent`.
fn provenance(out: &mut String, tree: &IrqTree, branch: &IntBranch, indent: &str) {
    let intc_path = tree
        .controller(branch.intc)
        .map_or("?", |c| c.path.as_str());
    let _ = writeln!(out, "{indent}/*");
    let _ = writeln!(out, "{indent} * INTC: {intc_path}");
    let _ = writeln!(out, "{indent} * INTL: {}", branch.line);
    for irq in &branch.irqs {
        let _ = writeln!(out, "{indent} * IRQ: {}", irq.device_path);
    }
    let _ = writeln!(out, "{indent} */");
}

/// Renders the public header.
pub fn render_irq_h(tree: &IrqTree) -> String {
    let mut out = String::from(BANNER);
    for branch in tree.implemented() {
        out.push('\n');
        provenance(&mut out, tree, branch, "");
        if let Some(id) = branch.identifier {
            let _ = writeln!(
                out,
                "#define SYS_DT_IRQN_{}_{} {id}",
                branch.intc, branch.line
            );
        }
    }
    let _ = write!(
        out,
        "\n#define SYS_DT_IRQN_SIZE {}\n",
        tree.implemented_count()
    );
    out
}

/// Renders the internal header holding the line table. Without implemented
/// lines only the banner is written, since C has no zero-length arrays.
pub fn render_irq_internal_h(tree: &IrqTree) -> String {
    let mut out = String::from(BANNER);
    if tree.implemented_count() == 0 {
        return out;
    }
    out.push_str("\nstatic const struct sys_irq_intl __sys_irq_intls[] = {\n");
    for branch in tree.implemented() {
        provenance(&mut out, tree, branch, "\t");
        let _ = writeln!(
            out,
            "\t{{ .intc = &__device_dts_ord_{}, .intln = {} }},",
            branch.intc, branch.line
        );
    }
    out.push_str("};");
    out
}

/// Renders the inline dispatcher of one branch.
fn render_dispatcher(out: &mut String, branch: &IntBranch, config: &IrqConfig) {
    let _ = write!(out, "\nstatic inline void {}(void)\n{{\n", branch.handler_name());
    for irq in &branch.irqs {
        let _ = write!(
            out,
            "\tif ({}()) {{\n\t\treturn;\n\t}}\n\n",
            irq.handler_name()
        );
    }
    if config.dynamic {
        if let Some(id) = branch.identifier {
            let _ = write!(
                out,
                "\tif (sys_irq_dynamic_handler({id})) {{\n\t\treturn;\n\t}}\n\n"
            );
        }
    }
    if config.log_spurious {
        let _ = writeln!(
            out,
            "\tsys_irq_log_spurious_intl({}, {});",
            branch.intc, branch.line
        );
    }
    out.push_str("\tsys_irq_spurious_handler();\n}\n");
}

/// One FOREACH family member over `branches` of controller `intc`.
fn render_foreach<'a>(
    out: &mut String,
    name: &str,
    intc: u32,
    branches: impl Iterator<Item = &'a IntBranch>,
    sep: bool,
    vargs: bool,
) {
    let mut params = String::from("fn");
    if sep {
        params.push_str(", sep");
    }
    if vargs {
        params.push_str(", ...");
    }
    let joiner = if sep { " DT_DEBRACKET_INTERNAL sep " } else { ", " };
    let extra = if vargs { ", __VA_ARGS__" } else { "" };
    let body: Vec<String> = branches
        .map(|b| format!("fn({intc}, {}{extra})", b.line))
        .collect();

    let suffix = match (sep, vargs) {
        (false, false) => "",
        (true, false) => "_SEP",
        (false, true) => "_VARGS",
        (true, true) => "_SEP_VARGS",
    };
    let _ = writeln!(
        out,
        "#define SYS_DT_IRQ_FOREACH_{name}{suffix}_{intc}({params}) {}",
        body.join(joiner)
    );
}

/// Renders the dispatcher header.
///
/// # Arguments
///
/// * `tree` - The IRQ tree.
/// * `config` - Selects the dynamic-handler and spurious-logging calls.
pub fn render_irq_handler_h(tree: &IrqTree, config: &IrqConfig) -> String {
    let mut out = String::from(BANNER);

    let mut any = false;
    for irq in tree.irqs() {
        if !any {
            out.push('\n');
            any = true;
        }
        let _ = writeln!(out, "extern int {}(void);", irq.handler_name());
    }

    for branch in tree.branches() {
        render_dispatcher(&mut out, branch, config);
    }

    for intc in tree.controllers() {
        let ord = intc.ordinal;
        let implemented = tree.branches_of(ord).filter(|b| b.is_implemented()).count();
        out.push('\n');
        let _ = writeln!(out, "/* {} */", intc.path);
        let _ = writeln!(
            out,
            "#define SYS_DT_IRQ_NUM_INTLS_{ord} {}",
            intc.interrupt_lines
        );
        let _ = writeln!(out, "#define SYS_DT_IRQ_NUM_IMPL_INTLS_{ord} {implemented}");
        let _ = writeln!(
            out,
            "#define SYS_DT_IRQ_HAS_IMPL_INTLS_{ord} {}",
            u8::from(implemented > 0)
        );
        for (sep, vargs) in [(false, false), (true, false), (false, true), (true, true)] {
            render_foreach(&mut out, "INTL", ord, tree.branches_of(ord), sep, vargs);
        }
        for (sep, vargs) in [(false, false), (true, false), (false, true), (true, true)] {
            render_foreach(
                &mut out,
                "IMPL_INTL",
                ord,
                tree.branches_of(ord).filter(|b| b.is_implemented()),
                sep,
                vargs,
            );
        }
    }
    out
}

/// Renders the weak default handlers.
pub fn render_irq_handler_c(tree: &IrqTree) -> String {
    let mut out = String::from(BANNER);
    out.push_str("\n#include <zephyr/toolchain.h>\n");
    for irq in tree.irqs() {
        let _ = write!(
            out,
            "\n/* {} */\n__weak int {}(void)\n{{\n\treturn 0;\n}}\n",
            irq.device_path,
            irq.handler_name()
        );
    }
    out
}
