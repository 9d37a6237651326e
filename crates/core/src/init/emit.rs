//! Init header rendering.

use std::fmt::Write as _;

use super::graph::InitGraph;

/// Banner at the top of the generated header.
const HEADER: &str = "/*\n * Generated from devicetree and init overlays, do not edit.\n */\n";

/// Renders the `ZINIT_*` macros for every ordered real node, in priority order.
///
/// Per node the header carries an `_EXISTS` flag, the explicit or implicit
/// level (when one was assigned) and the priority. EDT-backed nodes are
/// preceded by a comment naming their path.
pub fn render(graph: &InitGraph) -> String {
    let mut out = String::from(HEADER);
    for id in graph.by_priority() {
        let node = graph.node(id);
        let base = format!("ZINIT_{}", node.ident);

        out.push('\n');
        if node.edt_ordinal().is_some() {
            let _ = writeln!(out, "/* {} */", node.name);
        }
        let _ = writeln!(out, "#define {base}_EXISTS 1");
        if let Some(level) = node.level() {
            let kind = if node.is_explicit() { "EXPLICIT" } else { "IMPLICIT" };
            let _ = writeln!(out, "#define {base}_INIT_{kind}_LEVEL_EXISTS 1");
            let _ = writeln!(out, "#define {base}_INIT_{kind}_LEVEL {level}");
        }
        if let Some(priority) = node.dep_ordinal {
            let _ = writeln!(out, "#define {base}_INIT_PRIORITY {priority}");
        }
    }
    out
}
