//! Second-pass handles source rendering.

use std::fmt::Write as _;

use super::device::{DEVICE_HANDLE_ENDS, DEVICE_HANDLE_NULL, DEVICE_HANDLE_SEP};
use super::translate::{Rewrite, Translation};
use crate::edt::Edt;

const BANNER: &str = "/*\n * Generated from devicetree, do not edit.\n */\n";

const ARRAY_TYPE: &str = "const device_handle_t __aligned(2) \
                          __attribute__((__section__(\".__device_handles_pass2\")))";

fn handle_name(handle: i16) -> String {
    match handle {
        DEVICE_HANDLE_SEP => "DEVICE_HANDLE_SEP".to_owned(),
        DEVICE_HANDLE_ENDS => "DEVICE_HANDLE_ENDS".to_owned(),
        DEVICE_HANDLE_NULL => "DEVICE_HANDLE_NULL".to_owned(),
        h => h.to_string(),
    }
}

/// Appends one titled list of devicetree nodes; unused ones are parenthesized.
fn node_list(
    out: &mut String,
    title: &str,
    ordinals: &[u32],
    edt: &Edt,
    translation: &Translation<'_>,
) {
    if ordinals.is_empty() {
        return;
    }
    let _ = writeln!(out, " * {title}:");
    for &ordinal in ordinals {
        let path = edt
            .node(ordinal)
            .map_or_else(|| format!("ordinal {ordinal}"), |n| n.path.clone());
        if translation.is_used(ordinal) {
            let _ = writeln!(out, " *   - {path}");
        } else {
            let _ = writeln!(out, " *   - ({path})");
        }
    }
}

fn render_rewrite(out: &mut String, rewrite: &Rewrite<'_>, edt: &Edt, translation: &Translation<'_>) {
    let label = rewrite
        .node
        .map_or(rewrite.device.symbol.as_str(), |n| n.path.as_str());
    let _ = write!(out, "\n/* {} : {label}:\n", rewrite.device.handle);

    if let Some(node) = rewrite.node {
        node_list(out, "Direct Dependencies", &node.depends_on, edt, translation);
    }
    let injected: Vec<u32> = rewrite
        .handles
        .injected
        .iter()
        .filter_map(|&h| u32::try_from(h).ok())
        .collect();
    node_list(out, "Injected Dependencies", &injected, edt, translation);
    if let Some(node) = rewrite.node {
        node_list(out, "Supported", &node.required_by, edt, translation);
    }
    out.push_str(" */\n");

    let values: Vec<String> = rewrite.values().into_iter().map(handle_name).collect();
    let _ = write!(
        out,
        "{ARRAY_TYPE}\n{}[] = {{ {} }};\n",
        rewrite.handles.symbol,
        values.join(", ")
    );
}

/// Renders the second-pass handles source.
///
/// Without devices only the banner is written.
pub fn render(edt: &Edt, translation: &Translation<'_>) -> String {
    let mut out = String::from(BANNER);
    if translation.rewrites().is_empty() {
        return out;
    }
    out.push_str("\n#include <zephyr/device.h>\n#include <zephyr/toolchain.h>\n");
    for rewrite in translation.rewrites() {
        render_rewrite(&mut out, rewrite, edt, translation);
    }
    out
}
