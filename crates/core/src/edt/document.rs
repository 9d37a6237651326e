//! On-disk representation of a serialized EDT.
//!
//! The document mirrors what the devicetree tooling knows about each node. Most
//! fields are optional; [`Edt::from_document`](super::Edt::from_document) fills
//! in whatever can be derived.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A whole serialized devicetree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdtDocument {
    /// Every node, in any order.
    pub nodes: Vec<NodeDocument>,
    /// Pre-computed SCC order of ordinals; derived when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scc_order: Option<Vec<Vec<u32>>>,
    /// `/chosen` entries: name to ordinal.
    pub chosen: IndexMap<String, u32>,
    /// `/aliases` entries: name to ordinal.
    pub aliases: IndexMap<String, u32>,
}

/// One devicetree node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDocument {
    /// Stable dependency ordinal; the root is 0.
    pub dep_ordinal: u32,
    /// Absolute `/`-separated path.
    pub path: String,
    /// Node name; last path component when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parent ordinal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    /// Ordinals this node depends on.
    pub depends_on: Vec<u32>,
    /// Ordinals depending on this node; inverted from `depends_on` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_by: Option<Vec<u32>>,
    /// `status` property; `okay` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Compatible strings, most specific first.
    pub compats: Vec<String>,
    /// DTS labels.
    pub labels: Vec<String>,
    /// Typed property values.
    pub props: IndexMap<String, serde_json::Value>,
    /// Interrupt specifiers.
    pub interrupts: Vec<InterruptDocument>,
    /// Precomputed path identifier; derived when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_path_id: Option<String>,
}

/// One entry of an `interrupts` property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptDocument {
    /// Ordinal of the controller the interrupt is routed to.
    pub controller: u32,
    /// Specifier cells by name, e.g. `irq`, `priority`.
    #[serde(default)]
    pub data: IndexMap<String, u64>,
}
