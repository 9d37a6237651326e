//! Extended devicetree (EDT) loader.
//!
//! This module turns a serialized EDT into an immutable, ordinal-indexed node
//! table. It provides:
//! 1. **Loading:** JSON decoding plus derivation of optional fields (names, statuses, reverse edges, path ids, SCC order).
//! 2. **Queries:** Lookup by ordinal, path, name, label, compatible, `/chosen` and `/aliases`.
//! 3. **Exclusions:** Identification of the bookkeeping nodes that never take part in init ordering.

/// Serde document types.
pub mod document;
/// Path and identifier helpers.
pub mod ident;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph;

pub use document::{EdtDocument, InterruptDocument, NodeDocument};

/// Status values that make a node visible to the IRQ tree.
pub const ENABLED_STATUSES: [&str; 2] = ["okay", "reserved"];

/// An interrupt routed from a node to a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interrupt {
    /// Controller ordinal.
    pub controller: u32,
    /// Specifier cells by name.
    pub data: IndexMap<String, u64>,
}

/// A devicetree node as seen by the generators.
#[derive(Debug, Clone, PartialEq)]
pub struct EdtNode {
    /// Stable dependency ordinal.
    pub dep_ordinal: u32,
    /// Absolute path.
    pub path: String,
    /// Node name (`uart@1000`).
    pub name: String,
    /// Parent ordinal; `None` only for the root.
    pub parent: Option<u32>,
    /// Ordinals this node depends on.
    pub depends_on: Vec<u32>,
    /// Ordinals that depend on this node.
    pub required_by: Vec<u32>,
    /// Normalized status (`okay`, `reserved`, `disabled`, ...).
    pub status: String,
    /// Compatible strings.
    pub compats: Vec<String>,
    /// DTS labels.
    pub labels: Vec<String>,
    /// Property values.
    pub props: IndexMap<String, serde_json::Value>,
    /// Interrupt specifiers.
    pub interrupts: Vec<Interrupt>,
    /// Path identifier (`N_S_soc_S_uart_1000`).
    pub z_path_id: String,
}

impl EdtNode {
    /// Returns true when the status is `okay` or `reserved`.
    pub fn is_enabled(&self) -> bool {
        ENABLED_STATUSES.contains(&self.status.as_str())
    }

    /// Returns true for the node carrying an `interrupt-controller` property.
    pub fn is_interrupt_controller(&self) -> bool {
        self.props.contains_key("interrupt-controller")
    }

    /// Reads an integer property.
    pub fn int_prop(&self, name: &str) -> Option<i64> {
        self.props.get(name).and_then(serde_json::Value::as_i64)
    }
}

/// Immutable devicetree, indexed by dependency ordinal.
#[derive(Debug, Clone)]
pub struct Edt {
    nodes: Vec<EdtNode>,
    by_ordinal: BTreeMap<u32, usize>,
    by_path: HashMap<String, usize>,
    scc_order: Vec<Vec<u32>>,
    chosen: IndexMap<String, u32>,
    aliases: IndexMap<String, u32>,
}

impl Edt {
    /// Loads a serialized EDT from disk.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the JSON-serialized EDT.
    ///
    /// # Returns
    ///
    /// The validated node table.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let document: EdtDocument =
            serde_json::from_str(&text).map_err(|source| Error::EdtFormat {
                path: path.to_path_buf(),
                source,
            })?;
        let edt = Self::from_document(document)?;
        debug!(path = %path.display(), nodes = edt.nodes.len(), "loaded EDT");
        Ok(edt)
    }

    /// Builds the node table from a decoded document.
    ///
    /// Derives every optional field and checks that all ordinal references
    /// resolve, that ordinals and paths are unique and that ordinal 0 is `/`.
    pub fn from_document(document: EdtDocument) -> Result<Self> {
        let mut raw = document.nodes;
        raw.sort_by_key(|n| n.dep_ordinal);

        let mut by_ordinal = BTreeMap::new();
        let mut by_path = HashMap::new();
        for (i, n) in raw.iter().enumerate() {
            if by_ordinal.insert(n.dep_ordinal, i).is_some() {
                return Err(Error::EdtInconsistent(format!(
                    "ordinal {} used twice",
                    n.dep_ordinal
                )));
            }
            if by_path.insert(n.path.clone(), i).is_some() {
                return Err(Error::EdtInconsistent(format!("path {} used twice", n.path)));
            }
        }
        match raw.first() {
            Some(root) if root.dep_ordinal == 0 && root.path == "/" => {}
            _ => {
                return Err(Error::EdtInconsistent(
                    "ordinal 0 must be the root node '/'".into(),
                ));
            }
        }

        let known = |ord: u32, what: &str, owner: &str| -> Result<()> {
            if by_ordinal.contains_key(&ord) {
                Ok(())
            } else {
                Err(Error::EdtInconsistent(format!(
                    "{owner}: {what} references unknown ordinal {ord}"
                )))
            }
        };

        let mut inverted: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for n in &raw {
            for &dep in &n.depends_on {
                known(dep, "depends_on", &n.path)?;
                inverted.entry(dep).or_default().push(n.dep_ordinal);
            }
            if let Some(parent) = n.parent {
                known(parent, "parent", &n.path)?;
            }
            for irq in &n.interrupts {
                known(irq.controller, "interrupts", &n.path)?;
            }
            for &req in n.required_by.iter().flatten() {
                known(req, "required_by", &n.path)?;
            }
        }
        for target in document.chosen.values().chain(document.aliases.values()) {
            known(*target, "chosen/aliases", "/")?;
        }

        let nodes: Vec<EdtNode> = raw
            .into_iter()
            .map(|n| {
                let name = n.name.unwrap_or_else(|| default_name(&n.path));
                let status = match n.status.as_deref() {
                    None | Some("ok") => "okay".to_string(),
                    Some(s) => s.to_string(),
                };
                let required_by = n
                    .required_by
                    .unwrap_or_else(|| inverted.remove(&n.dep_ordinal).unwrap_or_default());
                let z_path_id = n.z_path_id.unwrap_or_else(|| ident::z_path_id(&n.path));
                EdtNode {
                    dep_ordinal: n.dep_ordinal,
                    path: n.path,
                    name,
                    parent: n.parent,
                    depends_on: n.depends_on,
                    required_by,
                    status,
                    compats: n.compats,
                    labels: n.labels,
                    props: n.props,
                    interrupts: n
                        .interrupts
                        .into_iter()
                        .map(|i| Interrupt {
                            controller: i.controller,
                            data: i.data,
                        })
                        .collect(),
                    z_path_id,
                }
            })
            .collect();

        let scc_order = match document.scc_order {
            Some(order) => {
                for &ord in order.iter().flatten() {
                    known(ord, "scc_order", "/")?;
                }
                order
            }
            None => compute_scc_order(&nodes, &by_ordinal),
        };

        Ok(Self {
            nodes,
            by_ordinal,
            by_path,
            scc_order,
            chosen: document.chosen,
            aliases: document.aliases,
        })
    }

    /// Iterates all nodes in ordinal order.
    pub fn nodes(&self) -> impl Iterator<Item = &EdtNode> {
        self.nodes.iter()
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the tree holds no node at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks a node up by dependency ordinal.
    pub fn node(&self, ordinal: u32) -> Option<&EdtNode> {
        self.by_ordinal.get(&ordinal).map(|&i| &self.nodes[i])
    }

    /// Looks a node up by absolute path.
    pub fn node_by_path(&self, path: &str) -> Option<&EdtNode> {
        self.by_path.get(path).map(|&i| &self.nodes[i])
    }

    /// All nodes whose name is `name`, in ordinal order.
    pub fn nodes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a EdtNode> + 'a {
        self.nodes.iter().filter(move |n| n.name == name)
    }

    /// The root node (ordinal 0).
    pub fn root(&self) -> &EdtNode {
        // from_document guarantees the root sits first
        &self.nodes[0]
    }

    /// The SCC order of ordinals, dependencies first.
    pub fn scc_order(&self) -> &[Vec<u32>] {
        &self.scc_order
    }

    /// Node a `/chosen` property points at.
    pub fn chosen_node(&self, name: &str) -> Option<&EdtNode> {
        self.chosen.get(name).and_then(|&o| self.node(o))
    }

    /// Node an alias points at.
    pub fn aliases_node(&self, name: &str) -> Option<&EdtNode> {
        self.aliases.get(name).and_then(|&o| self.node(o))
    }

    /// Node carrying the DTS label `label`.
    pub fn label2node(&self, label: &str) -> Option<&EdtNode> {
        self.nodes
            .iter()
            .find(|n| n.labels.iter().any(|l| l == label))
    }

    /// Nodes listing `compat` among their compatibles, in ordinal order.
    pub fn compat2nodes(&self, compat: &str) -> Vec<&EdtNode> {
        self.nodes
            .iter()
            .filter(|n| n.compats.iter().any(|c| c == compat))
            .collect()
    }

    /// Returns true for the root, `/aliases` and `/chosen`.
    pub fn is_excluded(node: &EdtNode) -> bool {
        matches!(node.path.as_str(), "/" | "/aliases" | "/chosen")
    }
}

fn default_name(path: &str) -> String {
    match path.rsplit('/').find(|c| !c.is_empty()) {
        Some(last) => last.to_string(),
        None => "/".to_string(),
    }
}

fn compute_scc_order(nodes: &[EdtNode], by_ordinal: &BTreeMap<u32, usize>) -> Vec<Vec<u32>> {
    let adjacency: Vec<Vec<usize>> = nodes
        .iter()
        .map(|n| n.depends_on.iter().map(|d| by_ordinal[d]).collect())
        .collect();
    let components = graph::strongly_connected(&adjacency);
    graph::leaves_first(&adjacency, &components)
        .into_iter()
        .map(|c| components[c].iter().map(|&i| nodes[i].dep_ordinal).collect())
        .collect()
}
