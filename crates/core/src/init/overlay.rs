//! YAML init overlays and their merge into the init graph.
//!
//! An overlay looks like:
//!
//! ```yaml
//! init:
//!   /soc/uart@1000:
//!     level: PRE_KERNEL_1
//!     dependencies: [clock, "vnd,gpio"]
//!     if: CONFIG_UART_ASYNC
//!     then:
//!       dependencies: [dma0]
//! ```
//!
//! Keys and dependency names resolve through the devicetree (path, label,
//! chosen, alias, compatible, node name) and otherwise become plain named
//! nodes when they are valid C identifiers.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use super::graph::{InitGraph, NodeId};
use super::level::Level;
use crate::edt::{Edt, EdtNode, ident};
use crate::error::{Error, Result};
use crate::kconfig::Kconfig;

/// Level and dependencies applied by a clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Explicit level name.
    #[serde(default)]
    pub level: Option<String>,
    /// Names of extra hard dependencies.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// One `init:` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Clause {
    /// Explicit level name, applied unconditionally.
    #[serde(default)]
    pub level: Option<String>,
    /// Extra hard dependencies, applied unconditionally.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Kconfig symbol gating `then`.
    #[serde(default, rename = "if")]
    pub condition: Option<String>,
    /// Settings applied when `condition` is set.
    #[serde(default)]
    pub then: Option<Settings>,
}

/// A parsed overlay file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Overlay {
    /// Where the overlay was read from, for diagnostics.
    #[serde(skip)]
    pub origin: PathBuf,
    /// Entries in file order; a null entry carries no settings.
    #[serde(default)]
    pub init: IndexMap<String, Option<Clause>>,
}

impl Overlay {
    /// Reads and parses an overlay file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text, path)
    }

    /// Parses overlay text; `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        // an empty file is a valid, empty overlay
        if text.trim().is_empty() {
            return Ok(Self {
                origin: origin.to_path_buf(),
                ..Self::default()
            });
        }
        let mut overlay: Self =
            serde_yaml::from_str(text).map_err(|source| Error::OverlayFormat {
                path: origin.to_path_buf(),
                source,
            })?;
        overlay.origin = origin.to_path_buf();
        Ok(overlay)
    }
}

/// Parses a level name from a clause, failing on unknown markers.
fn parse_level(key: &str, level: Option<&String>) -> Result<Option<Level>> {
    level
        .map(|name| {
            Level::from_name(name).ok_or_else(|| Error::UnknownLevel {
                key: key.to_string(),
                level: name.clone(),
            })
        })
        .transpose()
}

/// Identifier fragment for an EDT-backed node.
pub fn edt_ident(node: &EdtNode) -> String {
    format!("DT_{}", node.z_path_id)
}

/// Identifier fragment for a plain named node.
pub fn plain_ident(name: &str) -> String {
    name.replace(['@', '-'], "_")
}

/// Folds the EDT, then each overlay, into an init graph.
#[derive(Debug)]
pub struct Merger<'a> {
    edt: &'a Edt,
    kconfig: &'a Kconfig,
    graph: InitGraph,
}

impl<'a> Merger<'a> {
    /// Seeds a graph with every non-excluded EDT node and its `depends_on` edges.
    ///
    /// Nodes are inserted in ordinal order before any edge is added, which
    /// fixes the insertion order used by every later tie-break.
    pub fn new(edt: &'a Edt, kconfig: &'a Kconfig) -> Self {
        let mut graph = InitGraph::new();
        let seeded: Vec<(&EdtNode, NodeId)> = edt
            .nodes()
            .filter(|n| !Edt::is_excluded(n))
            .map(|n| (n, graph.intern(&n.path, || edt_ident(n), Some(n.dep_ordinal))))
            .collect();

        for (node, id) in &seeded {
            for dep in node.depends_on.iter().filter_map(|&o| edt.node(o)) {
                if Edt::is_excluded(dep) {
                    continue;
                }
                if let Some(dep_id) = graph.find(&dep.path) {
                    graph.add_dependency(*id, dep_id);
                }
            }
        }
        debug!(nodes = seeded.len(), "seeded init graph from EDT");

        Self {
            edt,
            kconfig,
            graph,
        }
    }

    /// Resolves an overlay name to graph nodes, creating plain nodes on demand.
    ///
    /// # Arguments
    ///
    /// * `name` - Key or dependency name from an overlay.
    /// * `allow_marker` - Whether a level marker name may resolve to its marker.
    ///
    /// # Returns
    ///
    /// Every node the name stands for; empty when it resolves to nothing.
    pub fn resolve(&mut self, name: &str, allow_marker: bool) -> Vec<NodeId> {
        if let Some(level) = Level::from_name(name) {
            return if allow_marker {
                vec![NodeId::from(level)]
            } else {
                Vec::new()
            };
        }

        let edt = self.edt;
        let found: Vec<&EdtNode> = if name.starts_with('/') {
            edt.node_by_path(name).into_iter().collect()
        } else if let Some(n) = edt.label2node(name) {
            vec![n]
        } else if let Some(n) = edt.chosen_node(name) {
            vec![n]
        } else if let Some(n) = edt.aliases_node(name) {
            vec![n]
        } else {
            let by_compat = edt.compat2nodes(name);
            if by_compat.is_empty() {
                edt.nodes_named(name).collect()
            } else {
                by_compat
            }
        };

        if !found.is_empty() {
            return found
                .into_iter()
                .filter(|n| !Edt::is_excluded(n))
                .map(|n| self.graph.intern(&n.path, || edt_ident(n), Some(n.dep_ordinal)))
                .collect();
        }

        if ident::is_c_identifier(name) {
            return vec![self.graph.intern(name, || plain_ident(name), None)];
        }
        Vec::new()
    }

    /// Applies one overlay on top of the graph built so far.
    pub fn apply(&mut self, overlay: &Overlay) -> Result<()> {
        for (key, clause) in &overlay.init {
            let Some(clause) = clause else {
                let _ = self.resolve(key, false);
                continue;
            };

            let level = parse_level(key, clause.level.as_ref())?;
            let then_level = parse_level(
                key,
                clause.then.as_ref().and_then(|t| t.level.as_ref()),
            )?;

            let targets = self.resolve(key, false);
            if targets.is_empty() {
                warn!(
                    overlay = %overlay.origin.display(),
                    key = %key,
                    "overlay key resolves to nothing, skipped"
                );
                continue;
            }

            self.apply_settings(&targets, level, &clause.dependencies);

            let Some(condition) = &clause.condition else {
                continue;
            };
            if !self.kconfig.is_set(condition) {
                debug!(key = %key, condition = %condition, "condition not set");
                continue;
            }
            if let Some(then) = &clause.then {
                self.apply_settings(&targets, then_level, &then.dependencies);
            }
        }
        Ok(())
    }

    fn apply_settings(&mut self, targets: &[NodeId], level: Option<Level>, deps: &[String]) {
        let mut resolved = Vec::new();
        for name in deps {
            let ids = self.resolve(name, true);
            if ids.is_empty() {
                debug!(dependency = %name, "dependency resolves to nothing, dropped");
            }
            resolved.extend(ids);
        }

        for &target in targets {
            if let Some(level) = level {
                self.graph.set_level(target, Some(level), true);
            }
            for &dep in &resolved {
                self.graph.add_dependency(target, dep);
            }
        }
    }

    /// The graph built so far.
    pub const fn graph(&self) -> &InitGraph {
        &self.graph
    }

    /// Finishes merging and hands over the graph.
    pub fn into_graph(self) -> InitGraph {
        self.graph
    }
}
