//! Init graph arena.
//!
//! Nodes live in one vector and refer to each other by [`NodeId`]. The seven
//! level markers always occupy ids 0..=6 (their rank), so a [`Level`] doubles
//! as a pointer to its marker node.

use std::collections::HashMap;

use super::level::Level;

/// Index of a node in an [`InitGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The id as a vector index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<Level> for NodeId {
    fn from(level: Level) -> Self {
        Self(u32::from(level.rank()))
    }
}

/// What a node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// One of the seven level markers.
    Level(Level),
    /// Something that gets initialized.
    Real {
        /// Devicetree ordinal when the node comes from the EDT.
        edt: Option<u32>,
        /// Assigned level, explicit or implicit.
        level: Option<Level>,
        /// Whether `level` was set by an overlay.
        explicit: bool,
    },
}

/// A vertex of the init graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitNode {
    /// Resolved name: the EDT path or the plain overlay name.
    pub name: String,
    /// C identifier fragment used in emitted macros.
    pub ident: String,
    /// Marker or real node.
    pub kind: NodeKind,
    /// Hard dependencies, in insertion order, without duplicates.
    pub deps: Vec<NodeId>,
    /// Position in the topological order; `None` until ordered.
    pub dep_ordinal: Option<u32>,
}

impl InitNode {
    /// Returns true for level markers.
    pub const fn is_marker(&self) -> bool {
        matches!(self.kind, NodeKind::Level(_))
    }

    /// The level a node sits on: the marker itself, or a real node's assigned level.
    pub const fn level(&self) -> Option<Level> {
        match self.kind {
            NodeKind::Level(level) => Some(level),
            NodeKind::Real { level, .. } => level,
        }
    }

    /// Returns true when the level comes from an overlay.
    pub const fn is_explicit(&self) -> bool {
        matches!(self.kind, NodeKind::Real { explicit: true, .. })
    }

    /// Devicetree ordinal of the wrapped EDT node.
    pub const fn edt_ordinal(&self) -> Option<u32> {
        match self.kind {
            NodeKind::Real { edt, .. } => edt,
            NodeKind::Level(_) => None,
        }
    }
}

/// Dependency graph of everything that gets initialized.
#[derive(Debug, Clone)]
pub struct InitGraph {
    nodes: Vec<InitNode>,
    by_name: HashMap<String, NodeId>,
}

impl Default for InitGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InitGraph {
    /// Creates a graph holding only the chained level markers.
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            by_name: HashMap::new(),
        };
        for level in Level::ALL {
            let id = graph.push(InitNode {
                name: level.name().to_string(),
                ident: level.name().to_string(),
                kind: NodeKind::Level(level),
                deps: level.previous().map(NodeId::from).into_iter().collect(),
                dep_ordinal: None,
            });
            debug_assert_eq!(id, NodeId::from(level));
        }
        graph
    }

    fn push(&mut self, node: InitNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let _ = self.by_name.insert(node.name.clone(), id);
        self.nodes.push(node);
        id
    }

    /// Returns the node named `name`, creating a real node when missing.
    ///
    /// # Arguments
    ///
    /// * `name` - Resolved name (EDT path or plain identifier).
    /// * `ident` - Macro identifier fragment for a new node.
    /// * `edt` - Devicetree ordinal for EDT-backed nodes.
    pub fn intern(&mut self, name: &str, ident: impl FnOnce() -> String, edt: Option<u32>) -> NodeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        self.push(InitNode {
            name: name.to_string(),
            ident: ident(),
            kind: NodeKind::Real {
                edt,
                level: None,
                explicit: false,
            },
            deps: Vec::new(),
            dep_ordinal: None,
        })
    }

    /// Looks a node up by resolved name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Adds the hard dependency `from -> to` unless already present.
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId) {
        let deps = &mut self.nodes[from.index()].deps;
        if !deps.contains(&to) {
            deps.push(to);
        }
    }

    /// Sets a real node's level. Markers are left untouched.
    pub fn set_level(&mut self, id: NodeId, new_level: Option<Level>, is_explicit: bool) {
        if let NodeKind::Real {
            level, explicit, ..
        } = &mut self.nodes[id.index()].kind
        {
            *level = new_level;
            *explicit = is_explicit;
        }
    }

    /// Records a node's topological position.
    pub fn set_ordinal(&mut self, id: NodeId, ordinal: u32) {
        self.nodes[id.index()].dep_ordinal = Some(ordinal);
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &InitNode {
        &self.nodes[id.index()]
    }

    /// Number of vertices, markers included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the markers are permanent.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All ids, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Ids of real nodes, in insertion order.
    pub fn real_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids().filter(|&id| !self.node(id).is_marker())
    }

    /// Real nodes sorted by assigned ordinal; unordered nodes are skipped.
    pub fn by_priority(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .real_ids()
            .filter(|&id| self.node(id).dep_ordinal.is_some())
            .collect();
        ids.sort_by_key(|&id| self.node(id).dep_ordinal);
        ids
    }

    /// Adjacency lists over vertex indices.
    ///
    /// With `level_edges`, every real node with a level also points at its
    /// level marker.
    pub fn adjacency(&self, level_edges: bool) -> Vec<Vec<usize>> {
        self.nodes
            .iter()
            .map(|n| {
                let mut out: Vec<usize> = n.deps.iter().map(|d| d.index()).collect();
                if level_edges && !n.is_marker() {
                    if let Some(level) = n.level() {
                        let marker = NodeId::from(level).index();
                        if !out.contains(&marker) {
                            out.push(marker);
                        }
                    }
                }
                out
            })
            .collect()
    }
}
