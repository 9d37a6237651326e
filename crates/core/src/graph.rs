//! Index-based directed graph helpers.
//!
//! Graphs are plain adjacency lists over dense `usize` indices, where an edge
//! `u -> v` means "`u` depends on `v`". Index order doubles as insertion order,
//! which is what every tie-break in this crate falls back to.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

const UNVISITED: usize = usize::MAX;

/// Iterative Tarjan state.
struct Tarjan<'a> {
    adjacency: &'a [Vec<usize>],
    index: Vec<usize>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    frames: Vec<(usize, usize)>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

impl<'a> Tarjan<'a> {
    fn new(adjacency: &'a [Vec<usize>]) -> Self {
        let n = adjacency.len();
        Self {
            adjacency,
            index: vec![UNVISITED; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            frames: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        }
    }

    fn enter(&mut self, node: usize) {
        self.index[node] = self.next_index;
        self.lowlink[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;
        self.frames.push((node, 0));
    }

    fn run(mut self) -> Vec<Vec<usize>> {
        for root in 0..self.adjacency.len() {
            if self.index[root] != UNVISITED {
                continue;
            }
            self.enter(root);
            while let Some(&(node, edge)) = self.frames.last() {
                if let Some(&succ) = self.adjacency[node].get(edge) {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.1 += 1;
                    }
                    if self.index[succ] == UNVISITED {
                        self.enter(succ);
                    } else if self.on_stack[succ] {
                        self.lowlink[node] = self.lowlink[node].min(self.index[succ]);
                    }
                    continue;
                }

                let _ = self.frames.pop();
                if let Some(&(parent, _)) = self.frames.last() {
                    self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[node]);
                }
                if self.lowlink[node] == self.index[node] {
                    let mut component = Vec::new();
                    while let Some(member) = self.stack.pop() {
                        self.on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    component.sort_unstable();
                    self.components.push(component);
                }
            }
        }
        self.components
    }
}

/// Splits a graph into strongly connected components.
///
/// Components come out dependencies-first (a component is emitted only after
/// every component it can reach), and members of each component are sorted by
/// index.
///
/// # Arguments
///
/// * `adjacency` - Outgoing edges per node.
///
/// # Returns
///
/// The components as lists of node indices.
pub fn strongly_connected(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    Tarjan::new(adjacency).run()
}

/// Returns true when a component cannot be ordered: it has several members,
/// or its only member depends on itself.
pub fn is_cyclic(adjacency: &[Vec<usize>], component: &[usize]) -> bool {
    match component {
        [single] => adjacency[*single].contains(single),
        _ => component.len() > 1,
    }
}

/// Orders components leaves-first with deterministic tie-breaking.
///
/// A component becomes ready once every component it depends on has been
/// emitted. Among ready components the one holding the lowest node index goes
/// first, so the result only depends on insertion order, never on traversal
/// order.
///
/// # Arguments
///
/// * `adjacency` - Outgoing edges per node.
/// * `components` - Output of [`strongly_connected`].
///
/// # Returns
///
/// Indices into `components`, in emission order.
pub fn leaves_first(adjacency: &[Vec<usize>], components: &[Vec<usize>]) -> Vec<usize> {
    let mut component_of = vec![0; adjacency.len()];
    for (c, members) in components.iter().enumerate() {
        for &m in members {
            component_of[m] = c;
        }
    }

    let mut pending = vec![0usize; components.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); components.len()];
    for (c, members) in components.iter().enumerate() {
        let mut deps: Vec<usize> = members
            .iter()
            .flat_map(|&m| adjacency[m].iter().map(|&v| component_of[v]))
            .filter(|&d| d != c)
            .collect();
        deps.sort_unstable();
        deps.dedup();
        pending[c] = deps.len();
        for d in deps {
            dependents[d].push(c);
        }
    }

    let key = |c: usize| components[c].first().copied().unwrap_or(usize::MAX);
    let mut ready: BinaryHeap<Reverse<(usize, usize)>> = (0..components.len())
        .filter(|&c| pending[c] == 0)
        .map(|c| Reverse((key(c), c)))
        .collect();

    let mut order = Vec::with_capacity(components.len());
    while let Some(Reverse((_, c))) = ready.pop() {
        order.push(c);
        for &dependent in &dependents[c] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse((key(dependent), dependent)));
            }
        }
    }
    order
}
