//! # Init Graph Properties
//!
//! Random acyclic devicetrees, with explicit levels pinned on some leaves:
//! every real node gets a unique priority in `0..N`, every dependency is
//! ordered before its dependent and never sits on a later level.

use dtgen_core::Kconfig;
use dtgen_core::init::Level;
use proptest::prelude::*;

use super::build_with;
use crate::common::edt::EdtBuilder;

/// Node `i` may depend on any `j < i`; `levels[i]` pins a level on leaves.
fn dag() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<Option<usize>>)> {
    (1usize..12).prop_flat_map(|n| {
        let edges = (0..n)
            .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(3)))
            .collect::<Vec<_>>();
        let levels = proptest::collection::vec(proptest::option::of(0usize..7), n);
        (edges, levels)
    })
}

proptest! {
    #[test]
    fn prop_priorities_respect_dependencies((edges, levels) in dag()) {
        let mut builder = EdtBuilder::new();
        for i in 0..edges.len() {
            builder = builder.node(&format!("/n{i}"));
        }
        let mut yaml = String::from("init:\n");
        for (i, deps) in edges.iter().enumerate() {
            let deps: Vec<usize> = deps.iter().copied().filter(|&j| j < i).collect();
            for &j in &deps {
                builder = builder.depends(&format!("/n{i}"), &format!("/n{j}"));
            }
            if deps.is_empty() {
                if let Some(rank) = levels[i] {
                    yaml.push_str(&format!("  /n{i}:\n    level: {}\n", Level::ALL[rank]));
                }
            }
        }

        let graph = build_with(&builder.build(), &Kconfig::default(), &yaml)
            .expect("acyclic graphs with leaf levels always order");

        let ordered = graph.by_priority();
        prop_assert_eq!(ordered.len(), edges.len());
        for (expected, &id) in ordered.iter().enumerate() {
            prop_assert_eq!(graph.node(id).dep_ordinal, Some(expected as u32));
        }

        for id in graph.real_ids() {
            let node = graph.node(id);
            for &dep in &node.deps {
                let dep_node = graph.node(dep);
                if dep_node.is_marker() {
                    continue;
                }
                prop_assert!(dep_node.dep_ordinal < node.dep_ordinal);
                if let (Some(l), Some(d)) = (node.level(), dep_node.level()) {
                    prop_assert!(d.rank() <= l.rank());
                }
            }
        }
    }
}
