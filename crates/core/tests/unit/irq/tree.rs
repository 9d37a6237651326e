//! # IRQ Tree Tests
//!
//! Branch construction, dense identifiers and routing errors.

use dtgen_core::Error;
use dtgen_core::irq::IrqTree;
use proptest::prelude::*;

use super::two_controllers;
use crate::common::edt::EdtBuilder;

#[test]
fn test_dense_identifiers() {
    let tree = IrqTree::build(&two_controllers().build()).expect("valid routing");

    let ids: Vec<(u32, u32, Option<u32>)> = tree
        .branches()
        .iter()
        .map(|b| (b.intc, b.line, b.identifier))
        .collect();
    assert_eq!(
        ids,
        [
            (5, 0, Some(0)),
            (5, 1, None),
            (5, 2, Some(1)),
            (9, 0, Some(2)),
            (9, 1, None),
        ]
    );
    assert_eq!(tree.implemented_count(), 3);
    assert_eq!(tree.controllers().len(), 2);
}

#[test]
fn test_shared_line_keeps_device_order() {
    let tree = IrqTree::build(&two_controllers().build()).expect("valid routing");
    let branch = tree
        .branches()
        .iter()
        .find(|b| (b.intc, b.line) == (9, 0))
        .expect("branch");
    let devices: Vec<&str> = branch.irqs.iter().map(|i| i.device_path.as_str()).collect();
    assert_eq!(devices, ["/soc/d2", "/soc/d3"]);
    assert_eq!(branch.irqs[0].handler_name(), "__sys_irq_handler_9_0_11");
    assert_eq!(branch.handler_name(), "__sys_intl_handler_9_0");
}

#[test]
fn test_single_unused_line_still_has_a_branch() {
    let tree = IrqTree::build(&EdtBuilder::new().controller("/intc", 1).build()).expect("valid");
    assert_eq!(tree.branches().len(), 1);
    assert!(!tree.branches()[0].is_implemented());
    assert_eq!(tree.branches()[0].identifier, None);
    assert_eq!(tree.implemented_count(), 0);
}

#[test]
fn test_disabled_devices_are_ignored() {
    let edt = EdtBuilder::new()
        .controller("/intc", 2)
        .device_irqs("/uart", &[("/intc", 1)])
        .status("/uart", "disabled")
        .build();
    let tree = IrqTree::build(&edt).expect("valid");
    assert_eq!(tree.implemented_count(), 0);
    assert_eq!(tree.irqs().count(), 0);
}

#[test]
fn test_repeated_specifier_counts_once() {
    let edt = EdtBuilder::new()
        .controller("/intc", 2)
        .device_irqs("/uart", &[("/intc", 1), ("/intc", 1)])
        .build();
    let tree = IrqTree::build(&edt).expect("valid");
    assert_eq!(tree.irqs().count(), 1);
}

#[test]
fn test_zero_lines_is_fatal() {
    let err = IrqTree::build(&EdtBuilder::new().controller("/intc", 0).build()).unwrap_err();
    assert!(matches!(err, Error::InvalidInterruptLines { path } if path == "/intc"));
}

#[test]
fn test_line_out_of_range_is_fatal() {
    let edt = EdtBuilder::new()
        .controller("/intc", 2)
        .device_irqs("/uart", &[("/intc", 2)])
        .build();
    let err = IrqTree::build(&edt).unwrap_err();
    assert!(matches!(err, Error::InterruptLineOutOfRange { line: 2, lines: 2, .. }));
}

#[test]
fn test_parent_must_be_a_controller() {
    let edt = EdtBuilder::new()
        .node("/gpio")
        .device_irqs("/uart", &[("/gpio", 0)])
        .build();
    let err = IrqTree::build(&edt).unwrap_err();
    assert!(matches!(err, Error::UnknownInterruptController { controller: 1, .. }));
}

#[test]
fn test_missing_irq_cell_is_fatal() {
    let mut doc = EdtBuilder::new()
        .controller("/intc", 2)
        .device_irqs("/uart", &[("/intc", 0)])
        .document();
    let _ = doc.nodes[2].interrupts[0].data.shift_remove("irq");
    let edt = dtgen_core::Edt::from_document(doc).expect("valid EDT");
    let err = IrqTree::build(&edt).unwrap_err();
    assert!(matches!(err, Error::MissingInterruptLine { device } if device == "/uart"));
}

proptest! {
    #[test]
    fn prop_identifiers_are_contiguous(
        lines in proptest::collection::vec(1i64..5, 1..4),
        picks in proptest::collection::vec((0usize..4, 0u64..5), 0..10),
    ) {
        let mut builder = EdtBuilder::new();
        for (c, &n) in lines.iter().enumerate() {
            builder = builder.controller(&format!("/intc{c}"), n);
        }
        for (d, &(c, line)) in picks.iter().enumerate() {
            let c = c % lines.len();
            let line = line % lines[c] as u64;
            builder = builder.device_irqs(&format!("/dev{d}"), &[(format!("/intc{c}").as_str(), line)]);
        }
        let tree = IrqTree::build(&builder.build()).expect("in-range routing");

        let ids: Vec<u32> = tree.implemented().filter_map(|b| b.identifier).collect();
        let expected: Vec<u32> = (0..tree.implemented_count() as u32).collect();
        prop_assert_eq!(ids, expected);
        prop_assert!(tree.branches().iter().all(|b| b.is_implemented() == b.identifier.is_some()));
        prop_assert!(tree.branches().windows(2).all(|w| (w[0].intc, w[0].line) < (w[1].intc, w[1].line)));
    }
}
