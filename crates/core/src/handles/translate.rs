//! Handle translation over the used-device subgraph.
//!
//! Only devicetree nodes backed by a device object ("used" nodes) keep a
//! runtime handle. A dependency on a node without a device is replaced by
//! that node's own dependencies, walking outward until used nodes are found,
//! so the rewritten arrays describe the devicetree graph induced on the used
//! nodes. Supported devices are derived the same way along `required_by`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, warn};

use super::device::{
    DEVICE_HANDLE_ENDS, DEVICE_HANDLE_NULL, DEVICE_HANDLE_SEP, Device, DeviceTable, Handles,
};
use crate::edt::{Edt, EdtNode};
use crate::error::{Error, Result};

/// Rewritten handles of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite<'a> {
    /// The device.
    pub device: &'a Device,
    /// Its first-pass handles array.
    pub handles: &'a Handles,
    /// Its devicetree node, if it has one.
    pub node: Option<&'a EdtNode>,
    /// Handles of induced dependencies, ascending.
    pub depends: Vec<i16>,
    /// Handles of injected dependencies, in first-pass order.
    pub injected: Vec<i16>,
    /// Handles of induced supported devices, ascending.
    pub supports: Vec<i16>,
    /// `DEVICE_HANDLE_NULL` slots reserved after the supported devices.
    pub padding: usize,
}

impl Rewrite<'_> {
    /// The complete second-pass array.
    pub fn values(&self) -> Vec<i16> {
        let mut values = Vec::with_capacity(
            self.depends.len() + self.injected.len() + self.supports.len() + self.padding + 3,
        );
        values.extend_from_slice(&self.depends);
        values.push(DEVICE_HANDLE_SEP);
        values.extend_from_slice(&self.injected);
        values.push(DEVICE_HANDLE_SEP);
        values.extend_from_slice(&self.supports);
        values.extend(std::iter::repeat_n(DEVICE_HANDLE_NULL, self.padding));
        values.push(DEVICE_HANDLE_ENDS);
        values
    }
}

/// Every device's rewrite plus the used-node map they were computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation<'a> {
    used: BTreeMap<u32, &'a Device>,
    rewrites: Vec<Rewrite<'a>>,
}

impl<'a> Translation<'a> {
    /// Rewrites in device address order.
    pub fn rewrites(&self) -> &[Rewrite<'a>] {
        &self.rewrites
    }

    /// Returns true when the devicetree node `ordinal` has a device.
    pub fn is_used(&self, ordinal: u32) -> bool {
        self.used.contains_key(&ordinal)
    }

    /// Device bound to the node `ordinal`.
    pub fn device_of(&self, ordinal: u32) -> Option<&'a Device> {
        self.used.get(&ordinal).copied()
    }

    /// Used node ordinals, ascending.
    pub fn used_nodes(&self) -> impl Iterator<Item = u32> + '_ {
        self.used.keys().copied()
    }
}

/// Walks `next` from `start`, stopping at used nodes and at the root.
///
/// # Arguments
///
/// * `edt` - Devicetree.
/// * `used` - Used node ordinals.
/// * `start` - Node whose neighbourhood is induced.
/// * `next` - Edge list to follow (`depends_on` or `required_by`).
///
/// # Returns
///
/// The used nodes reachable from `start` through non-used nodes only.
pub fn induced<F>(
    edt: &Edt,
    used: &BTreeSet<u32>,
    start: &EdtNode,
    next: F,
) -> BTreeSet<u32>
where
    F: Fn(&EdtNode) -> &[u32],
{
    let root = edt.root().dep_ordinal;
    let mut found = BTreeSet::new();
    let mut visited = BTreeSet::from([start.dep_ordinal]);
    let mut queue: VecDeque<u32> = next(start).iter().copied().collect();

    while let Some(ordinal) = queue.pop_front() {
        if !visited.insert(ordinal) {
            continue;
        }
        if used.contains(&ordinal) {
            let _ = found.insert(ordinal);
        } else if ordinal != root {
            if let Some(node) = edt.node(ordinal) {
                queue.extend(next(node).iter().copied());
            }
        }
    }
    found
}

/// Computes the second-pass arrays of every device.
///
/// # Arguments
///
/// * `edt` - Devicetree the first-pass ordinals refer to.
/// * `table` - Devices of the first-pass image.
/// * `num_dynamic_devices` - Slots reserved in power-domain arrays.
pub fn translate<'a>(
    edt: &'a Edt,
    table: &'a DeviceTable,
    num_dynamic_devices: u32,
) -> Result<Translation<'a>> {
    let mut used: BTreeMap<u32, &'a Device> = BTreeMap::new();
    let mut nodes: Vec<(&'a Device, &'a Handles, Option<&'a EdtNode>)> = Vec::new();

    for (device, handles) in table.with_handles() {
        let node = match handles.ordinal {
            Some(ordinal) => {
                let node = edt.node(ordinal).ok_or_else(|| Error::UnknownOrdinal {
                    name: handles.symbol.clone(),
                    ordinal,
                })?;
                if used.insert(ordinal, device).is_some() {
                    warn!(node = %node.path, device = %device.symbol, "node bound to several devices");
                }
                Some(node)
            }
            None => {
                warn!(handles = %handles.symbol, "device without devicetree node");
                None
            }
        };
        nodes.push((device, handles, node));
    }

    let mut translation = Translation {
        used,
        rewrites: Vec::new(),
    };
    let used_set: BTreeSet<u32> = translation.used_nodes().collect();
    let handle_of = |ordinal: u32| translation.device_of(ordinal).map(|d| d.handle);
    let to_handles = |ordinals: BTreeSet<u32>| -> Vec<i16> {
        let mut handles: Vec<i16> = ordinals.into_iter().filter_map(handle_of).collect();
        handles.sort_unstable();
        handles
    };

    let mut rewrites = Vec::with_capacity(nodes.len());
    for (device, handles, node) in nodes {
        let (depends, supports) = match node {
            Some(node) => (
                to_handles(induced(edt, &used_set, node, |n| n.depends_on.as_slice())),
                to_handles(induced(edt, &used_set, node, |n| n.required_by.as_slice())),
            ),
            None => (Vec::new(), Vec::new()),
        };
        let injected: Vec<i16> = handles
            .injected
            .iter()
            .filter_map(|&h| u32::try_from(h).ok())
            .filter_map(handle_of)
            .collect();
        let padding = if device.power_domain {
            usize::try_from(num_dynamic_devices).unwrap_or(usize::MAX)
        } else {
            0
        };

        let rewrite = Rewrite {
            device,
            handles,
            node,
            depends,
            injected,
            supports,
            padding,
        };
        let len = rewrite.values().len();
        if len > handles.capacity {
            return Err(Error::MalformedHandles {
                name: handles.symbol.clone(),
                reason: format!(
                    "no room for handles: {len} needed, {} available",
                    handles.capacity
                ),
            });
        }
        debug!(
            device = %device.symbol,
            handle = device.handle,
            depends = ?rewrite.depends,
            injected = ?rewrite.injected,
            supports = ?rewrite.supports,
            padding,
            "translated"
        );
        rewrites.push(rewrite);
    }

    translation.rewrites = rewrites;
    Ok(translation)
}
