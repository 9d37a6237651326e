//! Device table extraction.
//!
//! Reads the first-pass kernel's device objects, their dependency handle
//! arrays and power-management objects:
//! 1. **Constants:** Linker-map values describing the device struct layout.
//! 2. **Handles:** `__devicehdl_*` arrays decoded into ordinal and segments.
//! 3. **Devices:** `__device_*` objects sorted by address, paired with their arrays.
//! 4. **Power domains:** `__pm_device__*` flags tested for the power-domain bit.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::image::{KernelImage, Symbol};
use crate::error::{Error, Result};

/// Separates the segments of a handles array.
pub const DEVICE_HANDLE_SEP: i16 = i16::MIN;
/// Terminates a handles array.
pub const DEVICE_HANDLE_ENDS: i16 = i16::MAX;
/// Empty slot; also the ordinal of devices without a devicetree node.
pub const DEVICE_HANDLE_NULL: i16 = 0;

const DEVICE_PREFIX: &str = "__device_";
const HANDLES_PREFIX: &str = "__devicehdl_";
const PM_PREFIX: &str = "__pm_device__";
const PM_SLOT_SUFFIX: &str = "_slot";

const STRUCT_SIZEOF: &str = "_DEVICE_STRUCT_SIZEOF";
const STRUCT_HANDLES_OFFSET: &str = "_DEVICE_STRUCT_HANDLES_OFFSET";
const PM_FLAGS_OFFSET: &str = "_PM_DEVICE_STRUCT_FLAGS_OFFSET";
const PM_FLAG_PD: &str = "_PM_DEVICE_FLAG_PD";
const STRUCT_PM_OFFSET: &str = "_DEVICE_STRUCT_PM_OFFSET";

/// Power-management layout constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmLayout {
    /// Offset of the flags word inside a PM object.
    pub flags_offset: u64,
    /// Bit index of the power-domain flag.
    pub flag_pd: u64,
    /// Offset of the PM pointer inside a device struct.
    pub pm_offset: u64,
}

/// Linker-map constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkerConstants {
    /// Address of the first device struct.
    pub start: u64,
    /// Size of one device struct.
    pub struct_size: u64,
    /// Offset of the handles pointer inside a device struct.
    pub handles_offset: u64,
    /// Present only when every PM constant is.
    pub pm: Option<PmLayout>,
}

impl LinkerConstants {
    /// Looks the constants up in the symbol table.
    ///
    /// # Arguments
    ///
    /// * `image` - Kernel image.
    /// * `start_symbol` - Symbol marking the start of the device table.
    pub fn scan(image: &KernelImage, start_symbol: &str) -> Result<Self> {
        let value = |name: &str| image.symbol(name).map(|s| s.address);
        let required = |name: &str| {
            value(name).ok_or_else(|| Error::ConstantMissing {
                name: name.to_owned(),
            })
        };

        let struct_size = required(STRUCT_SIZEOF)?;
        if struct_size == 0 {
            return Err(Error::MalformedHandles {
                name: STRUCT_SIZEOF.to_owned(),
                reason: "device struct size is zero".to_owned(),
            });
        }
        let pm = match (
            value(PM_FLAGS_OFFSET),
            value(PM_FLAG_PD),
            value(STRUCT_PM_OFFSET),
        ) {
            (Some(flags_offset), Some(flag_pd), Some(pm_offset)) => Some(PmLayout {
                flags_offset,
                flag_pd,
                pm_offset,
            }),
            _ => None,
        };
        Ok(Self {
            start: required(start_symbol)?,
            struct_size,
            handles_offset: required(STRUCT_HANDLES_OFFSET)?,
            pm,
        })
    }
}

/// A decoded `__devicehdl_*` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handles {
    /// Symbol name, reused for the rewritten array.
    pub symbol: String,
    /// Address of the array.
    pub address: u64,
    /// Number of 16-bit slots in the array.
    pub capacity: usize,
    /// Devicetree ordinal; `None` for devices without a node.
    pub ordinal: Option<u32>,
    /// Handles of devicetree dependencies.
    pub depends: Vec<i16>,
    /// Injected dependencies, as devicetree ordinals.
    pub injected: Vec<i16>,
    /// Handles of supported devices.
    pub supports: Vec<i16>,
}

impl Handles {
    /// Decodes a raw array: ordinal first, then segments split at
    /// [`DEVICE_HANDLE_SEP`] up to [`DEVICE_HANDLE_ENDS`].
    pub fn decode(symbol: &str, address: u64, raw: &[i16]) -> Result<Self> {
        let malformed = |reason: &str| Error::MalformedHandles {
            name: symbol.to_owned(),
            reason: reason.to_owned(),
        };
        let (&first, rest) = raw.split_first().ok_or_else(|| malformed("empty array"))?;
        let ordinal = u32::try_from(first)
            .map_err(|_| malformed("negative devicetree ordinal"))?;
        let end = rest
            .iter()
            .position(|&h| h == DEVICE_HANDLE_ENDS)
            .ok_or_else(|| malformed("missing DEVICE_HANDLE_ENDS"))?;

        let mut segments = rest[..end].split(|&h| h == DEVICE_HANDLE_SEP);
        let mut next = || {
            segments
                .next()
                .map(|s| s.iter().copied().filter(|&h| h != DEVICE_HANDLE_NULL).collect())
                .unwrap_or_default()
        };
        let depends = next();
        let injected = next();
        let supports = next();

        Ok(Self {
            symbol: symbol.to_owned(),
            address,
            capacity: raw.len(),
            ordinal: (ordinal != 0).then_some(ordinal),
            depends,
            injected,
            supports,
        })
    }
}

/// A device object from the first-pass image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Symbol name.
    pub symbol: String,
    /// Address of the device struct.
    pub address: u64,
    /// Runtime handle: 1 + index in the device table.
    pub handle: i16,
    /// Value of the struct's handles pointer.
    pub handles_ptr: u64,
    /// The paired handles array.
    pub handles: Option<Handles>,
    /// The device is a power domain.
    pub power_domain: bool,
}

/// Devices sorted by address, each paired with its handles array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTable {
    devices: Vec<Device>,
}

fn is_device(symbol: &Symbol) -> bool {
    symbol.is_object && symbol.name.starts_with(DEVICE_PREFIX)
}

fn is_pm_device(symbol: &Symbol) -> bool {
    symbol.is_object
        && symbol.name.starts_with(PM_PREFIX)
        && !symbol.name.ends_with(PM_SLOT_SUFFIX)
}

fn unreadable(symbol: &str, address: u64) -> Error {
    Error::UnreadableSymbol {
        name: symbol.to_owned(),
        address,
    }
}

impl DeviceTable {
    /// Extracts and pairs every device of the image.
    ///
    /// # Arguments
    ///
    /// * `image` - First-pass kernel.
    /// * `constants` - Layout constants from [`LinkerConstants::scan`].
    ///
    /// # Returns
    ///
    /// The table, or the first unpairable or undecodable array.
    pub fn scan(image: &KernelImage, constants: &LinkerConstants) -> Result<Self> {
        let pm_flags: BTreeMap<u64, u64> = match constants.pm {
            Some(pm) => image
                .symbols()
                .iter()
                .filter(|s| is_pm_device(s))
                .map(|s| {
                    let at = s.address + pm.flags_offset;
                    image
                        .read_pointer(at)
                        .map(|flags| (s.address, flags))
                        .ok_or_else(|| unreadable(&s.name, at))
                })
                .collect::<Result<_>>()?,
            None => BTreeMap::new(),
        };

        let mut devices = Vec::new();
        for symbol in image.symbols().iter().filter(|s| is_device(s)) {
            if symbol.address < constants.start
                || (symbol.address - constants.start) % constants.struct_size != 0
            {
                return Err(Error::MalformedHandles {
                    name: symbol.name.clone(),
                    reason: "device struct outside the device table".to_owned(),
                });
            }
            let index = (symbol.address - constants.start) / constants.struct_size;
            let handle = i16::try_from(index + 1)
                .ok()
                .filter(|&h| h != DEVICE_HANDLE_ENDS)
                .ok_or_else(|| Error::MalformedHandles {
                    name: symbol.name.clone(),
                    reason: "too many devices for 16-bit handles".to_owned(),
                })?;

            let at = symbol.address + constants.handles_offset;
            let handles_ptr = image
                .read_pointer(at)
                .ok_or_else(|| unreadable(&symbol.name, at))?;

            let power_domain = match constants.pm {
                Some(pm) => {
                    let at = symbol.address + pm.pm_offset;
                    let pm_ptr = image
                        .read_pointer(at)
                        .ok_or_else(|| unreadable(&symbol.name, at))?;
                    pm_flags
                        .get(&pm_ptr)
                        .is_some_and(|&flags| pm.flag_pd < 64 && (flags >> pm.flag_pd) & 1 == 1)
                }
                None => false,
            };

            devices.push(Device {
                symbol: symbol.name.clone(),
                address: symbol.address,
                handle,
                handles_ptr,
                handles: None,
                power_domain,
            });
        }
        devices.sort_by_key(|d| d.address);

        for symbol in image
            .symbols()
            .iter()
            .filter(|s| s.is_object && s.name.starts_with(HANDLES_PREFIX))
        {
            let count = usize::try_from(symbol.size / 2).unwrap_or(0);
            let raw = image
                .read_i16s(symbol.address, count)
                .ok_or_else(|| unreadable(&symbol.name, symbol.address))?;
            let handles = Handles::decode(&symbol.name, symbol.address, &raw)?;

            let device = devices
                .iter_mut()
                .find(|d| d.handles_ptr == symbol.address)
                .ok_or_else(|| Error::HandlesPairing {
                    name: symbol.name.clone(),
                })?;
            debug!(
                device = %device.symbol,
                handles = %symbol.name,
                handle = device.handle,
                ordinal = ?handles.ordinal,
                "paired"
            );
            device.handles = Some(handles);
        }

        for device in devices.iter().filter(|d| d.handles.is_none()) {
            warn!(device = %device.symbol, "device has no handles array");
        }
        Ok(Self { devices })
    }

    /// Devices in address order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Devices carrying a handles array, in address order.
    pub fn with_handles(&self) -> impl Iterator<Item = (&Device, &Handles)> {
        self.devices
            .iter()
            .filter_map(|d| d.handles.as_ref().map(|h| (d, h)))
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns true when the image holds no device.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
