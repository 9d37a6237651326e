use dtgen_core::handles::device::{DEVICE_HANDLE_ENDS, DEVICE_HANDLE_SEP};
use dtgen_core::handles::{KernelImage, Symbol};
use object::write::{Object, Symbol as ElfSymbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};

pub const START: u64 = 0x1000;
pub const STRUCT_SIZE: u64 = 0x20;
pub const HANDLES_OFFSET: u64 = 0x10;
pub const PM_OFFSET: u64 = 0x18;
pub const PM_FLAGS_OFFSET: u64 = 0x4;
pub const PM_FLAG_PD: u64 = 3;

const HANDLES_BASE: u64 = 0x2000;
const PM_BASE: u64 = 0x3000;
const PM_SIZE: u64 = 0x10;

/// First-pass handles array: ordinal, the three segments, `spare` NULL
/// slots, then the terminator.
pub fn pass1(ordinal: i16, depends: &[i16], injected: &[i16], supports: &[i16], spare: usize) -> Vec<i16> {
    let mut out = vec![ordinal];
    out.extend_from_slice(depends);
    out.push(DEVICE_HANDLE_SEP);
    out.extend_from_slice(injected);
    out.push(DEVICE_HANDLE_SEP);
    out.extend_from_slice(supports);
    out.extend(std::iter::repeat_n(0, spare));
    out.push(DEVICE_HANDLE_ENDS);
    out
}

struct PlannedDevice {
    name: String,
    handles: Option<Vec<i16>>,
    power_domain: Option<bool>,
}

/// Lays out a device table, handles arrays and PM objects the way the
/// first link pass does, then exposes them as a [`KernelImage`] or ELF bytes.
pub struct ImageBuilder {
    big_endian: bool,
    is_64: bool,
    pm: bool,
    devices: Vec<PlannedDevice>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            big_endian: false,
            is_64: false,
            pm: false,
            devices: Vec::new(),
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn class_64(mut self) -> Self {
        self.is_64 = true;
        self
    }

    /// Emits the PM layout constants.
    pub fn with_pm(mut self) -> Self {
        self.pm = true;
        self
    }

    /// Appends a device struct; its handle is its position plus one.
    pub fn device(mut self, name: &str, handles: Vec<i16>) -> Self {
        self.devices.push(PlannedDevice {
            name: name.to_string(),
            handles: Some(handles),
            power_domain: None,
        });
        self
    }

    /// Appends a device struct whose handles pointer points nowhere.
    pub fn bare_device(mut self, name: &str) -> Self {
        self.devices.push(PlannedDevice {
            name: name.to_string(),
            handles: None,
            power_domain: None,
        });
        self
    }

    /// Appends a device with a PM object; `is_pd` sets the power-domain flag.
    pub fn pm_device(mut self, name: &str, handles: Vec<i16>, is_pd: bool) -> Self {
        self.devices.push(PlannedDevice {
            name: name.to_string(),
            handles: Some(handles),
            power_domain: Some(is_pd),
        });
        self
    }

    fn ptr_size(&self) -> usize {
        if self.is_64 { 8 } else { 4 }
    }

    fn put(&self, buf: &mut [u8], at: usize, value: u64, size: usize) {
        let bytes = if self.big_endian {
            value.to_be_bytes()[8 - size..].to_vec()
        } else {
            value.to_le_bytes()[..size].to_vec()
        };
        buf[at..at + size].copy_from_slice(&bytes);
    }

    /// Symbols and initialized memory, as the linker would lay them out.
    fn layout(&self) -> (Vec<Symbol>, Vec<(u64, Vec<u8>)>) {
        let mut symbols = Vec::new();
        let constant = |name: &str, value: u64| Symbol {
            name: name.to_string(),
            address: value,
            size: 0,
            is_object: false,
        };
        symbols.push(constant("__device_start", START));
        symbols.push(constant("_DEVICE_STRUCT_SIZEOF", STRUCT_SIZE));
        symbols.push(constant("_DEVICE_STRUCT_HANDLES_OFFSET", HANDLES_OFFSET));
        if self.pm {
            symbols.push(constant("_DEVICE_STRUCT_PM_OFFSET", PM_OFFSET));
            symbols.push(constant("_PM_DEVICE_STRUCT_FLAGS_OFFSET", PM_FLAGS_OFFSET));
            symbols.push(constant("_PM_DEVICE_FLAG_PD", PM_FLAG_PD));
        }

        let ptr = self.ptr_size();
        let mut table = vec![0u8; self.devices.len() * STRUCT_SIZE as usize];
        let mut handles_data: Vec<u8> = Vec::new();
        let mut pm_data = vec![0u8; self.devices.len() * PM_SIZE as usize];

        for (i, dev) in self.devices.iter().enumerate() {
            let address = START + i as u64 * STRUCT_SIZE;
            let base = i * STRUCT_SIZE as usize;
            symbols.push(Symbol {
                name: format!("__device_{}", dev.name),
                address,
                size: STRUCT_SIZE,
                is_object: true,
            });

            if let Some(handles) = &dev.handles {
                let hdl_addr = HANDLES_BASE + handles_data.len() as u64;
                for &h in handles {
                    let bytes = if self.big_endian { h.to_be_bytes() } else { h.to_le_bytes() };
                    handles_data.extend_from_slice(&bytes);
                }
                symbols.push(Symbol {
                    name: format!("__devicehdl_{}", dev.name),
                    address: hdl_addr,
                    size: 2 * handles.len() as u64,
                    is_object: true,
                });
                self.put(&mut table, base + HANDLES_OFFSET as usize, hdl_addr, ptr);
            }

            if let Some(is_pd) = dev.power_domain {
                let pm_addr = PM_BASE + i as u64 * PM_SIZE;
                symbols.push(Symbol {
                    name: format!("__pm_device__{}", dev.name),
                    address: pm_addr,
                    size: PM_SIZE,
                    is_object: true,
                });
                // linker slot symbols alias the PM object and must be ignored
                symbols.push(Symbol {
                    name: format!("__pm_device__{}_slot", dev.name),
                    address: 0xdead_0000,
                    size: ptr as u64,
                    is_object: true,
                });
                let flags = if is_pd { 1u64 << PM_FLAG_PD } else { 0b1 };
                let at = i * PM_SIZE as usize + PM_FLAGS_OFFSET as usize;
                self.put(&mut pm_data, at, flags, ptr);
                self.put(&mut table, base + PM_OFFSET as usize, pm_addr, ptr);
            }
        }

        let sections = vec![(START, table), (HANDLES_BASE, handles_data), (PM_BASE, pm_data)];
        (symbols, sections)
    }

    pub fn build(&self) -> KernelImage {
        let (symbols, sections) = self.layout();
        let mut image = KernelImage::new(self.big_endian, self.is_64);
        for symbol in symbols {
            image.add_symbol(symbol);
        }
        for (address, data) in sections {
            image.add_section(address, data);
        }
        image
    }

    /// Serializes the layout as a relocatable ELF whose single `.data`
    /// section starts at address 0, so symbol values equal addresses.
    /// Linker constants and slot aliases become absolute symbols.
    pub fn elf(&self) -> Vec<u8> {
        let (symbols, sections) = self.layout();
        let (architecture, endian) = match (self.big_endian, self.is_64) {
            (false, false) => (Architecture::I386, Endianness::Little),
            (false, true) => (Architecture::X86_64, Endianness::Little),
            (true, false) => (Architecture::PowerPc, Endianness::Big),
            (true, true) => (Architecture::PowerPc64, Endianness::Big),
        };
        let mut object = Object::new(BinaryFormat::Elf, architecture, endian);

        let end = sections
            .iter()
            .map(|(address, data)| *address as usize + data.len())
            .max()
            .unwrap_or(0);
        let mut memory = vec![0u8; end];
        for (address, data) in &sections {
            memory[*address as usize..*address as usize + data.len()].copy_from_slice(data);
        }
        let data = object.add_section(Vec::new(), b".data".to_vec(), SectionKind::Data);
        let _ = object.append_section_data(data, &memory, 8);

        for symbol in symbols {
            let in_data = symbol.is_object && symbol.address < end as u64;
            let _ = object.add_symbol(ElfSymbol {
                name: symbol.name.into_bytes(),
                value: symbol.address,
                size: symbol.size,
                kind: if symbol.is_object { SymbolKind::Data } else { SymbolKind::Unknown },
                scope: SymbolScope::Linkage,
                weak: false,
                section: if in_data { SymbolSection::Section(data) } else { SymbolSection::Absolute },
                flags: SymbolFlags::None,
            });
        }
        object.write().expect("serialize ELF")
    }
}
