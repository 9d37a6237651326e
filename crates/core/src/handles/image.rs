//! Kernel image access.
//!
//! The translator only needs three things from the first-pass kernel: the
//! symbol table, the file-backed bytes behind an address, and the byte order
//! and word size to decode them with. [`KernelImage`] holds exactly that,
//! loaded from an ELF file or assembled in memory.

use std::fs;
use std::path::Path;

use object::{
    Endianness, Object, ObjectSection, ObjectSymbol, SectionFlags, SectionKind, SymbolKind, elf,
};
use tracing::debug;

use crate::error::{Error, Result};

/// One symbol table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Symbol name.
    pub name: String,
    /// Value (address for objects, the constant itself for linker constants).
    pub address: u64,
    /// Size in bytes.
    pub size: u64,
    /// True for data objects (`STT_OBJECT`).
    pub is_object: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    address: u64,
    data: Vec<u8>,
}

/// Symbols and initialized data of a kernel image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelImage {
    symbols: Vec<Symbol>,
    sections: Vec<Section>,
    big_endian: bool,
    is_64: bool,
}

impl KernelImage {
    /// Empty image with the given byte order and class.
    pub const fn new(big_endian: bool, is_64: bool) -> Self {
        Self {
            symbols: Vec::new(),
            sections: Vec::new(),
            big_endian,
            is_64,
        }
    }

    /// Reads and parses an ELF file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&data, path)
    }

    /// Parses ELF bytes; `path` only labels errors.
    pub fn parse(data: &[u8], path: &Path) -> Result<Self> {
        let elf_error = |source| Error::Elf {
            path: path.to_path_buf(),
            source,
        };
        let file = object::File::parse(data).map_err(elf_error)?;

        let mut image = Self::new(file.endianness() == Endianness::Big, file.is_64());
        for section in file.sections() {
            // symbol tables and debug info sit at address 0 and must not shadow memory
            let allocated = match section.flags() {
                SectionFlags::Elf { sh_flags } => sh_flags & u64::from(elf::SHF_ALLOC) != 0,
                _ => true,
            };
            if !allocated
                || matches!(
                    section.kind(),
                    SectionKind::UninitializedData | SectionKind::UninitializedTls
                )
            {
                continue;
            }
            let bytes = section.data().map_err(elf_error)?;
            if !bytes.is_empty() {
                image.add_section(section.address(), bytes.to_vec());
            }
        }
        for symbol in file.symbols() {
            let Ok(name) = symbol.name() else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            image.add_symbol(Symbol {
                name: name.to_owned(),
                address: symbol.address(),
                size: symbol.size(),
                is_object: symbol.kind() == SymbolKind::Data,
            });
        }
        debug!(
            path = %path.display(),
            symbols = image.symbols.len(),
            sections = image.sections.len(),
            big_endian = image.big_endian,
            is_64 = image.is_64,
            "kernel image loaded"
        );
        Ok(image)
    }

    /// Adds a symbol table entry.
    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.symbols.push(symbol);
    }

    /// Adds file-backed bytes loaded at `address`.
    pub fn add_section(&mut self, address: u64, data: Vec<u8>) {
        self.sections.push(Section { address, data });
    }

    /// Symbol table, in file order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// First symbol called `name`.
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// True for big-endian images.
    pub const fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    /// Pointer width in bytes.
    pub const fn pointer_size(&self) -> usize {
        if self.is_64 { 8 } else { 4 }
    }

    /// `len` bytes at `address`, if one section holds all of them.
    pub fn read(&self, address: u64, len: usize) -> Option<&[u8]> {
        self.sections.iter().find_map(|s| {
            let start = usize::try_from(address.checked_sub(s.address)?).ok()?;
            s.data.get(start..start.checked_add(len)?)
        })
    }

    /// Unsigned word of `size` bytes (1, 2, 4 or 8) at `address`.
    pub fn read_word(&self, address: u64, size: usize) -> Option<u64> {
        let bytes = self.read(address, size)?;
        let mut buf = [0u8; 8];
        if self.big_endian {
            buf[8 - size..].copy_from_slice(bytes);
            Some(u64::from_be_bytes(buf))
        } else {
            buf[..size].copy_from_slice(bytes);
            Some(u64::from_le_bytes(buf))
        }
    }

    /// Pointer-sized word at `address`.
    pub fn read_pointer(&self, address: u64) -> Option<u64> {
        self.read_word(address, self.pointer_size())
    }

    /// `count` signed 16-bit values starting at `address`.
    pub fn read_i16s(&self, address: u64, count: usize) -> Option<Vec<i16>> {
        let bytes = self.read(address, count.checked_mul(2)?)?;
        Some(
            bytes
                .chunks_exact(2)
                .map(|c| {
                    let pair = [c[0], c[1]];
                    if self.big_endian {
                        i16::from_be_bytes(pair)
                    } else {
                        i16::from_le_bytes(pair)
                    }
                })
                .collect(),
        )
    }
}
