//! Devicetree-driven build-time generators.
//!
//! This crate turns a serialized extended devicetree (EDT) into C artefacts consumed by the kernel build:
//! 1. **Init:** Per-node init levels and priorities resolved from the devicetree, YAML overlays and Kconfig.
//! 2. **IRQ:** Interrupt line identifiers, inline dispatchers and FOREACH macros.
//! 3. **Handles:** Second-pass device dependency arrays rewritten from a first-pass kernel ELF.
//! 4. **Shared:** EDT loading, SCC decomposition, configuration records and atomic output.

/// Generator configuration records.
pub mod config;
/// Extended devicetree model and loader.
pub mod edt;
/// Error taxonomy.
pub mod error;
/// Strongly connected components and leaves-first ordering.
pub mod graph;
/// Device handle translator.
pub mod handles;
/// Init-order resolver and header emitter.
pub mod init;
/// System IRQ tree builder and emitters.
pub mod irq;
/// Kconfig `.config` reader.
pub mod kconfig;
/// Atomic file output.
pub mod output;

/// Loaded devicetree; construct with `Edt::load` or `Edt::from_document`.
pub use crate::edt::Edt;
/// Crate error and result alias.
pub use crate::error::{Error, Result};
/// Resolved Kconfig symbols.
pub use crate::kconfig::Kconfig;
