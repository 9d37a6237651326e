//! Configuration records for the three generators.
//!
//! Each generator takes one immutable record. The CLI fills them from
//! command-line arguments; they also deserialize from JSON so build systems
//! can hand over a single file instead.
//! 1. **`InitConfig`:** Init-priority header generator.
//! 2. **`IrqConfig`:** System IRQ dispatch generator.
//! 3. **`HandleConfig`:** Device handle translator.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default values shared by the CLI and deserialization.
pub mod defaults {
    /// File name the EDT is looked up under, next to the kernel image.
    pub const EDT_FILE_NAME: &str = "edt.pickle";

    /// Dynamic device slots appended to power-domain handle arrays.
    pub const NUM_DYNAMIC_DEVICES: u32 = 0;

    /// Environment variable naming the tree the generators belong to.
    pub const ZEPHYR_BASE_ENV: &str = "ZEPHYR_BASE";
}

/// Inputs and output of the init-priority generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    /// Resolved Kconfig `.config` file.
    pub dotconfig_file: PathBuf,
    /// Serialized EDT.
    pub edt_pickle: PathBuf,
    /// Header to write.
    pub header_out: PathBuf,
    /// YAML overlays, applied in order.
    pub overlays: Vec<PathBuf>,
}

/// Inputs, outputs and switches of the IRQ generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IrqConfig {
    /// Serialized EDT.
    pub edt_pickle: PathBuf,
    /// Public header with `SYS_DT_IRQN_*` identifiers.
    pub irq_h: PathBuf,
    /// Internal header with the interrupt line table.
    pub irq_internal_h: PathBuf,
    /// Header with per-line inline dispatchers and FOREACH macros.
    pub irq_handler_h: PathBuf,
    /// Source with weak default handlers.
    pub irq_handler_c: PathBuf,
    /// Report unhandled lines through `sys_irq_log_spurious_intl`.
    pub log_spurious: bool,
    /// Offer unhandled lines to `sys_irq_dynamic_handler`.
    pub dynamic: bool,
}

/// Inputs, output and sizing of the handle translator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandleConfig {
    /// First-pass kernel ELF.
    pub kernel: PathBuf,
    /// C source to write.
    pub output_source: PathBuf,
    /// Symbol marking the start of the device table.
    pub start_symbol: String,
    /// Serialized EDT; next to the kernel when unset.
    pub edt_pickle: Option<PathBuf>,
    /// Spare slots reserved in power-domain handle arrays.
    pub num_dynamic_devices: u32,
    /// Source tree root, informational only.
    pub zephyr_base: Option<PathBuf>,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            kernel: PathBuf::new(),
            output_source: PathBuf::new(),
            start_symbol: String::new(),
            edt_pickle: None,
            num_dynamic_devices: defaults::NUM_DYNAMIC_DEVICES,
            zephyr_base: None,
        }
    }
}

impl HandleConfig {
    /// EDT path: the configured one, or `edt.pickle` beside the kernel.
    pub fn edt_path(&self) -> PathBuf {
        self.edt_pickle.clone().unwrap_or_else(|| {
            self.kernel
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(defaults::EDT_FILE_NAME)
        })
    }
}
