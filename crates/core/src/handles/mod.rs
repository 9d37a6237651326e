//! Device handle translator.
//!
//! Rewrites the dependency handle arrays of a first-pass kernel so they only
//! reference devices that exist at runtime. It performs:
//! 1. **Scan:** Linker constants, device objects and handles arrays ([`device`]).
//! 2. **Translate:** Induced dependencies and supported devices over used nodes ([`translate`]).
//! 3. **Emit:** The `.__device_handles_pass2` C source ([`emit`]).

/// Device table extraction.
pub mod device;
/// Source rendering.
pub mod emit;
/// ELF access.
pub mod image;
/// Induced-subgraph translation.
pub mod translate;

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::HandleConfig;
use crate::edt::Edt;
use crate::error::Result;
use crate::output;

pub use device::{Device, DeviceTable, Handles, LinkerConstants};
pub use image::{KernelImage, Symbol};
pub use translate::{Rewrite, Translation};

/// What a translator run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleSummary {
    /// Device objects found.
    pub devices: usize,
    /// Arrays rewritten.
    pub rewritten: usize,
    /// Power-domain devices padded with dynamic slots.
    pub power_domains: usize,
    /// Source written.
    pub output: PathBuf,
}

/// Translates an already loaded image and devicetree into C source.
///
/// # Arguments
///
/// * `image` - First-pass kernel.
/// * `edt` - Devicetree matching the kernel.
/// * `start_symbol` - Symbol marking the start of the device table.
/// * `num_dynamic_devices` - Slots reserved in power-domain arrays.
///
/// # Returns
///
/// The rendered source and the device table it was computed from.
pub fn render(
    image: &KernelImage,
    edt: &Edt,
    start_symbol: &str,
    num_dynamic_devices: u32,
) -> Result<(String, DeviceTable)> {
    let constants = LinkerConstants::scan(image, start_symbol)?;
    debug!(?constants, "linker constants");
    let table = DeviceTable::scan(image, &constants)?;
    let translation = translate::translate(edt, &table, num_dynamic_devices)?;
    let source = emit::render(edt, &translation);
    Ok((source, table))
}

/// Runs the translator end to end.
pub fn generate(config: &HandleConfig) -> Result<HandleSummary> {
    if let Some(base) = &config.zephyr_base {
        debug!(zephyr_base = %base.display(), "source tree");
    }
    let image = KernelImage::load(&config.kernel)?;
    let edt = Edt::load(&config.edt_path())?;

    let (source, table) = render(
        &image,
        &edt,
        &config.start_symbol,
        config.num_dynamic_devices,
    )?;
    output::write_atomic(&config.output_source, &source)?;

    let summary = HandleSummary {
        devices: table.len(),
        rewritten: table.with_handles().count(),
        power_domains: table.devices().iter().filter(|d| d.power_domain).count(),
        output: config.output_source.clone(),
    };
    info!(
        devices = summary.devices,
        rewritten = summary.rewritten,
        power_domains = summary.power_domains,
        output = %summary.output.display(),
        "device handles translated"
    );
    Ok(summary)
}
