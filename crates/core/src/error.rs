//! Error taxonomy shared by all generators.
//!
//! Every generator is a batch tool: nothing is recovered locally. Errors carry
//! enough context (paths, node names, symbol names) for the build system user
//! to fix the offending input and re-run.

use std::io;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure a generator run can end with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input file could not be read or an output could not be written.
    #[error("{path}: {source}")]
    Io {
        /// File the operation was performed on.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The serialized devicetree could not be decoded.
    #[error("{path}: malformed EDT: {source}")]
    EdtFormat {
        /// EDT file path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The EDT decoded but is internally inconsistent.
    #[error("inconsistent EDT: {0}")]
    EdtInconsistent(String),

    /// A YAML overlay could not be parsed.
    #[error("{path}: malformed overlay: {source}")]
    OverlayFormat {
        /// Overlay file path.
        path: PathBuf,
        /// YAML parser error.
        #[source]
        source: serde_yaml::Error,
    },

    /// An overlay names a level marker that does not exist.
    #[error("'{key}': unknown init level '{level}'")]
    UnknownLevel {
        /// Overlay key the clause belongs to.
        key: String,
        /// The unrecognised level name.
        level: String,
    },

    /// The SCC pass found nodes that cannot be ordered.
    #[error("Dependency loop detected around: {}", .nodes.join(", "))]
    CycleDetected {
        /// Names of the nodes involved in the loop.
        nodes: Vec<String>,
    },

    /// A depth-bounded walk hit the bound.
    #[error("Check arrived at maximum depth ({depth}) at '{node}', circular dependency?")]
    DepthExceeded {
        /// Node being visited when the bound was reached.
        node: String,
        /// The bound (number of graph vertices).
        depth: usize,
    },

    /// A node depends on another node scheduled on a later init level.
    #[error(
        "Level sanity broken: {node} ({level}) is on an earlier level than {dependency} ({dependency_level}) but requires the later"
    )]
    LevelSanity {
        /// Dependent node.
        node: String,
        /// Level of the dependent node.
        level: &'static str,
        /// Dependency scheduled too late.
        dependency: String,
        /// Level of the dependency.
        dependency_level: &'static str,
    },

    /// An interrupt controller lacks a positive `interrupt-lines` property.
    #[error("{path}: interrupt controller needs 'interrupt-lines' > 0")]
    InvalidInterruptLines {
        /// Controller node path.
        path: String,
    },

    /// A device routes an interrupt to a node that is not an interrupt controller.
    #[error("{device}: interrupt parent ordinal {controller} is not an interrupt controller")]
    UnknownInterruptController {
        /// Device node path.
        device: String,
        /// Ordinal of the claimed controller.
        controller: u32,
    },

    /// An interrupt specifier carries no `irq` cell.
    #[error("{device}: interrupt specifier lacks an 'irq' cell")]
    MissingInterruptLine {
        /// Device node path.
        device: String,
    },

    /// An interrupt specifier names a line the controller does not have.
    #[error("{device}: line {line} out of range for {controller} ({lines} lines)")]
    InterruptLineOutOfRange {
        /// Device node path.
        device: String,
        /// Controller node path.
        controller: String,
        /// Requested line.
        line: u32,
        /// Number of lines the controller implements.
        lines: u32,
    },

    /// The kernel image is not a readable ELF file.
    #[error("{path}: {source}")]
    Elf {
        /// ELF file path.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: object::Error,
    },

    /// A linker-map constant is missing from the kernel image.
    #[error("linker map data incomplete: missing {name}")]
    ConstantMissing {
        /// Name of the missing symbol.
        name: String,
    },

    /// A handles array could not be matched with its device.
    #[error("no device for {name}")]
    HandlesPairing {
        /// Handles symbol name.
        name: String,
    },

    /// A handles array or device object could not be decoded.
    #[error("{name}: {reason}")]
    MalformedHandles {
        /// Symbol name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The bytes backing a symbol are not present in the image.
    #[error("{name}: no file-backed contents at {address:#x}")]
    UnreadableSymbol {
        /// Symbol name.
        name: String,
        /// Address that could not be read.
        address: u64,
    },

    /// A handles array names a devicetree ordinal the EDT does not know.
    #[error("{name}: unknown devicetree ordinal {ordinal}")]
    UnknownOrdinal {
        /// Handles symbol name.
        name: String,
        /// The unknown ordinal.
        ordinal: u32,
    },
}

impl Error {
    /// Wraps an I/O error with the path it happened on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
