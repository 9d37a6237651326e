//! Devicetree generator CLI.
//!
//! One binary, one subcommand per generator. It performs:
//! 1. **init:** Resolve init levels and priorities and write the `ZINIT_*` header.
//! 2. **irq:** Build the system IRQ tree and write its headers and default handlers.
//! 3. **handles:** Rewrite the device handle arrays of a first-pass kernel.
//!
//! Every failure is printed to stderr and ends the process with status 1.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dtgen_core::config::{HandleConfig, InitConfig, IrqConfig, defaults};
use dtgen_core::{handles, init, irq};

#[derive(Parser, Debug)]
#[command(
    name = "dtgen",
    author,
    version,
    about = "Devicetree-driven build-time generators",
    long_about = "Generate init priorities, system IRQ dispatch and device handle arrays from a serialized devicetree.\n\nExamples:\n  dtgen init --dotconfig-file .config --edt-pickle edt.pickle --header-out init_priorities.h board.yaml\n  dtgen irq --edt-pickle edt.pickle --irq-h irq.h --irq-internal-h irq_internal.h --irq-handler-h irq_handler.h --irq-handler-c irq_handler.c\n  dtgen handles --kernel zephyr_pre0.elf --output-source dev_handles.c --start-symbol __device_start"
)]
struct Cli {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve init levels and priorities.
    Init(InitArgs),
    /// Generate system IRQ identifiers, dispatchers and default handlers.
    Irq(IrqArgs),
    /// Rewrite device handle arrays for the second link pass.
    Handles(HandleArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Resolved Kconfig `.config` file.
    #[arg(long)]
    dotconfig_file: PathBuf,

    /// Serialized EDT.
    #[arg(long)]
    edt_pickle: PathBuf,

    /// Header to write.
    #[arg(long)]
    header_out: PathBuf,

    /// YAML overlays, applied in order.
    overlays: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct IrqArgs {
    /// Serialized EDT.
    #[arg(long)]
    edt_pickle: PathBuf,

    /// Public header with `SYS_DT_IRQN_*` identifiers.
    #[arg(long)]
    irq_h: PathBuf,

    /// Internal header with the interrupt line table.
    #[arg(long)]
    irq_internal_h: PathBuf,

    /// Header with inline dispatchers and FOREACH macros.
    #[arg(long)]
    irq_handler_h: PathBuf,

    /// Source with weak default handlers.
    #[arg(long)]
    irq_handler_c: PathBuf,

    /// Report unhandled lines through `sys_irq_log_spurious_intl`.
    #[arg(long = "log-spurious-irq")]
    log_spurious: bool,

    /// Offer unhandled lines to `sys_irq_dynamic_handler`.
    #[arg(long = "dynamic-irq")]
    dynamic: bool,
}

#[derive(Args, Debug)]
struct HandleArgs {
    /// First-pass kernel ELF.
    #[arg(short, long)]
    kernel: PathBuf,

    /// C source to write.
    #[arg(short, long)]
    output_source: PathBuf,

    /// Symbol marking the start of the device table.
    #[arg(short, long)]
    start_symbol: String,

    /// Serialized EDT; defaults to `edt.pickle` next to the kernel.
    #[arg(long)]
    edt_pickle: Option<PathBuf>,

    /// Spare slots reserved in power-domain handle arrays.
    #[arg(short, long, default_value_t = defaults::NUM_DYNAMIC_DEVICES)]
    num_dynamic_devices: u32,

    /// Source tree root.
    #[arg(short, long, env = defaults::ZEPHYR_BASE_ENV)]
    zephyr_base: Option<PathBuf>,
}

impl From<InitArgs> for InitConfig {
    fn from(args: InitArgs) -> Self {
        Self {
            dotconfig_file: args.dotconfig_file,
            edt_pickle: args.edt_pickle,
            header_out: args.header_out,
            overlays: args.overlays,
        }
    }
}

impl From<IrqArgs> for IrqConfig {
    fn from(args: IrqArgs) -> Self {
        Self {
            edt_pickle: args.edt_pickle,
            irq_h: args.irq_h,
            irq_internal_h: args.irq_internal_h,
            irq_handler_h: args.irq_handler_h,
            irq_handler_c: args.irq_handler_c,
            log_spurious: args.log_spurious,
            dynamic: args.dynamic,
        }
    }
}

impl From<HandleArgs> for HandleConfig {
    fn from(args: HandleArgs) -> Self {
        Self {
            kernel: args.kernel,
            output_source: args.output_source,
            start_symbol: args.start_symbol,
            edt_pickle: args.edt_pickle,
            num_dynamic_devices: args.num_dynamic_devices,
            zephyr_base: args.zephyr_base,
        }
    }
}

/// Installs the stderr subscriber; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(command: Commands) -> dtgen_core::Result<()> {
    match command {
        Commands::Init(args) => {
            let summary = init::generate(&args.into())?;
            info!(?summary, "init done");
        }
        Commands::Irq(args) => {
            let summary = irq::generate(&args.into())?;
            info!(?summary, "irq done");
        }
        Commands::Handles(args) => {
            let summary = handles::generate(&args.into())?;
            info!(?summary, "handles done");
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        debug!(error = ?e, "run failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
