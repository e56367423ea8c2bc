//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pfvs", version, about = "Printer filament verification")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/pfvs_config.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to logging.level, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a G-code file through the interceptor against the simulated head
    #[command(
        long_about = "Feed a G-code file through the interceptor against the simulated sensor head.\n\nEvery line is passed to the interceptor in order. Directive lines are handled by the replay harness instead:\n  @state <ID>      report a host state change (e.g. STARTING, PRINTING, OPERATIONAL)\n  @override on|off assert or release the manual-override input\nA summary of printer actions and counters is printed at the end. A print cancelled by the policy exits with code 6."
    )]
    Replay {
        /// G-code file to replay
        #[arg(value_name = "GCODE")]
        gcode: PathBuf,
        /// Simulated filament (pla|petg|asa|tpu); overrides simulation.material
        #[arg(long, value_name = "NAME")]
        material: Option<String>,
    },
    /// Run one dark/light scan and print the channels, color and material
    Scan {
        /// Simulated filament (pla|petg|asa|tpu); overrides simulation.material
        #[arg(long, value_name = "NAME")]
        material: Option<String>,
    },
    /// Stream live samples until the duration elapses or Ctrl-C
    Stream {
        /// How long to stream before stopping
        #[arg(long, value_name = "MS", default_value_t = 2000)]
        duration_ms: u64,
        /// Simulated filament (pla|petg|asa|tpu); overrides simulation.material
        #[arg(long, value_name = "NAME")]
        material: Option<String>,
    },
    /// Quick health check (filament switch + one scan)
    SelfCheck,
    /// Health check for operational monitoring
    Health,
}
