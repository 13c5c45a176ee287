//! CLI argument definitions and shared statics.

use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Keeps the non-blocking file writer flushing for the life of the process.
pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "dispenser", version, about = "Weight-triggered dispenser")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/dispenser.toml")]
    pub config: PathBuf,

    /// Log as JSON lines and print results as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to [logging].level, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive loop: keypad entry, dispensing, automatic reset. Ctrl-C exits.
    Run,
    /// Run exactly one cycle from scripted keypad input
    #[command(group(ArgGroup::new("target").required(true).args(["grams", "keys"])))]
    Dispense {
        /// Target grams (typed on the keypad as digits followed by `#`)
        #[arg(long)]
        grams: Option<f32>,
        /// Raw key sequence, e.g. "12.5#"
        #[arg(long, value_name = "KEYS")]
        keys: Option<String>,
    },
    /// Validate config and start sensor acquisition
    SelfCheck,
    /// Health check for operational monitoring
    Health,
}
