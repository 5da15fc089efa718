//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "tablet", version, about = "Pen tablet report decoder")]
pub struct Cli {
    /// Path to the tablet config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/tablet.toml")]
    pub config: PathBuf,

    /// Print output and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read reports, decode them and print the filtered pointer state
    Run {
        /// Replay reports from a CSV (`delay_ms,report`) instead of a device
        #[arg(long, value_name = "FILE")]
        replay: Option<PathBuf>,
        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        max_ms: Option<u64>,
    },
    /// Decode a single hex report with the configured settings
    Decode {
        /// Report bytes as hex, e.g. "02 e1 1d b0 12 a0 3f 80 00 00"
        #[arg(value_name = "HEX")]
        hex: String,
        /// Count the report against the warm-up window like a fresh device
        #[arg(long, action = ArgAction::SetTrue)]
        warmup: bool,
    },
    /// Record the raw position bounds seen while the pen is moved around
    Measure {
        /// Replay reports from a CSV instead of a device
        #[arg(long, value_name = "FILE")]
        replay: Option<PathBuf>,
        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        max_ms: Option<u64>,
    },
    /// Convert between smoothing latency and per-tick weight
    Latency {
        /// Per-tick weight to convert into a latency
        #[arg(long, value_name = "W", conflicts_with = "latency_ms")]
        weight: Option<f64>,
        /// Latency in milliseconds to convert into a weight
        #[arg(long, value_name = "MS")]
        latency_ms: Option<f64>,
        /// Tick interval override in milliseconds
        #[arg(long, value_name = "MS")]
        interval_ms: Option<f64>,
        /// Threshold override, in (0, 1)
        #[arg(long, value_name = "T")]
        threshold: Option<f64>,
    },
    /// Validate the config and print the effective tablet setup
    SelfCheck,
}
