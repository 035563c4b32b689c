//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "tension", version, about = "Wire tensioning station CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/tension_config.toml")]
    pub config: PathBuf,

    /// Emit the session outcome (and errors) as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Operator name attached to stored tension records
    #[arg(long, value_name = "NAME", default_value = "")]
    pub operator: String,

    /// Tube identifier attached to stored tension records
    #[arg(long = "tube-id", value_name = "ID", default_value = "")]
    pub tube_id: String,

    /// Append accepted tension records to this JSONL file
    #[arg(long, value_name = "FILE")]
    pub records: Option<PathBuf>,

    /// Write every filtered motion sample to this CSV file
    #[arg(long = "samples-csv", value_name = "FILE")]
    pub samples_csv: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum Commands {
    /// Full automatic procedure: over-tension, release, final approach,
    /// measure, correct, accept
    Auto,
    /// Seat the wire at the over-tension target, then measure
    OverTension,
    /// Release all tension
    Release,
    /// Drive straight to the final target, then measure
    FinalTension,
    /// Measure the current tension without moving the motor
    Measure,
    /// One manual corrective pass upward
    TrimUp,
    /// One manual corrective pass downward
    TrimDown,
    /// Quick health check (simulated rig responds end to end)
    SelfCheck,
}

impl Commands {
    pub fn name(self) -> &'static str {
        match self {
            Commands::Auto => "auto",
            Commands::OverTension => "over-tension",
            Commands::Release => "release",
            Commands::FinalTension => "final-tension",
            Commands::Measure => "measure",
            Commands::TrimUp => "trim-up",
            Commands::TrimDown => "trim-down",
            Commands::SelfCheck => "self-check",
        }
    }
}
