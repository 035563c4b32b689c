//! Tensioning station CLI: wires the simulated rig, config and logging
//! together and runs one session per invocation.

mod cli;
mod error_fmt;
mod run;
mod sinks;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD};
use crate::error_fmt::{
    exit_code_for_abort, exit_code_for_error, format_error_json, format_outcome_json, humanize,
    humanize_abort,
};

fn main() {
    std::process::exit(real_main());
}

fn real_main() -> i32 {
    let args = Cli::parse();
    let _ = color_eyre::install();

    let cfg = match load_config(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => return report_error(&e, args.json),
    };
    init_tracing(&args.log_level, args.json, &cfg.logging);

    let shutdown = Arc::new(AtomicBool::new(false));
    let sig = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        sig.store(true, Ordering::Relaxed);
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler; cancellation disabled");
    }

    if matches!(args.cmd, Commands::SelfCheck) {
        return match run::self_check() {
            Ok(()) => {
                if args.json {
                    println!("{}", serde_json::json!({ "self_check": "ok" }));
                } else {
                    println!("self-check ok");
                }
                0
            }
            Err(e) => report_error(&e, args.json),
        };
    }

    let opts = run::RunOptions {
        operator: &args.operator,
        tube_id: &args.tube_id,
        records: args.records.as_deref(),
        samples_csv: args.samples_csv.as_deref(),
    };
    let started = Instant::now();
    match run::execute(&cfg, args.cmd, &opts, shutdown) {
        Ok(outcome) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            if args.json {
                println!(
                    "{}",
                    format_outcome_json(args.cmd.name(), &outcome, duration_ms)
                );
            } else if outcome.accepted {
                println!(
                    "{}: accepted {:.1} gf ({:.1} Hz) in {duration_ms} ms",
                    args.cmd.name(),
                    outcome.tension_g,
                    outcome.frequency_hz
                );
            }
            match outcome.reason {
                None => 0,
                Some(reason) => {
                    if !args.json {
                        eprintln!("{}: aborted: {}", args.cmd.name(), humanize_abort(reason));
                    }
                    exit_code_for_abort(reason)
                }
            }
        }
        Err(e) => report_error(&e, args.json),
    }
}

fn load_config(path: &Path) -> Result<tension_config::Config> {
    if !path.exists() {
        // Running against the built-in defaults is fine for the simulated rig.
        return Ok(tension_config::Config::default());
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = tension_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

fn init_tracing(level: &str, json: bool, logging: &tension_config::Logging) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = logging.file.as_ref().map(|file| {
        let path = Path::new(file);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("tension.log"));
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_ansi(false).with_writer(writer)
    });

    // Logs go to stderr; stdout is reserved for the outcome line.
    if json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
    }
}

fn report_error(e: &eyre::Report, json: bool) -> i32 {
    if json {
        println!("{}", format_error_json(e));
    }
    eprintln!("{}", humanize(e));
    exit_code_for_error(e)
}
