//! Config mapping, hardware assembly, and session execution.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use eyre::Result;
use tension_core::config::DriverCfg;
use tension_core::session::{SessionOutcome, TensionSession};
use tension_hardware::SimulatedStage;

use crate::cli::Commands;
use crate::sinks::{JsonlSink, Sample, SampleLog};

/// Disagreement between the simulated external sensor and the simulated
/// frequency sensor, in grams-force. Overridable so tests can force the
/// correction and abort paths without real hardware.
fn sim_sensor_bias_g() -> f32 {
    std::env::var("TENSION_SIM_BIAS_G")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

pub struct RunOptions<'a> {
    pub operator: &'a str,
    pub tube_id: &'a str,
    pub records: Option<&'a Path>,
    pub samples_csv: Option<&'a Path>,
}

pub fn execute(
    cfg: &tension_config::Config,
    cmd: Commands,
    opts: &RunOptions<'_>,
    shutdown: Arc<AtomicBool>,
) -> Result<SessionOutcome> {
    let stage = SimulatedStage::new();
    let sensor = stage.freq_sensor(sim_sensor_bias_g());

    let sample_log = match opts.samples_csv {
        Some(path) => Some(SampleLog::spawn(path)?),
        None => None,
    };

    let mut builder = TensionSession::builder(stage, sensor)
        .with_driver_cfg(DriverCfg::from_config(cfg))
        .with_phases((&cfg.phases).into())
        .with_windows((&cfg.windows).into())
        .with_correction((&cfg.correction).into())
        .with_operator(opts.operator)
        .with_tube_id(opts.tube_id)
        .with_cancel_check(move || shutdown.load(Ordering::Relaxed));

    if let Some(path) = opts.records {
        builder = builder.with_record_sink(Box::new(JsonlSink::open(path)?));
    }
    if let Some(log) = &sample_log {
        let tx = log.sender();
        let started = Instant::now();
        builder = builder.on_sample(move |tension_g| {
            let _ = tx.send(Sample {
                elapsed_ms: started.elapsed().as_millis() as u64,
                tension_g,
            });
        });
    }

    let mut session = builder.build()?;
    tracing::info!(command = cmd.name(), "session start");
    let outcome = match cmd {
        Commands::Auto => session.run_auto(),
        Commands::OverTension => session.over_tension(),
        Commands::Release => session.release(),
        Commands::FinalTension => session.final_tension(),
        Commands::Measure => session.measure_only(),
        Commands::TrimUp => session.trim_up(),
        Commands::TrimDown => session.trim_down(),
        Commands::SelfCheck => unreachable!("self-check does not run a session"),
    };

    // Flush the sample log regardless of how the session ended.
    let log_result = sample_log.map(SampleLog::finish).transpose();
    let outcome = outcome?;
    log_result?;
    Ok(outcome)
}

/// End-to-end sanity check on the simulated rig: the stage must respond to
/// steps and both sensors must agree up to the configured bias.
pub fn self_check() -> Result<()> {
    use tension_traits::{FreqSensor, MotionHw};

    let mut stage = SimulatedStage::new();
    let mut sensor = stage.freq_sensor(0.0);
    stage
        .advance(100)
        .map_err(|e| eyre::eyre!("stage advance: {e}"))?;
    let external = stage
        .read_tension(std::time::Duration::from_millis(50))
        .map_err(|e| eyre::eyre!("external sensor read: {e}"))?;
    let reading = sensor
        .measure()
        .map_err(|e| eyre::eyre!("frequency measurement: {e}"))?;
    if (external - reading.tension_g).abs() > 1.0 {
        eyre::bail!(
            "sensor disagreement: external {external} gf vs frequency {} gf",
            reading.tension_g
        );
    }
    tracing::info!(external, frequency_hz = reading.frequency_hz, "self-check ok");
    Ok(())
}
