//! Auto-tension state machine and the single-phase operator procedures.
//!
//! The session owns the motion driver, the frequency sensor and the bias
//! state for one operator-attended run. All numeric tables arrive as
//! configuration; the algorithm itself is shared by the full auto-tension
//! procedure and the single-phase operations.

use std::sync::Arc;
use std::time::Duration;

use tension_traits::clock::Clock;
use tension_traits::{FreqReading, FreqSensor, MotionHw};

use crate::bias::BiasState;
use crate::config::{CorrectionCfg, DriverCfg, PhaseTable, Windows};
use crate::driver::{MotionDriver, MotionResult};
use crate::error::{AbortReason, BuildError, Result};
use crate::measure::{Measurement, measure_with_retry};
use crate::sampler::NoiseReduction;

/// Phase of the tensioning procedure, reported through the phase callback
/// so a presentation layer can render progress without touching internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    OverTension,
    Release,
    ApproachFinal,
    HoldFinal,
    Measure,
    Correct,
    Accept,
    Abort,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Phase::Start => "start",
            Phase::OverTension => "over-tension",
            Phase::Release => "release",
            Phase::ApproachFinal => "approach-final",
            Phase::HoldFinal => "hold-final",
            Phase::Measure => "measure",
            Phase::Correct => "correct",
            Phase::Accept => "accept",
            Phase::Abort => "abort",
        };
        f.write_str(s)
    }
}

/// Final result of one session run.
///
/// `accepted` sessions carry the confirming internal measurement; aborted
/// ones carry the reason and the last reading seen, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub accepted: bool,
    pub tension_g: f32,
    pub frequency_hz: f32,
    pub reason: Option<AbortReason>,
}

/// Finished measurement handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct TensionRecord {
    pub tension_g: f32,
    pub frequency_hz: f32,
    pub measured_at: chrono::DateTime<chrono::Utc>,
    pub operator: String,
    pub tube_id: String,
}

/// Persistence sink for accepted measurements. Its internal schema is not
/// this crate's concern; only plausible, non-cancelled results reach it.
pub trait RecordSink {
    fn store(&mut self, record: &TensionRecord)
    -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

pub struct TensionSession<H: MotionHw, F: FreqSensor> {
    driver: MotionDriver<H>,
    sensor: F,
    phases: PhaseTable,
    windows: Windows,
    correction: CorrectionCfg,
    bias: BiasState,
    sink: Option<Box<dyn RecordSink>>,
    on_sample: Box<dyn FnMut(f32)>,
    on_phase: Option<Box<dyn FnMut(Phase)>>,
    operator: String,
    tube_id: String,
}

impl<H: MotionHw, F: FreqSensor> core::fmt::Debug for TensionSession<H, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TensionSession")
            .field("bias", &self.bias)
            .field("last_tension_g", &self.driver.last_tension())
            .finish()
    }
}

impl<H: MotionHw, F: FreqSensor> TensionSession<H, F> {
    /// Start building a session around owned hardware handles.
    pub fn builder(hw: H, sensor: F) -> SessionBuilder<H, F> {
        SessionBuilder::new(hw, sensor)
    }

    /// Current bias state (session-scoped trim history).
    pub fn bias(&self) -> &BiasState {
        &self.bias
    }

    /// Last filtered external-sensor tension, in grams-force.
    pub fn last_external_tension(&self) -> f32 {
        self.driver.last_tension()
    }

    /// Full multi-phase auto-tension procedure:
    /// Start -> OverTension -> Release -> ApproachFinal -> HoldFinal ->
    /// Measure -> {Accept | Correct -> Measure (bounded) | Abort}.
    pub fn run_auto(&mut self) -> Result<SessionOutcome> {
        self.bias = BiasState::new(self.correction.base_trim_g);
        let (coarse, fine) = self.strides();

        self.enter(Phase::Start);
        self.driver.resume();
        if cancelled(self.move_to(0.0, coarse)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }

        self.enter(Phase::OverTension);
        if cancelled(self.move_to(self.phases.overtension_stage_g, coarse)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        if cancelled(self.move_to(self.phases.overtension_g, fine)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        self.driver.pause();
        let hold = Duration::from_millis(self.phases.overtension_hold_ms);
        if cancelled(self.hold_at(self.phases.overtension_g, fine, hold)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        let seated = self.driver.last_tension();
        if !self.windows.overtension.contains(seated) {
            tracing::warn!(seated, "external sensor outside over-tension window after hold");
        }

        self.enter(Phase::Release);
        self.driver.resume();
        if cancelled(self.move_to(0.0, coarse)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }

        self.enter(Phase::ApproachFinal);
        if cancelled(self.move_to(self.phases.staging_g, coarse)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        if cancelled(self.move_to(self.phases.final_approach_g, fine)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        self.driver.pause();

        self.enter(Phase::HoldFinal);
        let hold = Duration::from_millis(self.phases.final_hold_ms);
        if cancelled(self.hold_at(self.phases.final_approach_g, fine, hold)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }

        self.enter(Phase::Measure);
        let mut reading = match measure_with_retry(&mut self.sensor, &self.windows.plausible)? {
            Measurement::Valid(r) => r,
            Measurement::Implausible(r) => {
                return Ok(self.abort(AbortReason::SensorImplausible, Some(r)));
            }
        };

        // Correct -> Measure loop, bounded by max_passes. The first in-window
        // reading is confirmed by one re-measurement; a post-correction
        // measurement already is that confirmation.
        let mut passes = 0u32;
        let mut confirmed = false;
        loop {
            if self.windows.final_band.contains(reading.tension_g) {
                if confirmed {
                    break;
                }
                confirmed = true;
                self.enter(Phase::Measure);
                reading = match measure_with_retry(&mut self.sensor, &self.windows.plausible)? {
                    Measurement::Valid(r) => r,
                    Measurement::Implausible(r) => {
                        return Ok(self.abort(AbortReason::SensorImplausible, Some(r)));
                    }
                };
                continue;
            }

            if passes >= self.correction.max_passes {
                return Ok(self.abort(AbortReason::CorrectionLimit, Some(reading)));
            }
            passes += 1;

            self.enter(Phase::Correct);
            let deviation = self.windows.final_band.deviation(reading.tension_g);
            let trim = if deviation > self.correction.large_dev_g {
                self.correction.trim_large_g
            } else {
                self.correction.trim_g
            };
            if reading.tension_g > self.windows.final_band.high {
                self.bias.bump_decrease(trim);
            } else {
                self.bias.bump_increase(trim);
            }
            let target = self.bias.effective_target(self.phases.final_g);
            tracing::info!(
                measured = reading.tension_g,
                deviation,
                target,
                passes,
                "corrective pass"
            );

            self.driver.resume();
            if cancelled(self.move_to(self.phases.staging_g, coarse)?) {
                return Ok(self.abort(AbortReason::Cancelled, Some(reading)));
            }
            if cancelled(self.move_to(target, fine)?) {
                return Ok(self.abort(AbortReason::Cancelled, Some(reading)));
            }
            self.driver.pause();

            confirmed = true;
            self.enter(Phase::Measure);
            reading = match measure_with_retry(&mut self.sensor, &self.windows.plausible)? {
                Measurement::Valid(r) => r,
                Measurement::Implausible(r) => {
                    return Ok(self.abort(AbortReason::SensorImplausible, Some(r)));
                }
            };
        }

        self.enter(Phase::Accept);
        self.persist(reading)?;
        Ok(accepted(reading))
    }

    /// Over-tension only: seat the wire at the over-tension target, then
    /// measure and record.
    pub fn over_tension(&mut self) -> Result<SessionOutcome> {
        self.bias = BiasState::new(self.correction.base_trim_g);
        let (coarse, fine) = self.strides();

        self.enter(Phase::OverTension);
        self.driver.resume();
        if cancelled(self.move_to(self.phases.overtension_stage_g, coarse)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        if cancelled(self.move_to(self.phases.overtension_g, fine)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        self.driver.pause();
        self.measure_and_record()
    }

    /// Release all tension. No measurement, nothing persisted.
    pub fn release(&mut self) -> Result<SessionOutcome> {
        self.bias = BiasState::new(self.correction.base_trim_g);
        let (coarse, _) = self.strides();

        self.enter(Phase::Release);
        self.driver.resume();
        if cancelled(self.move_to(0.0, coarse)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        Ok(SessionOutcome {
            accepted: true,
            tension_g: self.driver.last_tension(),
            frequency_hz: 0.0,
            reason: None,
        })
    }

    /// Final tension only: staging then the base final target, then measure
    /// and record.
    pub fn final_tension(&mut self) -> Result<SessionOutcome> {
        self.bias = BiasState::new(self.correction.base_trim_g);
        let (coarse, fine) = self.strides();

        self.enter(Phase::ApproachFinal);
        self.driver.resume();
        if cancelled(self.move_to(self.phases.staging_g, coarse)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        if cancelled(self.move_to(self.phases.final_g, fine)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        self.driver.pause();
        self.measure_and_record()
    }

    /// Measure without moving the motor; records plausible readings.
    pub fn measure_only(&mut self) -> Result<SessionOutcome> {
        self.measure_and_record()
    }

    /// One manual corrective pass upward. Shares the bias history with the
    /// other operations; does not reset it.
    pub fn trim_up(&mut self) -> Result<SessionOutcome> {
        let trim = self.correction.trim_g;
        let target = self.bias.effective_target(self.phases.final_g + trim);
        let outcome = self.trim_to(target)?;
        if outcome.reason != Some(AbortReason::Cancelled) {
            self.bias.bump_increase(trim);
        }
        Ok(outcome)
    }

    /// One manual corrective pass downward.
    pub fn trim_down(&mut self) -> Result<SessionOutcome> {
        let trim = self.correction.trim_g;
        let target = self.bias.effective_target(self.phases.final_g - trim);
        let outcome = self.trim_to(target)?;
        if outcome.reason != Some(AbortReason::Cancelled) {
            self.bias.bump_decrease(trim);
        }
        Ok(outcome)
    }

    fn trim_to(&mut self, target_g: f32) -> Result<SessionOutcome> {
        let (coarse, fine) = self.strides();
        self.enter(Phase::Correct);
        self.driver.resume();
        if cancelled(self.move_to(self.phases.staging_g, coarse)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        if cancelled(self.move_to(target_g, fine)?) {
            return Ok(self.abort(AbortReason::Cancelled, None));
        }
        self.driver.pause();
        self.measure_and_record()
    }

    fn measure_and_record(&mut self) -> Result<SessionOutcome> {
        self.enter(Phase::Measure);
        let reading = match measure_with_retry(&mut self.sensor, &self.windows.plausible)? {
            Measurement::Valid(r) => r,
            Measurement::Implausible(r) => {
                return Ok(self.abort(AbortReason::SensorImplausible, Some(r)));
            }
        };
        self.enter(Phase::Accept);
        self.persist(reading)?;
        Ok(accepted(reading))
    }

    fn move_to(&mut self, target_g: f32, stride: i32) -> Result<MotionResult> {
        self.driver.step_to(target_g, stride, &mut *self.on_sample)
    }

    fn hold_at(&mut self, target_g: f32, stride: i32, hold: Duration) -> Result<MotionResult> {
        self.driver.hold(target_g, stride, hold, &mut *self.on_sample)
    }

    fn strides(&self) -> (i32, i32) {
        let cfg = self.driver.cfg();
        (cfg.stride_coarse, cfg.stride_fine)
    }

    fn enter(&mut self, phase: Phase) {
        tracing::info!(phase = %phase, "phase");
        if let Some(cb) = self.on_phase.as_mut() {
            cb(phase);
        }
    }

    fn abort(&mut self, reason: AbortReason, last: Option<FreqReading>) -> SessionOutcome {
        self.enter(Phase::Abort);
        tracing::warn!(%reason, "session aborted");
        SessionOutcome {
            accepted: false,
            tension_g: last.map(|r| r.tension_g).unwrap_or(0.0),
            frequency_hz: last.map(|r| r.frequency_hz).unwrap_or(0.0),
            reason: Some(reason),
        }
    }

    fn persist(&mut self, reading: FreqReading) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            let record = TensionRecord {
                tension_g: reading.tension_g,
                frequency_hz: reading.frequency_hz,
                measured_at: chrono::Utc::now(),
                operator: self.operator.clone(),
                tube_id: self.tube_id.clone(),
            };
            sink.store(&record)
                .map_err(|e| eyre::eyre!("store tension record: {e}"))?;
            tracing::info!(
                tension_g = record.tension_g,
                frequency_hz = record.frequency_hz,
                tube_id = %record.tube_id,
                "tension record stored"
            );
        }
        Ok(())
    }
}

fn cancelled(result: MotionResult) -> bool {
    matches!(result, MotionResult::Cancelled)
}

fn accepted(reading: FreqReading) -> SessionOutcome {
    SessionOutcome {
        accepted: true,
        tension_g: reading.tension_g,
        frequency_hz: reading.frequency_hz,
        reason: None,
    }
}

/// Builder for `TensionSession`. All configuration is validated on `build()`.
pub struct SessionBuilder<H: MotionHw, F: FreqSensor> {
    hw: H,
    sensor: F,
    driver: DriverCfg,
    phases: PhaseTable,
    windows: Windows,
    correction: CorrectionCfg,
    reduce: Option<NoiseReduction>,
    cancel_check: Option<Box<dyn Fn() -> bool>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    sink: Option<Box<dyn RecordSink>>,
    on_sample: Option<Box<dyn FnMut(f32)>>,
    on_phase: Option<Box<dyn FnMut(Phase)>>,
    operator: String,
    tube_id: String,
}

impl<H: MotionHw, F: FreqSensor> SessionBuilder<H, F> {
    fn new(hw: H, sensor: F) -> Self {
        Self {
            hw,
            sensor,
            driver: DriverCfg::default(),
            phases: PhaseTable::default(),
            windows: Windows::default(),
            correction: CorrectionCfg::default(),
            reduce: None,
            cancel_check: None,
            clock: None,
            sink: None,
            on_sample: None,
            on_phase: None,
            operator: String::new(),
            tube_id: String::new(),
        }
    }

    pub fn with_driver_cfg(mut self, cfg: DriverCfg) -> Self {
        self.driver = cfg;
        self
    }

    pub fn with_phases(mut self, phases: PhaseTable) -> Self {
        self.phases = phases;
        self
    }

    pub fn with_windows(mut self, windows: Windows) -> Self {
        self.windows = windows;
        self
    }

    pub fn with_correction(mut self, correction: CorrectionCfg) -> Self {
        self.correction = correction;
        self
    }

    /// Replace the default mean reduction; must satisfy `reduce([x]) == x`.
    pub fn with_noise_reduction(mut self, reduce: NoiseReduction) -> Self {
        self.reduce = Some(reduce);
        self
    }

    pub fn with_cancel_check<C>(mut self, f: C) -> Self
    where
        C: Fn() -> bool + 'static,
    {
        self.cancel_check = Some(Box::new(f));
        self
    }

    /// Provide a custom clock implementation; defaults to MonotonicClock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_record_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Progress sink invoked with every filtered sample during motion. Must
    /// be fast: it runs on the control loop's tick path.
    pub fn on_sample<C>(mut self, f: C) -> Self
    where
        C: FnMut(f32) + 'static,
    {
        self.on_sample = Some(Box::new(f));
        self
    }

    pub fn on_phase<C>(mut self, f: C) -> Self
    where
        C: FnMut(Phase) + 'static,
    {
        self.on_phase = Some(Box::new(f));
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn with_tube_id(mut self, tube_id: impl Into<String>) -> Self {
        self.tube_id = tube_id.into();
        self
    }

    pub fn build(self) -> Result<TensionSession<H, F>> {
        let SessionBuilder {
            hw,
            sensor,
            driver,
            phases,
            windows,
            correction,
            reduce,
            cancel_check,
            clock,
            sink,
            on_sample,
            on_phase,
            operator,
            tube_id,
        } = self;

        if driver.stride_coarse <= 0 || driver.stride_fine <= 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "strides must be > 0",
            )));
        }
        if driver.samples_per_tick == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "samples_per_tick must be >= 1",
            )));
        }
        if driver.sample_rate_hz == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "sample_rate_hz must be > 0",
            )));
        }
        if driver.sensor_timeout_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "sensor_timeout_ms must be >= 1",
            )));
        }
        if driver.max_motion_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_motion_ms must be >= 1",
            )));
        }
        if !driver.dead_band_g.is_finite() || driver.dead_band_g < 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "dead_band_g must be finite and >= 0",
            )));
        }
        for w in [&windows.overtension, &windows.final_band, &windows.plausible] {
            if !(w.low.is_finite() && w.high.is_finite()) || w.low > w.high {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "window bounds must be finite with low <= high",
                )));
            }
        }
        if correction.max_passes == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_passes must be >= 1",
            )));
        }
        if correction.trim_g <= 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "trim_g must be > 0",
            )));
        }
        if correction.trim_large_g < correction.trim_g {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "trim_large_g must be >= trim_g",
            )));
        }
        if correction.base_trim_g < 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "base_trim_g must be >= 0",
            )));
        }

        let base_trim_g = correction.base_trim_g;
        let mut md = MotionDriver::new(hw, driver);
        if let Some(reduce) = reduce {
            md = md.with_noise_reduction(reduce);
        }
        if let Some(check) = cancel_check {
            md = md.with_cancel_check(move || check());
        }
        if let Some(clock) = clock {
            md = md.with_clock(clock);
        }

        Ok(TensionSession {
            driver: md,
            sensor,
            phases,
            windows,
            correction,
            bias: BiasState::new(base_trim_g),
            sink,
            on_sample: on_sample.unwrap_or_else(|| Box::new(|_| {})),
            on_phase,
            operator,
            tube_id,
        })
    }
}
