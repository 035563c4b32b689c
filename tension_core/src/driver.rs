//! Cancellable motion driver for the tensioning stage.
//!
//! Each control tick: advance the motor one stride toward the target, read
//! and reduce a batch of external-sensor samples, stream the filtered value
//! to the caller's progress sink, and poll for cancellation. Cancellation
//! is observed at tick boundaries only; the motor is left at its last
//! reached position (no automatic rewind).

use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use tension_traits::MotionHw;
use tension_traits::clock::{Clock, MonotonicClock};

use crate::config::DriverCfg;
use crate::error::{AbortReason, Result, TensionError, map_hw_error};
use crate::sampler::{NoiseReduction, mean};

/// Terminal result of a single motion operation.
///
/// Never partially valid: callers must branch on this before trusting the
/// final sample or proceeding to measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionResult {
    /// Filtered tension reached the target within the dead-band (or the
    /// hold duration elapsed).
    Converged,
    /// A cancellation request arrived at a tick boundary; motor halted at
    /// its current position.
    Cancelled,
}

pub struct MotionDriver<H: MotionHw> {
    hw: H,
    cfg: DriverCfg,
    reduce: NoiseReduction,
    clock: Arc<dyn Clock + Send + Sync>,
    cancel_check: Option<Box<dyn Fn() -> bool>>,
    paused: bool,
    // Reused per tick to avoid per-sample allocation
    batch: Vec<f32>,
    last_tension_g: f32,
    period_us: u64,
}

impl<H: MotionHw> core::fmt::Debug for MotionDriver<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotionDriver")
            .field("last_tension_g", &self.last_tension_g)
            .field("paused", &self.paused)
            .finish()
    }
}

impl<H: MotionHw> MotionDriver<H> {
    pub fn new(hw: H, cfg: DriverCfg) -> Self {
        let period_us = crate::util::period_us(cfg.sample_rate_hz);
        let batch = Vec::with_capacity(cfg.samples_per_tick.max(1));
        Self {
            hw,
            cfg,
            reduce: Box::new(|xs| mean(xs)),
            clock: Arc::new(MonotonicClock::new()),
            cancel_check: None,
            paused: false,
            batch,
            last_tension_g: 0.0,
            period_us,
        }
    }

    /// Replace the default mean reduction. The function must satisfy
    /// `reduce([x]) == x`.
    pub fn with_noise_reduction(mut self, reduce: NoiseReduction) -> Self {
        self.reduce = reduce;
        self
    }

    /// Cancellation source polled once per tick (e.g. an operator interrupt
    /// key wired to an AtomicBool).
    pub fn with_cancel_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.cancel_check = Some(Box::new(f));
        self
    }

    /// Provide a custom clock; defaults to MonotonicClock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Last filtered tension observed by any operation, in grams-force.
    pub fn last_tension(&self) -> f32 {
        self.last_tension_g
    }

    pub fn cfg(&self) -> &DriverCfg {
        &self.cfg
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Enter the idle-holding state: motor commands become no-ops until
    /// `resume()`. Valid in any state; sampling continues.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Step toward `target_g`, streaming one filtered sample per tick.
    ///
    /// Terminates `Converged` when the filtered tension is within the
    /// dead-band of the target, `Cancelled` on an observed cancellation
    /// request. Hardware failure and the motion watchdog surface as errors.
    pub fn step_to(
        &mut self,
        target_g: f32,
        stride: i32,
        on_sample: &mut dyn FnMut(f32),
    ) -> Result<MotionResult> {
        let start = self.clock.now();
        loop {
            if self.cancel_requested() {
                tracing::info!(target_g, "motion cancelled");
                return Ok(MotionResult::Cancelled);
            }
            if self.clock.ms_since(start) >= self.cfg.max_motion_ms {
                return Err(eyre::Report::new(TensionError::Abort(
                    AbortReason::MaxRuntime,
                )))
                .wrap_err("step_to watchdog");
            }

            let tension = self.sample_tick()?;
            on_sample(tension);

            let err_g = target_g - tension;
            if err_g.abs() <= self.cfg.dead_band_g {
                tracing::debug!(target_g, tension, "move converged");
                return Ok(MotionResult::Converged);
            }

            if !self.paused {
                let steps = if err_g > 0.0 { stride } else { -stride };
                self.hw
                    .advance(steps)
                    .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                    .wrap_err("motor advance")?;
            }

            self.clock.sleep(Duration::from_micros(self.period_us));
        }
    }

    /// Hold at `target_g` for `hold_time`, re-correcting drift each tick
    /// with the given stride. Same sampling and cancellation contract as
    /// `step_to`.
    pub fn hold(
        &mut self,
        target_g: f32,
        stride: i32,
        hold_time: Duration,
        on_sample: &mut dyn FnMut(f32),
    ) -> Result<MotionResult> {
        let start = self.clock.now();
        let hold_ms = hold_time.as_millis().min(u128::from(u64::MAX)) as u64;
        loop {
            if self.cancel_requested() {
                tracing::info!(target_g, "hold cancelled");
                return Ok(MotionResult::Cancelled);
            }

            let tension = self.sample_tick()?;
            on_sample(tension);

            if self.clock.ms_since(start) >= hold_ms {
                return Ok(MotionResult::Converged);
            }

            let err_g = target_g - tension;
            if err_g.abs() > self.cfg.dead_band_g && !self.paused {
                let steps = if err_g > 0.0 { stride } else { -stride };
                self.hw
                    .advance(steps)
                    .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                    .wrap_err("motor advance")?;
            }

            self.clock.sleep(Duration::from_micros(self.period_us));
        }
    }

    fn cancel_requested(&self) -> bool {
        self.cancel_check.as_ref().is_some_and(|check| check())
    }

    /// Read one batch from the external sensor and reduce it to the tick's
    /// filtered tension.
    fn sample_tick(&mut self) -> Result<f32> {
        let timeout = Duration::from_millis(self.cfg.sensor_timeout_ms);
        self.batch.clear();
        for _ in 0..self.cfg.samples_per_tick.max(1) {
            let raw = self
                .hw
                .read_tension(timeout)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err("reading tension sensor")?;
            self.batch.push(raw);
        }
        let tension = (self.reduce)(&self.batch);
        self.last_tension_g = tension;
        Ok(tension)
    }
}
