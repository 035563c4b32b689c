//! Frequency-sensor usage policy.
//!
//! The sensor has no error signal for bad readings; validity is judged by
//! range. One implausible reading triggers exactly one re-measurement so a
//! noisy sample cannot fail a session, while a snapped wire or dead battery
//! cannot stall it either.

use eyre::WrapErr;
use tension_traits::{FreqReading, FreqSensor};

use crate::config::Window;
use crate::error::{Result, map_hw_error};

/// Outcome of one measurement phase after the retry policy has run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Valid(FreqReading),
    /// Both the reading and its single retry fell outside the plausibility
    /// window; carries the last reading for diagnostics.
    Implausible(FreqReading),
}

/// Measure once, re-measuring exactly once if the reading falls outside
/// `plausible`. Never more than one automatic retry per phase, to bound
/// total session time.
pub fn measure_with_retry<F: FreqSensor + ?Sized>(
    sensor: &mut F,
    plausible: &Window,
) -> Result<Measurement> {
    let first = read(sensor)?;
    if plausible.contains(first.tension_g) {
        return Ok(Measurement::Valid(first));
    }

    tracing::warn!(
        tension_g = first.tension_g,
        frequency_hz = first.frequency_hz,
        "implausible tension reading, re-measuring"
    );
    let second = read(sensor)?;
    if plausible.contains(second.tension_g) {
        Ok(Measurement::Valid(second))
    } else {
        tracing::error!(
            tension_g = second.tension_g,
            "implausible tension reading after retry"
        );
        Ok(Measurement::Implausible(second))
    }
}

fn read<F: FreqSensor + ?Sized>(sensor: &mut F) -> Result<FreqReading> {
    sensor
        .measure()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("frequency measurement")
}
