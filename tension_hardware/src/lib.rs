//! Simulated tensioning-stage hardware.
//!
//! The real station drives a serial stepper stage and a resonant-frequency
//! box; this crate provides deterministic stand-ins implementing the
//! `tension_traits` capabilities so the control stack runs end to end on a
//! desk. The simulated frequency sensor shares the stage's position so the
//! two sensors agree up to a configurable disagreement margin.

pub mod error;

use std::cell::Cell;
use std::rc::Rc;

use tension_traits::{FreqReading, FreqSensor, MotionHw};

/// Linear density of the simulated wire (kg/m), ~50 um tungsten.
const WIRE_LINEAR_DENSITY_KG_M: f64 = 3.8e-5;
/// Free vibrating length of the simulated wire (m).
const WIRE_LENGTH_M: f64 = 1.0;
/// Grams-force to newtons.
const GF_TO_N: f64 = 9.81e-3;

/// Fundamental frequency of an ideal string under `tension_g` grams-force.
pub fn resonant_frequency_hz(tension_g: f32) -> f32 {
    let t_n = (f64::from(tension_g) * GF_TO_N).max(0.0);
    ((t_n / WIRE_LINEAR_DENSITY_KG_M).sqrt() / (2.0 * WIRE_LENGTH_M)) as f32
}

/// Simulated motorized stage: one raw step moves the external-sensor
/// reading by `g_per_step` grams-force, with no backlash or noise.
pub struct SimulatedStage {
    position_g: Rc<Cell<f32>>,
    g_per_step: f32,
}

impl SimulatedStage {
    pub fn new() -> Self {
        Self::with_g_per_step(1.0)
    }

    pub fn with_g_per_step(g_per_step: f32) -> Self {
        SimulatedStage {
            position_g: Rc::new(Cell::new(0.0)),
            g_per_step,
        }
    }

    /// A frequency sensor reading the same simulated wire, offset by
    /// `bias_g` to model the process-dependent disagreement between the
    /// external and internal sensors.
    pub fn freq_sensor(&self, bias_g: f32) -> SimulatedFreqSensor {
        SimulatedFreqSensor {
            position_g: self.position_g.clone(),
            bias_g,
        }
    }

    pub fn position_g(&self) -> f32 {
        self.position_g.get()
    }
}

impl Default for SimulatedStage {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionHw for SimulatedStage {
    fn advance(&mut self, steps: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let p = self.position_g.get() + steps as f32 * self.g_per_step;
        // The stage bottoms out at zero tension; it cannot push the wire.
        self.position_g.set(p.max(0.0));
        tracing::trace!(steps, position_g = self.position_g.get(), "stage advance");
        Ok(())
    }

    fn read_tension(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.position_g.get())
    }
}

/// Simulated resonant-frequency sensor tied to a `SimulatedStage`.
pub struct SimulatedFreqSensor {
    position_g: Rc<Cell<f32>>,
    bias_g: f32,
}

impl FreqSensor for SimulatedFreqSensor {
    fn measure(&mut self) -> Result<FreqReading, Box<dyn std::error::Error + Send + Sync>> {
        let tension_g = self.position_g.get() + self.bias_g;
        let reading = FreqReading {
            tension_g,
            frequency_hz: resonant_frequency_hz(tension_g),
        };
        tracing::debug!(
            tension_g = reading.tension_g,
            frequency_hz = reading.frequency_hz,
            "frequency measurement (simulated)"
        );
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stage_tracks_commanded_steps() {
        let mut stage = SimulatedStage::new();
        stage.advance(50).unwrap();
        stage.advance(-20).unwrap();
        let t = stage.read_tension(Duration::from_millis(10)).unwrap();
        assert_eq!(t, 30.0);
    }

    #[test]
    fn stage_cannot_go_below_zero_tension() {
        let mut stage = SimulatedStage::new();
        stage.advance(-100).unwrap();
        assert_eq!(stage.position_g(), 0.0);
    }

    #[test]
    fn freq_sensor_follows_the_stage_with_bias() {
        let mut stage = SimulatedStage::new();
        let mut sensor = stage.freq_sensor(2.0);
        stage.advance(320).unwrap();
        let r = sensor.measure().unwrap();
        assert_eq!(r.tension_g, 322.0);
        assert!(r.frequency_hz > 0.0);
    }

    #[test]
    fn frequency_grows_with_tension() {
        assert!(resonant_frequency_hz(400.0) > resonant_frequency_hz(320.0));
        assert_eq!(resonant_frequency_hz(0.0), 0.0);
    }
}
