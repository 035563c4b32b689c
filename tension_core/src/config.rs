//! Runtime configuration structs consumed by the driver and session.
//!
//! The numeric tables (targets, strides, windows, trim amounts) are
//! process tuning, not algorithm: they arrive from `tension_config` via
//! the `conversions` module or from these defaults, which mirror the
//! reference tensioning station.

/// Inclusive acceptance band on a tension value, in grams-force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub low: f32,
    pub high: f32,
}

impl Window {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, tension_g: f32) -> bool {
        tension_g >= self.low && tension_g <= self.high
    }

    /// Distance outside the window; 0 for in-band values.
    pub fn deviation(&self, tension_g: f32) -> f32 {
        if tension_g > self.high {
            tension_g - self.high
        } else if tension_g < self.low {
            self.low - tension_g
        } else {
            0.0
        }
    }
}

/// Motion driver tuning.
#[derive(Debug, Clone)]
pub struct DriverCfg {
    /// External-sensor samples read and reduced per control tick.
    pub samples_per_tick: usize,
    /// A move converges once the filtered tension is within this band of
    /// the target.
    pub dead_band_g: f32,
    /// Control tick rate in Hz.
    pub sample_rate_hz: u32,
    /// Max sensor wait per read (ms).
    pub sensor_timeout_ms: u64,
    /// Hard cap on a single motion call; aborting here keeps a wedged rig
    /// from stalling the session forever.
    pub max_motion_ms: u64,
    /// Steps per tick for coarse approach moves.
    pub stride_coarse: i32,
    /// Steps per tick for the fine final approach.
    pub stride_fine: i32,
}

impl Default for DriverCfg {
    fn default() -> Self {
        Self {
            samples_per_tick: 1,
            dead_band_g: 2.0,
            sample_rate_hz: 20,
            sensor_timeout_ms: 150,
            max_motion_ms: 60_000,
            stride_coarse: 10,
            stride_fine: 5,
        }
    }
}

/// Per-phase targets and hold durations for the auto-tension procedure.
///
/// Over-tensioning deliberately overshoots to seat the wire before the
/// lower final setpoint; the staging targets let the coarse stride do most
/// of the travel before switching to the fine stride.
#[derive(Debug, Clone)]
pub struct PhaseTable {
    pub overtension_stage_g: f32,
    pub overtension_g: f32,
    pub overtension_hold_ms: u64,
    pub staging_g: f32,
    pub final_approach_g: f32,
    pub final_hold_ms: u64,
    /// Base target for trim/correction arithmetic.
    pub final_g: f32,
}

impl Default for PhaseTable {
    fn default() -> Self {
        Self {
            overtension_stage_g: 350.0,
            overtension_g: 400.0,
            overtension_hold_ms: 7_000,
            staging_g: 300.0,
            final_approach_g: 319.0,
            final_hold_ms: 2_000,
            final_g: 322.0,
        }
    }
}

/// Phase-specific acceptance windows.
#[derive(Debug, Clone)]
pub struct Windows {
    /// Sanity band the external sensor should sit in after over-tension.
    pub overtension: Window,
    /// Band a measured final tension must land in to be accepted.
    pub final_band: Window,
    /// Wide band outside which a frequency reading is treated as sensor
    /// noise rather than a real tension.
    pub plausible: Window,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            overtension: Window::new(350.0, 450.0),
            final_band: Window::new(312.0, 326.0),
            plausible: Window::new(100.0, 1000.0),
        }
    }
}

/// Correction-pass policy.
#[derive(Debug, Clone)]
pub struct CorrectionCfg {
    /// Initial value for both trim terms at session start.
    pub base_trim_g: f32,
    /// Trim increment for deviations near the window boundary.
    pub trim_g: f32,
    /// Trim increment for large deviations. Must exceed `trim_g` so that
    /// repeated correction converges instead of oscillating.
    pub trim_large_g: f32,
    /// Deviation beyond which the large increment is used.
    pub large_dev_g: f32,
    /// Hard cap on Correct -> Measure iterations per session.
    pub max_passes: u32,
}

impl Default for CorrectionCfg {
    fn default() -> Self {
        Self {
            base_trim_g: 10.0,
            trim_g: 10.0,
            trim_large_g: 50.0,
            large_dev_g: 25.0,
            max_passes: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Window;

    #[test]
    fn window_contains_is_inclusive() {
        let w = Window::new(312.0, 326.0);
        assert!(w.contains(312.0));
        assert!(w.contains(326.0));
        assert!(!w.contains(326.01));
        assert!(!w.contains(311.99));
    }

    #[test]
    fn deviation_measures_distance_outside() {
        let w = Window::new(312.0, 326.0);
        assert_eq!(w.deviation(318.0), 0.0);
        assert_eq!(w.deviation(330.0), 4.0);
        assert_eq!(w.deviation(300.0), 12.0);
    }
}
