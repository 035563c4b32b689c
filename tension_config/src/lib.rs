#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the tensioning station.
//!
//! The numeric tables here (targets, strides, windows, trim amounts) are
//! process tuning specific to one station and wire batch; they are
//! deserialized from TOML and validated before the control core ever sees
//! them. Defaults mirror the reference station.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Driver {
    /// External-sensor samples reduced per control tick.
    pub samples_per_tick: usize,
    /// Convergence dead-band around a target, grams-force.
    pub dead_band_g: f32,
    /// Control tick rate in Hz.
    pub sample_rate_hz: u32,
    /// Steps per tick for coarse approach moves.
    pub stride_coarse: i32,
    /// Steps per tick for the fine final approach.
    pub stride_fine: i32,
}

impl Default for Driver {
    fn default() -> Self {
        Self {
            samples_per_tick: 1,
            dead_band_g: 2.0,
            sample_rate_hz: 20,
            stride_coarse: 10,
            stride_fine: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Phases {
    pub overtension_stage_g: f32,
    pub overtension_g: f32,
    pub overtension_hold_ms: u64,
    pub staging_g: f32,
    pub final_approach_g: f32,
    pub final_hold_ms: u64,
    /// Base target for trim/correction arithmetic.
    pub final_g: f32,
}

impl Default for Phases {
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

/// Acceptance windows as `[low, high]` pairs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Windows {
    pub overtension: [f32; 2],
    #[serde(rename = "final")]
    pub final_band: [f32; 2],
    pub plausible: [f32; 2],
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            overtension: [350.0, 450.0],
            final_band: [312.0, 326.0],
            plausible: [100.0, 1000.0],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Correction {
    /// Initial value for both trim terms at session start.
    pub base_trim_g: f32,
    /// Trim increment near the window boundary.
    pub trim_g: f32,
    /// Trim increment for large deviations; must be >= trim_g.
    pub trim_large_g: f32,
    /// Deviation beyond which the large increment applies.
    pub large_dev_g: f32,
    /// Hard cap on Correct -> Measure passes per session.
    pub max_passes: u32,
}

impl Default for Correction {
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Max sensor wait per read (ms). Also accepts alias "sample_ms".
    #[serde(alias = "sample_ms")]
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 150 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Safety {
    /// Hard cap on a single motion call in milliseconds.
    pub max_motion_ms: u64,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            max_motion_ms: 60_000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub driver: Driver,
    pub phases: Phases,
    pub windows: Windows,
    pub correction: Correction,
    pub timeouts: Timeouts,
    pub safety: Safety,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}


impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Driver
        if self.driver.samples_per_tick == 0 {
            eyre::bail!("driver.samples_per_tick must be >= 1");
        }
        if self.driver.sample_rate_hz == 0 {
            eyre::bail!("driver.sample_rate_hz must be > 0");
        }
        if !self.driver.dead_band_g.is_finite() || self.driver.dead_band_g < 0.0 {
            eyre::bail!("driver.dead_band_g must be finite and >= 0");
        }
        if self.driver.stride_coarse <= 0 || self.driver.stride_fine <= 0 {
            eyre::bail!("driver strides must be > 0");
        }

        // Phases
        for (name, v) in [
            ("overtension_stage_g", self.phases.overtension_stage_g),
            ("overtension_g", self.phases.overtension_g),
            ("staging_g", self.phases.staging_g),
            ("final_approach_g", self.phases.final_approach_g),
            ("final_g", self.phases.final_g),
        ] {
            if !v.is_finite() || v < 0.0 {
                eyre::bail!("phases.{name} must be finite and >= 0");
            }
        }
        if self.phases.overtension_g < self.phases.overtension_stage_g {
            eyre::bail!("phases.overtension_g must be >= phases.overtension_stage_g");
        }
        if self.phases.overtension_g <= self.phases.final_g {
            eyre::bail!("phases.overtension_g must exceed phases.final_g");
        }
        if self.phases.overtension_hold_ms > 5 * 60 * 1000 {
            eyre::bail!("phases.overtension_hold_ms is unreasonably large (>5min)");
        }
        if self.phases.final_hold_ms > 5 * 60 * 1000 {
            eyre::bail!("phases.final_hold_ms is unreasonably large (>5min)");
        }

        // Windows
        for (name, w) in [
            ("overtension", &self.windows.overtension),
            ("final", &self.windows.final_band),
            ("plausible", &self.windows.plausible),
        ] {
            if !(w[0].is_finite() && w[1].is_finite()) || w[0] > w[1] {
                eyre::bail!("windows.{name} must be finite with low <= high");
            }
        }
        if !(self.windows.plausible[0] <= self.windows.final_band[0]
            && self.windows.final_band[1] <= self.windows.plausible[1])
        {
            eyre::bail!("windows.final must lie inside windows.plausible");
        }

        // Correction
        if self.correction.max_passes == 0 {
            eyre::bail!("correction.max_passes must be >= 1");
        }
        if self.correction.trim_g <= 0.0 {
            eyre::bail!("correction.trim_g must be > 0");
        }
        if self.correction.trim_large_g < self.correction.trim_g {
            eyre::bail!("correction.trim_large_g must be >= correction.trim_g");
        }
        if self.correction.large_dev_g < 0.0 {
            eyre::bail!("correction.large_dev_g must be >= 0");
        }
        if self.correction.base_trim_g < 0.0 {
            eyre::bail!("correction.base_trim_g must be >= 0");
        }

        // Timeouts / safety
        if self.timeouts.sensor_ms == 0 {
            eyre::bail!("timeouts.sensor_ms must be >= 1");
        }
        if self.safety.max_motion_ms == 0 {
            eyre::bail!("safety.max_motion_ms must be >= 1");
        }
        if self.safety.max_motion_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("safety.max_motion_ms is unreasonably large (>24h)");
        }

        Ok(())
    }
}
