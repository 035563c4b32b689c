//! Mappings from `tension_config` schema types into core runtime structs.
//!
//! The schema splits driver tuning, timeouts and safety across TOML tables;
//! the core folds them into the structs the driver and session consume.

use crate::config::{CorrectionCfg, DriverCfg, PhaseTable, Window, Windows};

impl DriverCfg {
    /// Fold the driver, timeout and safety tables into one driver config.
    pub fn from_config(cfg: &tension_config::Config) -> Self {
        Self {
            samples_per_tick: cfg.driver.samples_per_tick,
            dead_band_g: cfg.driver.dead_band_g,
            sample_rate_hz: cfg.driver.sample_rate_hz,
            sensor_timeout_ms: cfg.timeouts.sensor_ms,
            max_motion_ms: cfg.safety.max_motion_ms,
            stride_coarse: cfg.driver.stride_coarse,
            stride_fine: cfg.driver.stride_fine,
        }
    }
}

impl From<&tension_config::Phases> for PhaseTable {
    fn from(p: &tension_config::Phases) -> Self {
        Self {
            overtension_stage_g: p.overtension_stage_g,
            overtension_g: p.overtension_g,
            overtension_hold_ms: p.overtension_hold_ms,
            staging_g: p.staging_g,
            final_approach_g: p.final_approach_g,
            final_hold_ms: p.final_hold_ms,
            final_g: p.final_g,
        }
    }
}

impl From<&tension_config::Windows> for Windows {
    fn from(w: &tension_config::Windows) -> Self {
        Self {
            overtension: Window::new(w.overtension[0], w.overtension[1]),
            final_band: Window::new(w.final_band[0], w.final_band[1]),
            plausible: Window::new(w.plausible[0], w.plausible[1]),
        }
    }
}

impl From<&tension_config::Correction> for CorrectionCfg {
    fn from(c: &tension_config::Correction) -> Self {
        Self {
            base_trim_g: c.base_trim_g,
            trim_g: c.trim_g,
            trim_large_g: c.trim_large_g,
            large_dev_g: c.large_dev_g,
            max_passes: c.max_passes,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CorrectionCfg, DriverCfg, PhaseTable, Windows};

    #[test]
    fn defaults_round_trip_through_schema() {
        let cfg = tension_config::Config::default();
        let driver = DriverCfg::from_config(&cfg);
        assert_eq!(driver.stride_coarse, 10);
        assert_eq!(driver.stride_fine, 5);
        assert_eq!(driver.sensor_timeout_ms, 150);
        assert_eq!(driver.max_motion_ms, 60_000);

        let phases = PhaseTable::from(&cfg.phases);
        assert_eq!(phases.overtension_g, 400.0);
        assert_eq!(phases.final_g, 322.0);

        let windows = Windows::from(&cfg.windows);
        assert!(windows.final_band.contains(318.0));
        assert!(!windows.final_band.contains(330.0));
        assert!(windows.plausible.contains(999.0));

        let correction = CorrectionCfg::from(&cfg.correction);
        assert_eq!(correction.max_passes, 5);
        assert_eq!(correction.trim_large_g, 50.0);
    }
}
