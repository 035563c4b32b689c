//! Session-local trim accumulator.
//!
//! The external sensor and the resonant-frequency sensor disagree by a
//! process-dependent margin, so corrective passes nudge future setpoints
//! through two accumulating trim terms instead of re-tuning the controller.
//! This is deliberately coarse softening, not a PID.

/// Accumulated trim state for one tensioning session.
///
/// Both fields start at the configured base offset and only ever grow;
/// they are reset exclusively by starting a new session. Mutation happens
/// between phases, never mid-motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasState {
    increase: f32,
    decrease: f32,
}

impl BiasState {
    pub fn new(base_offset_g: f32) -> Self {
        let base = base_offset_g.max(0.0);
        Self {
            increase: base,
            decrease: base,
        }
    }

    /// Shift a base setpoint by the accumulated trim history.
    pub fn effective_target(&self, base_g: f32) -> f32 {
        base_g + self.increase - self.decrease
    }

    pub fn bump_increase(&mut self, amount_g: f32) {
        self.increase += amount_g.max(0.0);
    }

    pub fn bump_decrease(&mut self, amount_g: f32) {
        self.decrease += amount_g.max(0.0);
    }

    pub fn increase(&self) -> f32 {
        self.increase
    }

    pub fn decrease(&self) -> f32 {
        self.decrease
    }
}

#[cfg(test)]
mod tests {
    use super::BiasState;

    #[test]
    fn fresh_state_is_neutral() {
        let bias = BiasState::new(10.0);
        assert_eq!(bias.effective_target(322.0), 322.0);
    }

    #[test]
    fn bumps_shift_the_target() {
        let mut bias = BiasState::new(10.0);
        bias.bump_decrease(10.0);
        // 322 + 10 - 20
        assert_eq!(bias.effective_target(322.0), 312.0);
        bias.bump_increase(10.0);
        assert_eq!(bias.effective_target(322.0), 322.0);
    }

    #[test]
    fn negative_amounts_are_ignored() {
        let mut bias = BiasState::new(10.0);
        bias.bump_increase(-5.0);
        bias.bump_decrease(-5.0);
        assert_eq!(bias.increase(), 10.0);
        assert_eq!(bias.decrease(), 10.0);
    }
}
