//! Noise reduction over one tick's batch of external-sensor samples.
//!
//! The driver reads `samples_per_tick` raw values each control tick and
//! collapses them to a single scalar with a reduction function. The
//! reference policy is the arithmetic mean; any function satisfying
//! `reduce([x]) == x` may be substituted.

/// Boxed reduction function applied to each tick's sample batch.
pub type NoiseReduction = Box<dyn Fn(&[f32]) -> f32>;

/// Arithmetic mean; identity on a single sample. Defined only for
/// non-empty input (the driver always reads at least one sample per tick).
pub fn mean(samples: &[f32]) -> f32 {
    debug_assert!(!samples.is_empty(), "mean of empty sample batch");
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().sum();
    sum / samples.len() as f32
}

#[cfg(test)]
mod tests {
    use super::mean;

    #[test]
    fn single_sample_is_identity() {
        assert_eq!(mean(&[317.5]), 317.5);
    }

    #[test]
    fn averages_a_batch() {
        assert_eq!(mean(&[300.0, 320.0]), 310.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }
}
