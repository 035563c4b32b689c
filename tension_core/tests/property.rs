use std::sync::Arc;

use proptest::prelude::*;

use tension_core::bias::BiasState;
use tension_core::config::{DriverCfg, Window};
use tension_core::driver::{MotionDriver, MotionResult};
use tension_core::mocks::IdealRig;
use tension_core::sampler;
use tension_traits::clock::test_clock::TestClock;

proptest! {
    #[test]
    fn bias_arithmetic_is_exact_sum(
        base in 0.0f32..1000.0,
        inc in proptest::collection::vec(0.0f32..100.0, 0..8),
        dec in proptest::collection::vec(0.0f32..100.0, 0..8),
    ) {
        let mut bias = BiasState::new(10.0);
        for &a in &inc {
            bias.bump_increase(a);
        }
        for &a in &dec {
            bias.bump_decrease(a);
        }
        let expected = base + inc.iter().sum::<f32>() - dec.iter().sum::<f32>();
        prop_assert!((bias.effective_target(base) - expected).abs() < 0.05);
    }

    #[test]
    fn bump_decrease_never_raises_the_target(
        base in 100.0f32..500.0,
        amount in 0.0f32..100.0,
    ) {
        let mut bias = BiasState::new(10.0);
        let before = bias.effective_target(base);
        bias.bump_decrease(amount);
        prop_assert!(bias.effective_target(base) <= before);
    }

    #[test]
    fn window_deviation_is_zero_iff_contained(
        low in 0.0f32..500.0,
        width in 0.0f32..200.0,
        x in -100.0f32..800.0,
    ) {
        let w = Window::new(low, low + width);
        prop_assert_eq!(w.contains(x), w.deviation(x) == 0.0);
        prop_assert!(w.deviation(x) >= 0.0);
    }

    #[test]
    fn mean_of_identical_samples_is_identity(
        x in -1000.0f32..1000.0,
        n in 1usize..16,
    ) {
        let samples = vec![x; n];
        prop_assert!((sampler::mean(&samples) - x).abs() < 1e-3);
    }

    // With a dead-band at least one stride wide the driver cannot overshoot
    // past the band, so every reachable target converges.
    #[test]
    fn step_to_converges_for_any_target_and_stride(
        start in 0.0f32..600.0,
        target in 0.0f32..600.0,
        stride in 1i32..=20,
    ) {
        let cfg = DriverCfg {
            samples_per_tick: 1,
            dead_band_g: stride as f32,
            sample_rate_hz: 200,
            sensor_timeout_ms: 10,
            max_motion_ms: 600_000,
            stride_coarse: 10,
            stride_fine: 5,
        };
        let mut driver = MotionDriver::new(IdealRig::at(start), cfg)
            .with_clock(Arc::new(TestClock::new()));
        let result = driver.step_to(target, stride, &mut |_| {});
        prop_assert_eq!(result.unwrap(), MotionResult::Converged);
        prop_assert!((driver.last_tension() - target).abs() <= stride as f32);
    }
}
