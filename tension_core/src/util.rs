//! Small timing helpers shared by the motion driver.

/// Control-tick period in microseconds for a tick rate in Hz. Clamps the
/// rate to at least 1 Hz and the result to at least 1 us.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (1_000_000 / u64::from(hz.max(1))).max(1)
}

#[cfg(test)]
mod tests {
    use super::period_us;

    #[test]
    fn common_rates() {
        assert_eq!(period_us(20), 50_000);
        assert_eq!(period_us(200), 5_000);
        assert_eq!(period_us(0), 1_000_000);
    }
}
