pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// One resonant-frequency measurement: the internal tension estimate in
/// grams-force plus the raw resonant frequency it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreqReading {
    pub tension_g: f32,
    pub frequency_hz: f32,
}

/// Motorized tensioning stage: a stepper motor plus the external
/// displacement-based tension sensor mounted on the same rig.
pub trait MotionHw {
    /// Advance the motor by a signed number of raw steps.
    /// Positive steps increase tension, negative steps release it.
    fn advance(&mut self, steps: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Read the external tension sensor in grams-force.
    fn read_tension(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<f32, Box<dyn std::error::Error + Send + Sync>>;
}

/// Resonant-frequency tension sensor.
///
/// A measurement may take seconds and may return physically implausible
/// values (noise, wire snap, low battery) with no error signal; validity is
/// judged entirely by range on the caller's side.
pub trait FreqSensor {
    fn measure(&mut self) -> Result<FreqReading, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: MotionHw + ?Sized> MotionHw for Box<T> {
    fn advance(&mut self, steps: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).advance(steps)
    }

    fn read_tension(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_tension(timeout)
    }
}

impl<T: FreqSensor + ?Sized> FreqSensor for Box<T> {
    fn measure(&mut self) -> Result<FreqReading, Box<dyn std::error::Error + Send + Sync>> {
        (**self).measure()
    }
}
