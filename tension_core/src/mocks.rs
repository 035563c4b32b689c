//! Test and helper mocks for tension_core

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tension_traits::{FreqReading, FreqSensor, MotionHw};

use crate::session::{RecordSink, TensionRecord};

/// Idealized stage: each step moves exactly one gram-force per raw step and
/// the external sensor reports the commanded position exactly.
#[derive(Debug)]
pub struct IdealRig {
    position_g: f32,
    g_per_step: f32,
}

impl IdealRig {
    pub fn new() -> Self {
        Self::at(0.0)
    }

    pub fn at(position_g: f32) -> Self {
        Self {
            position_g,
            g_per_step: 1.0,
        }
    }

    pub fn position(&self) -> f32 {
        self.position_g
    }
}

impl Default for IdealRig {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionHw for IdealRig {
    fn advance(&mut self, steps: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.position_g += steps as f32 * self.g_per_step;
        Ok(())
    }

    fn read_tension(
        &mut self,
        _timeout: Duration,
    ) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.position_g)
    }
}

/// Stage whose motor and sensor always fail; exercises the hardware-fault
/// paths.
pub struct OfflineRig;

impl MotionHw for OfflineRig {
    fn advance(&mut self, _steps: i32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("stage offline")))
    }

    fn read_tension(
        &mut self,
        _timeout: Duration,
    ) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("stage offline")))
    }
}

/// Frequency sensor that replays a scripted tension sequence, then repeats
/// the last value. Frequencies are derived so related readings stay
/// consistent across calls.
pub struct ScriptedFreqSensor {
    seq: Vec<FreqReading>,
    idx: usize,
    calls: usize,
}

impl ScriptedFreqSensor {
    pub fn from_tensions(tensions: &[f32]) -> Self {
        let seq = tensions
            .iter()
            .map(|&t| FreqReading {
                tension_g: t,
                frequency_hz: t * 0.25,
            })
            .collect();
        Self {
            seq,
            idx: 0,
            calls: 0,
        }
    }

    pub fn constant(tension_g: f32) -> Self {
        Self::from_tensions(&[tension_g])
    }

    /// Number of measurements taken so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl FreqSensor for ScriptedFreqSensor {
    fn measure(&mut self) -> Result<FreqReading, Box<dyn std::error::Error + Send + Sync>> {
        self.calls += 1;
        let r = if self.idx < self.seq.len() {
            let r = self.seq[self.idx];
            self.idx += 1;
            r
        } else {
            self.seq.last().copied().unwrap_or(FreqReading {
                tension_g: 0.0,
                frequency_hz: 0.0,
            })
        };
        Ok(r)
    }
}

/// Frequency sensor that always fails; exercises the fatal-hardware path
/// distinct from implausible readings.
pub struct DeadFreqSensor;

impl FreqSensor for DeadFreqSensor {
    fn measure(&mut self) -> Result<FreqReading, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("frequency sensor unreachable")))
    }
}

/// Record sink that stores into a shared in-memory vector, so tests can
/// inspect what was persisted after the session owns the sink.
pub struct MemorySink {
    records: Rc<RefCell<Vec<TensionRecord>>>,
}

impl MemorySink {
    pub fn new() -> (Self, Rc<RefCell<Vec<TensionRecord>>>) {
        let records = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                records: records.clone(),
            },
            records,
        )
    }
}

impl RecordSink for MemorySink {
    fn store(
        &mut self,
        record: &TensionRecord,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}
