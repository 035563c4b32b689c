#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core wire-tension control logic (hardware-agnostic).
//!
//! This crate drives a motorized tensioning stage to commanded setpoints and
//! converges a wire's tension into a narrow acceptance band. All hardware
//! interactions go through the `tension_traits::MotionHw` and
//! `tension_traits::FreqSensor` traits.
//!
//! ## Architecture
//!
//! - **Sampling**: per-tick batch reduction of external-sensor readings
//!   (`sampler` module)
//! - **Motion**: cancellable step/hold driver with a motion watchdog
//!   (`driver` module)
//! - **Measurement**: frequency-sensor one-retry plausibility policy
//!   (`measure` module)
//! - **Bias**: session-local accumulated trim terms (`bias` module)
//! - **Session**: the multi-phase auto-tension state machine and the
//!   single-phase operator procedures (`session` module)

pub mod bias;
pub mod config;
pub mod conversions;
pub mod driver;
pub mod error;
pub mod measure;
pub mod mocks;
pub mod sampler;
pub mod session;
pub mod util;

pub use bias::BiasState;
pub use config::{CorrectionCfg, DriverCfg, PhaseTable, Window, Windows};
pub use driver::{MotionDriver, MotionResult};
pub use error::{AbortReason, BuildError, Result, TensionError};
pub use measure::{Measurement, measure_with_retry};
pub use session::{Phase, RecordSink, SessionOutcome, TensionRecord, TensionSession};
