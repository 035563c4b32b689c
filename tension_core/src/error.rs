use thiserror::Error;

/// Reason a tensioning session (or a single motion) was aborted.
///
/// Cancellation is operator-initiated and expected; the remaining variants
/// are faults. Display strings are shown verbatim to the operator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    #[error("cancelled, no tension saved")]
    Cancelled,
    #[error("invalid tension, check hardware")]
    SensorImplausible,
    #[error("tension did not converge within the correction pass limit")]
    CorrectionLimit,
    #[error("max motion time exceeded")]
    MaxRuntime,
}

#[derive(Debug, Error, Clone)]
pub enum TensionError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Map a trait-boundary error to a typed `TensionError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TensionError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<tension_hardware::error::HwError>() {
            return match hw {
                tension_hardware::error::HwError::Timeout => TensionError::Timeout,
                other => TensionError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        TensionError::Timeout
    } else {
        TensionError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::{TensionError, map_hw_error};

    #[test]
    fn timeout_heuristic_matches_case_insensitively() {
        let e = std::io::Error::other("sensor read Timeout after 150ms");
        assert!(matches!(map_hw_error(&e), TensionError::Timeout));
    }

    #[test]
    fn unknown_errors_fall_back_to_hardware() {
        let e = std::io::Error::other("stage offline");
        match map_hw_error(&e) {
            TensionError::Hardware(msg) => assert!(msg.contains("stage offline")),
            other => panic!("expected hardware error, got {other:?}"),
        }
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hw_errors_are_downcast() {
        let e = tension_hardware::error::HwError::Timeout;
        assert!(matches!(map_hw_error(&e), TensionError::Timeout));
        let e = tension_hardware::error::HwError::Motor("driver fault".into());
        assert!(matches!(map_hw_error(&e), TensionError::HardwareFault(_)));
    }
}
