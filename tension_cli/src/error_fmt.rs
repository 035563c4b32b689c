//! Human-readable error descriptions, structured JSON output, and exit codes.

use tension_core::error::{AbortReason, BuildError, TensionError};
use tension_core::session::SessionOutcome;

pub fn abort_reason_name(r: AbortReason) -> &'static str {
    match r {
        AbortReason::Cancelled => "Cancelled",
        AbortReason::SensorImplausible => "SensorImplausible",
        AbortReason::CorrectionLimit => "CorrectionLimit",
        AbortReason::MaxRuntime => "MaxRuntime",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes
/// and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        let BuildError::InvalidConfig(msg) = be;
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    if let Some(te) = err.downcast_ref::<TensionError>() {
        return match te {
            TensionError::Timeout => {
                "What happened: The external tension sensor timed out.\nLikely causes: Sensor unplugged, serial link down, or timeouts.sensor_ms too low.\nHow to fix: Check the sensor cabling and consider raising timeouts.sensor_ms.".to_string()
            }
            TensionError::Abort(AbortReason::MaxRuntime) => {
                "What happened: A motion exceeded the maximum allowed runtime.\nLikely causes: Slipping wire, wrong steps-per-gram, or a stuck stage.\nHow to fix: Inspect the rig; raise safety.max_motion_ms only if the mechanics are sound.".to_string()
            }
            TensionError::Hardware(msg) | TensionError::HardwareFault(msg) => format!(
                "What happened: The tensioning stage reported a hardware error ({msg}).\nLikely causes: Motor driver fault or a disconnected stage.\nHow to fix: Power-cycle the stage and rerun; check the logs for detail."
            ),
            other => format!(
                "What happened: {other}.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {err}"
    )
}

/// Human-readable explanation for an aborted (non-error) session.
pub fn humanize_abort(reason: AbortReason) -> String {
    match reason {
        AbortReason::Cancelled => reason.to_string(),
        AbortReason::SensorImplausible => format!(
            "{reason}\nLikely causes: Snapped wire, dead sensor battery, or a loose pickup.\nHow to fix: Inspect the wire and sensor, then start a new session."
        ),
        AbortReason::CorrectionLimit => format!(
            "{reason}\nLikely causes: Sensor disagreement larger than the trim steps can bridge.\nHow to fix: Check calibration of both sensors; raise correction.max_passes only if readings are sane."
        ),
        AbortReason::MaxRuntime => reason.to_string(),
    }
}

/// Stable exit codes: aborted sessions get distinct codes, other errors 1.
pub fn exit_code_for_abort(reason: AbortReason) -> i32 {
    match reason {
        AbortReason::Cancelled => 3,
        AbortReason::SensorImplausible => 4,
        AbortReason::CorrectionLimit => 5,
        AbortReason::MaxRuntime => 6,
    }
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(TensionError::Abort(reason)) = err.downcast_ref::<TensionError>() {
        return exit_code_for_abort(*reason);
    }
    1
}

/// One JSON line summarizing a finished session.
pub fn format_outcome_json(command: &str, outcome: &SessionOutcome, duration_ms: u64) -> String {
    serde_json::json!({
        "command": command,
        "accepted": outcome.accepted,
        "tension_g": outcome.tension_g,
        "frequency_hz": outcome.frequency_hz,
        "abort_reason": outcome.reason.map(abort_reason_name),
        "duration_ms": duration_ms,
    })
    .to_string()
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    if let Some(TensionError::Abort(reason)) = err.downcast_ref::<TensionError>() {
        return serde_json::json!({
            "reason": abort_reason_name(*reason),
            "message": humanize(err),
        })
        .to_string();
    }
    serde_json::json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
