//! Human-readable error descriptions and structured JSON error formatting.

use pfvs_core::error::{BuildError, VerifyError};

use crate::replay::PrintRejected;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingGateway => {
                "What happened: No sensor gateway was provided to the interceptor.\nLikely causes: The sensor head failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor head is created successfully and passed via with_gateway(...).".to_string()
            }
            BuildError::MissingClassifier => {
                "What happened: No material classifier was provided to the interceptor.\nLikely causes: The reference spectra failed to load.\nHow to fix: Check classifier.references in the config and pass the model via with_classifier(...).".to_string()
            }
            BuildError::MissingPrinter => {
                "What happened: No printer control was provided to the interceptor.\nLikely causes: The print host link was not wired into the builder.\nHow to fix: Pass a printer via with_printer(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/pfvs_config.toml for a sample."
            ),
        };
    }

    if let Some(rejected) = err.downcast_ref::<PrintRejected>() {
        return format!(
            "What happened: The print was cancelled: {}.\nLikely causes: The loaded filament does not match a material this machine may print.\nHow to fix: Load a supported filament (PLA) and start the print again.",
            rejected.0
        );
    }

    if let Some(ve) = err.downcast_ref::<VerifyError>() {
        return match ve {
            VerifyError::SensorTimeout => {
                "What happened: The sensor head did not answer in time.\nLikely causes: Loose cable, missing power, or a busy bus.\nHow to fix: Check the sensor head wiring and power, then rerun `pfvs self-check`.".to_string()
            }
            VerifyError::Sensor(msg) => format!(
                "What happened: Sensor read failed ({msg}).\nLikely causes: Bus error, saturated channel, or a disconnected sensor head.\nHow to fix: Check the wiring and that no external light reaches the sensor, then rerun `pfvs self-check`."
            ),
            VerifyError::Classification(msg) => format!(
                "What happened: Material classification failed ({msg}).\nLikely causes: Reference spectra missing, malformed, or recorded with a different sensor.\nHow to fix: Check classifier.references and the CSV contents."
            ),
            VerifyError::NoFilamentDetected => {
                "What happened: No filament detected.\nLikely causes: Filament not loaded, or the runout switch polarity is wrong.\nHow to fix: Load filament; if it is loaded, flip sensor.filament_active_low in the config.".to_string()
            }
            VerifyError::AlreadyRunning => {
                "What happened: The sensor stream is already running.\nLikely causes: A second start without a stop.\nHow to fix: Stop the running stream first.".to_string()
            }
            // Fallback to generic for other domain errors
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reference csv must have headers") {
        return "Invalid headers in reference spectra CSV. Expected 'material,color,c0,...,c17'.".to_string();
    }

    if lower.contains("reference csv") || lower.contains("reference row") {
        return format!(
            "What happened: Reference spectra could not be loaded.\nLikely causes: Wrong classifier.references path or a malformed row.\nHow to fix: Fix the CSV or the path in the config. Original: {msg}"
        );
    }

    if lower.contains("open filament switch") || lower.contains("gpio") {
        return "What happened: Failed to initialize GPIO inputs.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("invalid configuration") || lower.contains("read config") {
        return format!(
            "What happened: Configuration is invalid or unreadable.\nLikely causes: Wrong --config path or out-of-range values.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 sensor, 4 classification, 5 no filament, 6 print rejected, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<PrintRejected>().is_some() {
        return 6;
    }
    match err.downcast_ref::<VerifyError>() {
        Some(e) if e.is_sensor() => 3,
        Some(VerifyError::Classification(_)) => 4,
        Some(VerifyError::NoFilamentDetected) => 5,
        _ => 1,
    }
}

/// Stable machine-readable name for the error kind.
fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<PrintRejected>().is_some() {
        return "PrintRejected";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "BuildError";
    }
    match err.downcast_ref::<VerifyError>() {
        Some(VerifyError::Sensor(_)) => "Sensor",
        Some(VerifyError::SensorTimeout) => "SensorTimeout",
        Some(VerifyError::Classification(_)) => "Classification",
        Some(VerifyError::NoFilamentDetected) => "NoFilamentDetected",
        Some(VerifyError::Printer(_)) => "Printer",
        Some(_) => "Verify",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let obj = match err.downcast_ref::<PrintRejected>() {
        Some(rejected) => json!({
            "reason": reason_name(err),
            "details": { "cancel_reason": rejected.0 },
            "message": humanize(err),
        }),
        None => json!({ "reason": reason_name(err), "message": humanize(err) }),
    };
    obj.to_string()
}
