//! Maps `Box<dyn Error>` from trait boundaries to typed `VerifyError`.
//!
//! The traits in `pfvs_traits` use `Box<dyn Error + Send + Sync>` so drivers
//! keep their own error types; this module converts those to our typed enum,
//! with an optional feature-gated path for `pfvs_hardware::HwError`
//! downcasting.

use crate::error::VerifyError;

/// Map a sensor-gateway error to a typed `VerifyError`.
///
/// `stage` names the step that failed ("dark read", "shutter 2", ...) and is
/// kept in the message.
pub fn map_sensor_error(stage: &str, e: &(dyn std::error::Error + 'static)) -> VerifyError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<pfvs_hardware::error::HwError>() {
            return match hw {
                pfvs_hardware::error::HwError::Timeout => VerifyError::SensorTimeout,
                other => VerifyError::Sensor(format!("{stage}: {other}")),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        VerifyError::SensorTimeout
    } else {
        VerifyError::Sensor(format!("{stage}: {s}"))
    }
}

pub fn map_classifier_error(e: &(dyn std::error::Error + 'static)) -> VerifyError {
    VerifyError::Classification(e.to_string())
}

pub fn map_printer_error(action: &str, e: &(dyn std::error::Error + 'static)) -> VerifyError {
    VerifyError::Printer(format!("{action}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_text_maps_to_sensor_timeout() {
        let e = std::io::Error::other("read timeout on bus");
        assert_eq!(map_sensor_error("dark read", &e), VerifyError::SensorTimeout);
    }

    #[test]
    fn other_errors_keep_the_stage() {
        let e = std::io::Error::other("nack");
        match map_sensor_error("light read", &e) {
            VerifyError::Sensor(msg) => assert_eq!(msg, "light read: nack"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_timeout_downcasts() {
        let e = pfvs_hardware::error::HwError::Timeout;
        assert_eq!(map_sensor_error("x", &e), VerifyError::SensorTimeout);
    }
}
