//! Dark/light spectral frames and raw-read validation.

use pfvs_traits::SPECTRAL_CHANNELS;

use crate::error::VerifyError;

/// Ceiling of the spectrometer's 16-bit raw counts.
pub const RAW_MAX: f32 = 65_535.0;

/// One light read and the dark baseline it is differenced against.
///
/// Both halves come from the same scan with identical gain and integration
/// settings; mixing frames from different scans is meaningless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralFrame {
    pub dark: [f32; SPECTRAL_CHANNELS],
    pub light: [f32; SPECTRAL_CHANNELS],
}

impl SpectralFrame {
    pub fn new(dark: [f32; SPECTRAL_CHANNELS], light: [f32; SPECTRAL_CHANNELS]) -> Self {
        Self { dark, light }
    }

    /// `light[i] - dark[i]` per channel. Negative values are kept.
    pub fn differential(&self) -> [f32; SPECTRAL_CHANNELS] {
        let mut out = [0.0f32; SPECTRAL_CHANNELS];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.light[i] - self.dark[i];
        }
        out
    }
}

/// Check a raw read for channel count and range.
pub fn validate_raw(stage: &str, raw: &[f32]) -> Result<[f32; SPECTRAL_CHANNELS], VerifyError> {
    if raw.len() != SPECTRAL_CHANNELS {
        return Err(VerifyError::Sensor(format!(
            "{stage}: expected {SPECTRAL_CHANNELS} channels, got {}",
            raw.len()
        )));
    }
    let mut out = [0.0f32; SPECTRAL_CHANNELS];
    for (i, (&v, slot)) in raw.iter().zip(out.iter_mut()).enumerate() {
        if !v.is_finite() || !(0.0..=RAW_MAX).contains(&v) {
            return Err(VerifyError::Sensor(format!(
                "{stage}: channel {i} out of range: {v}"
            )));
        }
        *slot = v;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_frames() {
        let err = validate_raw("dark read", &[1.0; 17]).unwrap_err();
        assert!(err.to_string().contains("expected 18 channels, got 17"));
    }

    #[test]
    fn rejects_values_above_ceiling() {
        let mut raw = [10.0f32; SPECTRAL_CHANNELS];
        raw[4] = 70_000.0;
        let err = validate_raw("light read", &raw).unwrap_err();
        assert!(err.to_string().contains("channel 4"));
    }

    #[test]
    fn accepts_bounds_inclusive() {
        let mut raw = [0.0f32; SPECTRAL_CHANNELS];
        raw[17] = RAW_MAX;
        assert!(validate_raw("x", &raw).is_ok());
    }
}
