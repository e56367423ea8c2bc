//! Coarse color classification from raw RGBC counts.
//!
//! Thresholds are fixed; the classifier model was trained against exactly
//! these labels, so changing them silently shifts predictions.

use pfvs_traits::{ColorLabel, Rgbc};

/// Below this clear count the sample is too dark to tell anything but black.
pub const DARK_CLEAR: u16 = 30;
/// A chromatic channel must carry more than this share of `r+g+b`...
pub const DOMINANT_RATIO: f32 = 0.5;
/// ...while both other channels stay below this share.
pub const MINOR_RATIO: f32 = 0.3;
/// Minimum clear count for white.
pub const WHITE_CLEAR: u16 = 400;
/// Every channel must carry at least this share for white.
pub const WHITE_MIN_RATIO: f32 = 0.25;
/// All three channels below this count reads as black.
pub const LOW_CHANNEL: u16 = 50;

/// Normalized `(r, g, b)` shares of `r+g+b`; all zero when the sum is zero.
pub fn ratios(c: Rgbc) -> (f32, f32, f32) {
    let sum = u32::from(c.r) + u32::from(c.g) + u32::from(c.b);
    if sum == 0 {
        return (0.0, 0.0, 0.0);
    }
    let s = sum as f32;
    (
        f32::from(c.r) / s,
        f32::from(c.g) / s,
        f32::from(c.b) / s,
    )
}

/// Classify raw counts into a `ColorLabel`. Total over all inputs.
pub fn classify_color(c: Rgbc) -> ColorLabel {
    if c.clear < DARK_CLEAR {
        return ColorLabel::K;
    }

    let (r, g, b) = ratios(c);
    let dominant = |x: f32, y: f32, z: f32| x > DOMINANT_RATIO && y < MINOR_RATIO && z < MINOR_RATIO;
    if dominant(r, g, b) {
        return ColorLabel::R;
    }
    if dominant(g, r, b) {
        return ColorLabel::G;
    }
    if dominant(b, r, g) {
        return ColorLabel::B;
    }

    if c.clear >= WHITE_CLEAR && r >= WHITE_MIN_RATIO && g >= WHITE_MIN_RATIO && b >= WHITE_MIN_RATIO {
        return ColorLabel::W;
    }

    if c.r < LOW_CHANNEL && c.g < LOW_CHANNEL && c.b < LOW_CHANNEL {
        return ColorLabel::K;
    }

    ColorLabel::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sum_has_zero_ratios() {
        assert_eq!(ratios(Rgbc::new(0, 0, 0, 500)), (0.0, 0.0, 0.0));
    }

    #[test]
    fn bright_zero_rgb_is_black_by_low_channels() {
        // clear is high but no chromatic counts: ratios are all zero, so
        // neither R/G/B nor W apply and the low-channel rule decides.
        assert_eq!(classify_color(Rgbc::new(0, 0, 0, 500)), ColorLabel::K);
    }
}
