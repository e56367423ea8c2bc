//! Runtime configuration for the verification core.
//!
//! These are separate from the TOML-deserialized config in `pfvs_config`;
//! `conversions` maps one onto the other.

use std::time::Duration;

/// Admission policy knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyCfg {
    /// Pre-heat target the firmware reports while probing; never treated as the real target.
    pub probe_target_c: f32,
    /// Relative nozzle-temperature mismatch at which a correction is issued.
    pub tolerance_ratio: f32,
    /// Minimum spacing between two corrections in one session.
    pub cooldown: Duration,
}

impl Default for PolicyCfg {
    fn default() -> Self {
        Self {
            probe_target_c: 170.0,
            tolerance_ratio: 0.01,
            cooldown: Duration::from_millis(10_000),
        }
    }
}

/// Background sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamCfg {
    pub sample_period: Duration,
    /// Bounded queue depth; samples are dropped when the consumer lags.
    pub channel_capacity: usize,
}

impl Default for StreamCfg {
    fn default() -> Self {
        Self {
            sample_period: Duration::from_millis(250),
            channel_capacity: 16,
        }
    }
}
