//! `From` implementations bridging `pfvs_config` types to `pfvs_core` types.

use std::time::Duration;

use crate::classifier::{NearestCentroid, ReferenceSpectrum};
use crate::config::{PolicyCfg, StreamCfg};

// ── PolicyCfg ────────────────────────────────────────────────────────────────

impl From<&pfvs_config::PolicyCfg> for PolicyCfg {
    fn from(c: &pfvs_config::PolicyCfg) -> Self {
        Self {
            probe_target_c: c.probe_target_c,
            tolerance_ratio: c.tolerance_ratio,
            cooldown: Duration::from_millis(c.cooldown_ms),
        }
    }
}

// ── StreamCfg ────────────────────────────────────────────────────────────────

impl From<&pfvs_config::StreamCfg> for StreamCfg {
    fn from(c: &pfvs_config::StreamCfg) -> Self {
        Self {
            sample_period: Duration::from_millis(c.sample_ms),
            channel_capacity: c.channel_capacity,
        }
    }
}

// ── Reference spectra ────────────────────────────────────────────────────────

impl From<pfvs_config::ReferenceRow> for ReferenceSpectrum {
    fn from(r: pfvs_config::ReferenceRow) -> Self {
        Self {
            material: r.material,
            color: r.color,
            channels: r.channels,
        }
    }
}

impl From<Vec<pfvs_config::ReferenceRow>> for NearestCentroid {
    fn from(rows: Vec<pfvs_config::ReferenceRow>) -> Self {
        NearestCentroid::new(rows.into_iter().map(ReferenceSpectrum::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults_agree_across_crates() {
        let from_toml = PolicyCfg::from(&pfvs_config::PolicyCfg::default());
        assert_eq!(from_toml, PolicyCfg::default());
    }

    #[test]
    fn stream_defaults_agree_across_crates() {
        let from_toml = StreamCfg::from(&pfvs_config::StreamCfg::default());
        assert_eq!(from_toml, StreamCfg::default());
    }
}
