//! Material admission policy: allow, correct the thermal profile, or reject.

use std::time::Instant;

use pfvs_traits::MaterialLabel;
use tracing::{info, warn};

use crate::config::PolicyCfg;
use crate::material::{FilamentProfile, Material, ProfileTable};
use crate::session::ScanSession;

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Let the print continue unchanged.
    Allow,
    /// Send these commands (blocking) before resuming.
    Correct(Vec<String>),
    /// Cancel the print.
    Reject(String),
}

/// True when `target_c` is within `tolerance` (relative) of `profile_c`.
pub fn within_tolerance(target_c: f32, profile_c: f32, tolerance: f32) -> bool {
    (target_c - profile_c).abs() / profile_c < tolerance
}

/// Bed first, then nozzle; set both, then wait on both.
pub fn correction_commands(profile: &FilamentProfile) -> Vec<String> {
    let bed = profile.bed_temp_c;
    let nozzle = profile.print_temp_c;
    vec![
        format!("M140 S{bed}"),
        format!("M104 S{nozzle}"),
        format!("M190 S{bed}"),
        format!("M109 S{nozzle}"),
    ]
}

#[derive(Debug, Clone)]
pub struct MaterialPolicy {
    profiles: ProfileTable,
    cfg: PolicyCfg,
}

impl MaterialPolicy {
    pub fn new(cfg: PolicyCfg) -> Self {
        Self {
            profiles: ProfileTable::builtin(),
            cfg,
        }
    }

    pub fn with_profiles(mut self, profiles: ProfileTable) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn cfg(&self) -> &PolicyCfg {
        &self.cfg
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    /// Decide what to do with a print requesting `target_c` on the scanned material.
    ///
    /// Counts the detection (and a stop) in `session`. A correction is only
    /// proposed here; the caller records it with [`Self::commit_correction`]
    /// once the commands reached the firmware. `now` must come from the same
    /// monotonic clock on every call.
    pub fn decide(
        &self,
        label: &MaterialLabel,
        target_c: f32,
        session: &mut ScanSession,
        now: Instant,
    ) -> Decision {
        let material = Material::from_label(label);
        let Some(profile) = self.profiles.lookup(&material) else {
            warn!(label = %label, target_c, "unknown material; allowing print");
            return Decision::Allow;
        };

        if !profile.printable {
            session.counters.record_detection(&material);
            session.counters.record_stop();
            let reason = format!(
                "{material} is not printable on this machine (needs {}°C nozzle, {}°C bed)",
                profile.print_temp_c, profile.bed_temp_c
            );
            warn!(%material, target_c, %reason, "rejecting print");
            return Decision::Reject(reason);
        }

        session.counters.record_detection(&material);
        let profile_c = f32::from(profile.print_temp_c);
        if within_tolerance(target_c, profile_c, self.cfg.tolerance_ratio) {
            info!(%material, target_c, profile_c, "requested temperature matches profile");
            return Decision::Allow;
        }

        if let Some(last) = session.last_correction {
            let age = now.saturating_duration_since(last);
            if age < self.cfg.cooldown {
                info!(
                    %material,
                    target_c,
                    age_ms = age.as_millis() as u64,
                    "correction suppressed by cooldown"
                );
                return Decision::Allow;
            }
        }

        let commands = correction_commands(profile);
        info!(
            %material,
            before_c = target_c,
            after_c = profile_c,
            bed_c = profile.bed_temp_c,
            commands = ?commands,
            "correcting thermal profile"
        );
        Decision::Correct(commands)
    }

    /// Count a delivered correction and start the cooldown window at `now`.
    pub fn commit_correction(&self, session: &mut ScanSession, now: Instant) {
        session.counters.record_correction();
        session.last_correction = Some(now);
    }
}

impl Default for MaterialPolicy {
    fn default() -> Self {
        Self::new(PolicyCfg::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_is_relative_to_profile() {
        assert!(within_tolerance(211.0, 210.0, 0.01));
        assert!(!within_tolerance(215.0, 210.0, 0.01));
    }

    #[test]
    fn commands_order_bed_then_nozzle() {
        let table = ProfileTable::builtin();
        let pla = table.lookup(&Material::Pla).unwrap();
        assert_eq!(
            correction_commands(pla),
            ["M140 S60", "M104 S210", "M190 S60", "M109 S210"]
        );
    }
}
