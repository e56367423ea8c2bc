use std::time::{Duration, Instant};

use pfvs_core::policy::within_tolerance;
use pfvs_core::{Decision, MaterialPolicy, PolicyCfg, ScanSession};
use pfvs_traits::MaterialLabel;
use proptest::prelude::*;
use rstest::rstest;

fn policy() -> MaterialPolicy {
    MaterialPolicy::new(PolicyCfg::default())
}

#[rstest]
#[case("ASA")]
#[case("asa ")]
fn asa_is_rejected_and_counted(#[case] label: &str) {
    let mut session = ScanSession::new();
    let decision = policy().decide(&MaterialLabel::new(label), 260.0, &mut session, Instant::now());
    assert!(matches!(decision, Decision::Reject(ref reason) if reason.contains("ASA")));
    assert_eq!(session.counters.asa, 1);
    assert_eq!(session.counters.prints_stopped, 1);
    assert_eq!(session.counters.settings_changed, 0);
}

#[rstest]
#[case("PETG")]
#[case("PET")]
fn petg_and_its_alias_are_rejected(#[case] label: &str) {
    let mut session = ScanSession::new();
    let decision = policy().decide(&MaterialLabel::new(label), 240.0, &mut session, Instant::now());
    assert!(matches!(decision, Decision::Reject(_)));
    assert_eq!(session.counters.petg, 1);
    assert_eq!(session.counters.prints_stopped, 1);
}

#[test]
fn pla_at_wrong_temperature_is_corrected() {
    let mut session = ScanSession::new();
    let now = Instant::now();
    let decision = policy().decide(&MaterialLabel::new("PLA"), 200.0, &mut session, now);
    assert_eq!(
        decision,
        Decision::Correct(vec![
            "M140 S60".into(),
            "M104 S210".into(),
            "M190 S60".into(),
            "M109 S210".into(),
        ])
    );
    assert_eq!(session.counters.pla, 1);
    // proposed, not yet delivered
    assert_eq!(session.counters.settings_changed, 0);
    assert!(session.last_correction.is_none());

    policy().commit_correction(&mut session, now);
    assert_eq!(session.counters.settings_changed, 1);
    assert_eq!(session.last_correction, Some(now));
}

#[test]
fn undelivered_correction_does_not_start_the_cooldown() {
    let p = policy();
    let mut session = ScanSession::new();
    let t0 = Instant::now();
    let pla = MaterialLabel::new("PLA");

    assert!(matches!(p.decide(&pla, 200.0, &mut session, t0), Decision::Correct(_)));
    // no commit: the send never happened
    let soon = t0 + Duration::from_millis(500);
    assert!(matches!(p.decide(&pla, 200.0, &mut session, soon), Decision::Correct(_)));
    assert_eq!(session.counters.settings_changed, 0);
    assert_eq!(session.counters.pla, 2);
}

#[test]
fn pla_at_profile_temperature_is_allowed() {
    let mut session = ScanSession::new();
    let decision = policy().decide(&MaterialLabel::new("pla"), 210.0, &mut session, Instant::now());
    assert_eq!(decision, Decision::Allow);
    assert_eq!(session.counters.pla, 1);
    assert!(session.last_correction.is_none());
}

#[test]
fn unknown_material_is_allowed_without_counting() {
    let mut session = ScanSession::new();
    let decision = policy().decide(&MaterialLabel::new("Nylon"), 250.0, &mut session, Instant::now());
    assert_eq!(decision, Decision::Allow);
    assert!(session.counters.is_zero());
}

#[test]
fn second_correction_within_cooldown_is_suppressed() {
    let p = policy();
    let mut session = ScanSession::new();
    let t0 = Instant::now();
    let pla = MaterialLabel::new("PLA");

    assert!(matches!(p.decide(&pla, 200.0, &mut session, t0), Decision::Correct(_)));
    p.commit_correction(&mut session, t0);
    let within = t0 + Duration::from_millis(9_999);
    assert_eq!(p.decide(&pla, 200.0, &mut session, within), Decision::Allow);
    assert_eq!(session.counters.settings_changed, 1);
    // the suppressed call does not move the stamp
    assert_eq!(session.last_correction, Some(t0));

    let after = t0 + Duration::from_secs(10);
    assert!(matches!(p.decide(&pla, 200.0, &mut session, after), Decision::Correct(_)));
    p.commit_correction(&mut session, after);
    assert_eq!(session.counters.settings_changed, 2);
}

#[test]
fn custom_tolerance_is_honoured() {
    let p = MaterialPolicy::new(PolicyCfg {
        tolerance_ratio: 0.1,
        ..PolicyCfg::default()
    });
    let mut session = ScanSession::new();
    let decision = p.decide(&MaterialLabel::new("PLA"), 200.0, &mut session, Instant::now());
    assert_eq!(decision, Decision::Allow);
}

proptest! {
    #[test]
    fn within_tolerance_never_corrects(target in 190.0f32..230.0) {
        let p = policy();
        let mut session = ScanSession::new();
        let decision = p.decide(&MaterialLabel::new("PLA"), target, &mut session, Instant::now());
        if within_tolerance(target, 210.0, 0.01) {
            prop_assert_eq!(decision, Decision::Allow);
        } else {
            prop_assert!(matches!(decision, Decision::Correct(_)));
        }
    }

    #[test]
    fn at_most_one_correction_per_cooldown_window(
        offsets_ms in prop::collection::vec(0u64..10_000, 1..20)
    ) {
        let p = policy();
        let mut session = ScanSession::new();
        let t0 = Instant::now();
        let mut sorted = offsets_ms;
        sorted.sort_unstable();
        let mut corrections = 0;
        for ms in sorted {
            let now = t0 + Duration::from_millis(ms);
            if matches!(p.decide(&MaterialLabel::new("PLA"), 180.0, &mut session, now), Decision::Correct(_)) {
                p.commit_correction(&mut session, now);
                corrections += 1;
            }
        }
        prop_assert_eq!(corrections, 1);
    }
}
