use pfvs_core::state::Step;
use pfvs_core::{HostState, LifecycleState, PrintStateMachine};
use proptest::prelude::*;
use rstest::rstest;

fn machine() -> PrintStateMachine {
    PrintStateMachine::new(170.0)
}

#[test]
fn probe_target_in_starting_is_ignored() {
    let mut m = machine();
    m.on_host_state(&HostState::Starting);
    assert_eq!(m.on_temperature(170.0), Step::Nothing);
    assert_eq!(m.on_temperature(170.04), Step::Nothing);
    assert_eq!(m.state(), &LifecycleState::Starting);
    assert!(m.waiting_for_final_temp());
}

#[test]
fn printing_before_final_target_waits_then_verifies_immediately() {
    let mut m = machine();
    m.on_host_state(&HostState::Starting);
    assert_eq!(m.on_host_state(&HostState::Printing), Step::Nothing);
    assert_eq!(m.state(), &LifecycleState::AwaitingFinalTemp);
    assert_eq!(m.on_temperature(170.0), Step::Nothing);
    assert_eq!(m.on_temperature(205.0), Step::Verify { target_c: 205.0 });
    assert_eq!(m.state(), &LifecycleState::Verifying { target_c: 205.0 });
}

#[test]
fn temperatures_while_idle_are_ignored() {
    let mut m = machine();
    assert_eq!(m.on_temperature(200.0), Step::Nothing);
    assert_eq!(m.state(), &LifecycleState::Idle);
}

#[test]
fn verifying_ignores_further_targets() {
    let mut m = machine();
    m.on_host_state(&HostState::Starting);
    m.on_temperature(200.0);
    assert_eq!(m.on_temperature(230.0), Step::Nothing);
    assert_eq!(m.state(), &LifecycleState::Verifying { target_c: 200.0 });
}

#[rstest]
#[case("OPERATIONAL")]
#[case("PAUSED")]
#[case("")]
fn other_notifications_reset_to_idle(#[case] id: &str) {
    let mut m = machine();
    m.on_host_state(&HostState::Starting);
    m.on_temperature(215.0);
    m.on_host_state(&HostState::classify(id));
    assert_eq!(m.state(), &LifecycleState::Idle);
    assert!(m.waiting_for_final_temp());
}

#[test]
fn printing_from_idle_stays_idle() {
    let mut m = machine();
    assert_eq!(m.on_host_state(&HostState::Printing), Step::Nothing);
    assert_eq!(m.state(), &LifecycleState::Idle);
}

#[derive(Debug, Clone)]
enum Input {
    Host(&'static str),
    Temp(f32),
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        Just(Input::Host("STARTING")),
        Just(Input::Host("PRINTING")),
        Just(Input::Host("OPERATIONAL")),
        Just(Input::Temp(170.0)),
        Just(Input::Temp(0.0)),
        (1.0f32..300.0).prop_map(Input::Temp),
    ]
}

proptest! {
    #[test]
    fn non_lifecycle_notification_always_resets(inputs in prop::collection::vec(input(), 0..30)) {
        let mut m = machine();
        for i in inputs {
            match i {
                Input::Host(id) => { m.on_host_state(&HostState::classify(id)); }
                Input::Temp(t) => { m.on_temperature(t); }
            }
        }
        m.on_host_state(&HostState::Other("CLOSED".into()));
        prop_assert_eq!(m.state(), &LifecycleState::Idle);
        prop_assert!(m.waiting_for_final_temp());
    }

    #[test]
    fn probe_value_never_commits(inputs in prop::collection::vec(prop_oneof![Just("STARTING"), Just("PRINTING")], 0..10)) {
        let mut m = machine();
        for id in inputs {
            m.on_host_state(&HostState::classify(id));
            prop_assert_eq!(m.on_temperature(170.0), Step::Nothing);
            prop_assert!(!matches!(m.state(), LifecycleState::Verifying { .. }), "state must not be Verifying");
        }
    }
}
