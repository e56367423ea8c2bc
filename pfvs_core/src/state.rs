//! Print lifecycle tracking from host notifications and temperature echoes.

use tracing::{debug, info};

/// Tolerance when comparing a reported target against the probe value.
const PROBE_EPSILON_C: f32 = 0.05;

/// Host lifecycle notification, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostState {
    Starting,
    Printing,
    Other(String),
}

impl HostState {
    /// `STARTING` and `PRINTING` (any case) are recognized; everything else is `Other`.
    pub fn classify(id: &str) -> Self {
        let id = id.trim();
        if id.eq_ignore_ascii_case("STARTING") {
            HostState::Starting
        } else if id.eq_ignore_ascii_case("PRINTING") {
            HostState::Printing
        } else {
            HostState::Other(id.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Idle,
    Starting,
    /// Print running, real target not yet committed.
    AwaitingFinalTemp,
    /// Target committed; the verification cycle runs on the next `Printing`.
    Verifying { target_c: f32 },
    Printing,
    /// Print paused while (or after a failed) verification.
    PausedForVerify { target_c: f32 },
    Cancelled { reason: String },
}

impl LifecycleState {
    /// Probing posture: the next non-probe target echo may commit.
    pub fn waiting_for_final_temp(&self) -> bool {
        matches!(
            self,
            LifecycleState::Idle
                | LifecycleState::Starting
                | LifecycleState::AwaitingFinalTemp
                | LifecycleState::Printing
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Starting => "starting",
            LifecycleState::AwaitingFinalTemp => "awaiting_final_temp",
            LifecycleState::Verifying { .. } => "verifying",
            LifecycleState::Printing => "printing",
            LifecycleState::PausedForVerify { .. } => "paused_for_verify",
            LifecycleState::Cancelled { .. } => "cancelled",
        }
    }
}

/// What the caller must do after feeding an input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Nothing,
    Verify { target_c: f32 },
}

#[derive(Debug, Clone)]
pub struct PrintStateMachine {
    state: LifecycleState,
    probe_target_c: f32,
}

impl PrintStateMachine {
    pub fn new(probe_target_c: f32) -> Self {
        Self {
            state: LifecycleState::Idle,
            probe_target_c,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn waiting_for_final_temp(&self) -> bool {
        self.state.waiting_for_final_temp()
    }

    pub(crate) fn set(&mut self, next: LifecycleState) {
        if next != self.state {
            info!(from = self.state.name(), to = next.name(), "lifecycle transition");
            self.state = next;
        }
    }

    pub fn on_host_state(&mut self, host: &HostState) -> Step {
        match host {
            HostState::Starting => {
                self.set(LifecycleState::Starting);
                Step::Nothing
            }
            HostState::Printing => match self.state {
                LifecycleState::Starting => {
                    self.set(LifecycleState::AwaitingFinalTemp);
                    Step::Nothing
                }
                LifecycleState::Verifying { target_c } => Step::Verify { target_c },
                LifecycleState::AwaitingFinalTemp | LifecycleState::Printing => Step::Nothing,
                LifecycleState::PausedForVerify { .. } => {
                    self.set(LifecycleState::Printing);
                    Step::Nothing
                }
                LifecycleState::Idle | LifecycleState::Cancelled { .. } => {
                    self.set(LifecycleState::Idle);
                    Step::Nothing
                }
            },
            HostState::Other(id) => {
                debug!(state = %id, "unhandled host state; back to idle");
                self.set(LifecycleState::Idle);
                Step::Nothing
            }
        }
    }

    /// True for the probe pre-heat value and for a zero (heater off) target.
    pub fn is_probe_target(&self, target_c: f32) -> bool {
        (target_c - self.probe_target_c).abs() <= PROBE_EPSILON_C || target_c.abs() <= PROBE_EPSILON_C
    }

    /// Back to `AwaitingFinalTemp` from `Printing`; false in any other state.
    pub fn rearm(&mut self) -> bool {
        if self.state != LifecycleState::Printing {
            return false;
        }
        self.set(LifecycleState::AwaitingFinalTemp);
        true
    }

    /// Feed a reported hotend target.
    ///
    /// `Starting` commits and waits for `PRINTING`; `AwaitingFinalTemp`
    /// commits and verifies at once. While `Printing`, a probe or zero target
    /// re-arms and any other target is the already verified one.
    pub fn on_temperature(&mut self, target_c: f32) -> Step {
        let awaiting = match self.state {
            LifecycleState::Starting => false,
            LifecycleState::AwaitingFinalTemp => true,
            LifecycleState::Printing => {
                if self.is_probe_target(target_c) {
                    debug!(target_c, "target dropped mid-print; re-arming");
                    self.rearm();
                }
                return Step::Nothing;
            }
            _ => return Step::Nothing,
        };
        if self.is_probe_target(target_c) {
            return Step::Nothing;
        }
        info!(target_c, "final print temperature committed");
        self.set(LifecycleState::Verifying { target_c });
        if awaiting {
            Step::Verify { target_c }
        } else {
            Step::Nothing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(HostState::classify(" printing "), HostState::Printing);
        assert_eq!(HostState::classify("Starting"), HostState::Starting);
        assert_eq!(
            HostState::classify("OPERATIONAL"),
            HostState::Other("OPERATIONAL".into())
        );
    }

    #[test]
    fn zero_target_is_ignored() {
        let mut m = PrintStateMachine::new(170.0);
        m.on_host_state(&HostState::Starting);
        assert_eq!(m.on_temperature(0.0), Step::Nothing);
        assert_eq!(m.state(), &LifecycleState::Starting);
    }

    #[test]
    fn committed_target_waits_for_printing() {
        let mut m = PrintStateMachine::new(170.0);
        m.on_host_state(&HostState::Starting);
        assert_eq!(m.on_temperature(215.0), Step::Nothing);
        assert!(!m.waiting_for_final_temp());
        assert_eq!(
            m.on_host_state(&HostState::Printing),
            Step::Verify { target_c: 215.0 }
        );
    }

    #[test]
    fn rearm_only_leaves_printing() {
        let mut m = PrintStateMachine::new(170.0);
        assert!(!m.rearm());
        assert_eq!(m.state(), &LifecycleState::Idle);
        m.set(LifecycleState::Printing);
        assert!(m.rearm());
        assert_eq!(m.state(), &LifecycleState::AwaitingFinalTemp);
    }

    #[test]
    fn dropped_target_while_printing_verifies_the_next_one() {
        let mut m = PrintStateMachine::new(170.0);
        m.set(LifecycleState::Printing);
        // echo of the verified target
        assert_eq!(m.on_temperature(210.0), Step::Nothing);
        assert_eq!(m.state(), &LifecycleState::Printing);

        assert_eq!(m.on_temperature(0.0), Step::Nothing);
        assert_eq!(m.state(), &LifecycleState::AwaitingFinalTemp);
        assert_eq!(m.on_temperature(170.0), Step::Nothing);
        assert_eq!(m.on_temperature(250.0), Step::Verify { target_c: 250.0 });
    }
}
