//! Synchronous filter on every firmware line.
//!
//! Lines always come back unchanged; the interceptor only reacts. It owns
//! the lifecycle state and the active scan session, drives scans on filament
//! load and during verification, and talks to the printer to pause, correct,
//! resume or cancel.

use std::sync::Arc;
use std::time::Instant;

use pfvs_traits::PrinterControl;
use pfvs_traits::clock::Clock;
use tracing::{debug, error, info, warn};

use crate::builder::{InterceptorBuilder, Missing};
use crate::counters::{CounterStore, UsageCounters};
use crate::error::VerifyError;
use crate::events::{Event, EventSink, ScanTrigger};
use crate::gcode::{self, Marker, TemperatureEcho};
use crate::hw_error::map_printer_error;
use crate::policy::{Decision, MaterialPolicy};
use crate::scan::{ScanPipeline, ScanResult};
use crate::session::ScanSession;
use crate::state::{HostState, LifecycleState, PrintStateMachine, Step};

pub struct GCodeInterceptor {
    pub(crate) pipeline: ScanPipeline,
    pub(crate) printer: Box<dyn PrinterControl + Send>,
    pub(crate) policy: MaterialPolicy,
    pub(crate) machine: PrintStateMachine,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) override_check: Option<Box<dyn Fn() -> bool + Send + Sync>>,
    pub(crate) counter_store: Option<CounterStore>,
    pub(crate) session: Option<ScanSession>,
    pub(crate) totals: UsageCounters,
    pub(crate) loading: bool,
    pub(crate) unloading: bool,
}

impl core::fmt::Debug for GCodeInterceptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GCodeInterceptor")
            .field("state", self.machine.state())
            .field("loading", &self.loading)
            .field("unloading", &self.unloading)
            .field("session", &self.session)
            .field("totals", &self.totals)
            .finish_non_exhaustive()
    }
}

impl GCodeInterceptor {
    pub fn builder() -> InterceptorBuilder<Missing, Missing, Missing> {
        InterceptorBuilder::default()
    }

    /// Inspect one firmware line and hand it back untouched.
    pub fn intercept<'a>(&mut self, line: &'a str) -> &'a str {
        let overridden = self.override_asserted();

        match gcode::marker(line) {
            Marker::Load => {
                self.loading = true;
                self.unloading = false;
                if overridden {
                    debug!("manual override asserted; skipping load scan");
                } else {
                    self.rearm("filament load");
                    self.scan_on_load();
                }
            }
            Marker::Unload => {
                self.unloading = true;
                self.loading = false;
                if self.session.take().is_some() {
                    debug!("scan session cleared on unload");
                }
            }
            Marker::None => {
                self.loading = false;
                self.unloading = false;
            }
        }

        if let Some(echo) = gcode::parse_temperature(line) {
            if overridden {
                debug!(target_c = echo.target_c, "manual override asserted; temperature ignored");
            } else {
                self.on_temperature(echo);
            }
        }

        line
    }

    /// Push entry point for host lifecycle notifications (`STARTING`, `PRINTING`, ...).
    pub fn on_state_changed(&mut self, state_id: &str) {
        let host = HostState::classify(state_id);
        let before = self.machine.state().clone();
        if host == HostState::Starting && self.session.take().is_some() {
            debug!("scan session cleared on print start");
        }
        let step = self.machine.on_host_state(&host);
        self.publish_if_changed(&before);

        if let Step::Verify { target_c } = step {
            if self.override_asserted() {
                info!(target_c, "manual override asserted; verification deferred");
                self.machine.set(LifecycleState::AwaitingFinalTemp);
                self.publish_if_changed(&before);
            } else {
                self.run_verification(target_c);
            }
        }
    }

    pub fn state(&self) -> &LifecycleState {
        self.machine.state()
    }

    pub fn waiting_for_final_temp(&self) -> bool {
        self.machine.waiting_for_final_temp()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_unloading(&self) -> bool {
        self.unloading
    }

    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    /// Lifetime totals (loaded from the counter store at build time, if any).
    pub fn totals(&self) -> UsageCounters {
        self.totals
    }

    pub fn pipeline(&self) -> &ScanPipeline {
        &self.pipeline
    }

    fn override_asserted(&self) -> bool {
        self.override_check.as_ref().is_some_and(|check| check())
    }

    fn publish_if_changed(&self, before: &LifecycleState) {
        let now = self.machine.state();
        if now != before {
            self.events.publish(Event::Lifecycle(now.clone()));
        }
    }

    fn publish_scan(&self, scan: &ScanResult, trigger: ScanTrigger) {
        self.events.publish(Event::ScanFrame {
            differential: scan.frame.differential(),
        });
        self.events.publish(Event::ColorClassified {
            rgbc: scan.rgbc,
            color: scan.color,
        });
        self.events.publish(Event::MaterialPredicted {
            material: scan.material.clone(),
            trigger,
        });
    }

    fn scan_on_load(&mut self) {
        match self.pipeline.scan_typed() {
            Ok(scan) => {
                info!(material = %scan.material, color = %scan.color, "filament loaded");
                self.publish_scan(&scan, ScanTrigger::Load);
                self.session.get_or_insert_with(ScanSession::new).predicted = Some(scan.material);
            }
            Err(e) => warn!(error = %e, "scan on filament load failed"),
        }
    }

    /// Mid-print filament change: the next committed target verifies again.
    fn rearm(&mut self, cause: &str) {
        let before = self.machine.state().clone();
        if self.machine.rearm() {
            info!(cause, "re-armed for verification");
            self.publish_if_changed(&before);
        }
    }

    fn on_temperature(&mut self, echo: TemperatureEcho) {
        let before = self.machine.state().clone();
        if matches!(
            before,
            LifecycleState::Starting | LifecycleState::AwaitingFinalTemp
        ) && self.session.is_none()
        {
            self.session = Some(ScanSession::new());
        }
        let step = self.machine.on_temperature(echo.target_c);
        self.publish_if_changed(&before);
        if let Step::Verify { target_c } = step {
            self.run_verification(target_c);
        }
    }

    /// Two scans; the second one is authoritative.
    fn dual_scan(&self) -> Result<ScanResult, VerifyError> {
        let first = self.pipeline.scan_typed()?;
        let second = self.pipeline.scan_typed()?;
        if first.material != second.material {
            info!(
                first = %first.material,
                second = %second.material,
                "scans disagree; keeping the second"
            );
        }
        Ok(second)
    }

    fn run_verification(&mut self, target_c: f32) {
        let before = self.machine.state().clone();
        self.machine.set(LifecycleState::PausedForVerify { target_c });
        self.publish_if_changed(&before);

        if let Err(e) = self.printer.pause_print() {
            error!(
                error = %map_printer_error("pause", &*e),
                target_c,
                "pause failed; verification skipped"
            );
            return;
        }

        let scan = match self.dual_scan() {
            Ok(scan) => scan,
            Err(e) => {
                error!(error = %e, target_c, "verification scan failed; print left paused");
                return;
            }
        };
        self.publish_scan(&scan, ScanTrigger::Verification);

        let now = self.clock.now();
        let session = self.session.get_or_insert_with(ScanSession::new);
        session.predicted = Some(scan.material.clone());
        let counted_before = session.counters;
        let decision = self.policy.decide(&scan.material, target_c, session, now);
        let decided = session.counters;

        let paused = self.machine.state().clone();
        self.apply_decision(decision, now);
        self.publish_if_changed(&paused);

        // a rejection drops the session, so fall back to what was decided
        let session_counters = self.session.as_ref().map_or(decided, |s| s.counters);
        let delta = session_counters.since(&counted_before);
        self.totals.absorb(&delta);

        self.events.publish(Event::Counters {
            session: session_counters,
            totals: self.totals,
        });
        if !delta.is_zero() {
            self.persist_totals();
        }
    }

    fn apply_decision(&mut self, decision: Decision, now: Instant) {
        match decision {
            Decision::Reject(reason) => {
                if let Err(e) = self.printer.cancel_print() {
                    error!(error = %map_printer_error("cancel", &*e), "cancel failed");
                }
                warn!(%reason, "print cancelled");
                self.machine.set(LifecycleState::Cancelled { reason });
                self.session = None;
            }
            Decision::Correct(commands) => {
                self.log_temperatures("before correction");
                if let Err(e) = self.printer.send_commands(&commands, true) {
                    error!(
                        error = %map_printer_error("send commands", &*e),
                        "correction failed; print left paused"
                    );
                    return;
                }
                if let Some(session) = self.session.as_mut() {
                    self.policy.commit_correction(session, now);
                }
                self.log_temperatures("after correction");
                self.resume();
            }
            Decision::Allow => self.resume(),
        }
    }

    fn resume(&mut self) {
        match self.printer.resume_print() {
            Ok(()) => self.machine.set(LifecycleState::Printing),
            Err(e) => error!(error = %map_printer_error("resume", &*e), "resume failed; print left paused"),
        }
    }

    fn log_temperatures(&self, when: &str) {
        match self.printer.current_temperatures() {
            Ok(temps) => {
                for t in temps {
                    info!(tool = %t.tool, actual_c = t.actual, target_c = t.target, "{when}");
                }
            }
            Err(e) => debug!(error = %e, "temperature query failed"),
        }
    }

    fn persist_totals(&self) {
        if let Some(store) = &self.counter_store
            && let Err(e) = store.save(&self.totals)
        {
            warn!(error = %e, "failed to persist counters");
        }
    }
}
