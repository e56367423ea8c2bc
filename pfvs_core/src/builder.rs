//! Type-state builder for `GCodeInterceptor`.
//!
//! The builder enforces at compile time that the sensor gateway, the
//! classifier and the printer control are provided before `build()` is
//! available. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use pfvs_traits::clock::{Clock, MonotonicClock};
use pfvs_traits::{MaterialClassifier, PrinterControl, SensorGateway};

use crate::config::PolicyCfg;
use crate::counters::{CounterStore, UsageCounters};
use crate::error::{BuildError, Result};
use crate::events::{EventSink, NullSink};
use crate::interceptor::GCodeInterceptor;
use crate::policy::MaterialPolicy;
use crate::scan::{ScanPipeline, SharedGateway, share_gateway};
use crate::state::PrintStateMachine;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `GCodeInterceptor`. Policy values are validated on `build()`.
pub struct InterceptorBuilder<G, C, P> {
    gateway: Option<SharedGateway>,
    classifier: Option<Arc<dyn MaterialClassifier + Send + Sync>>,
    printer: Option<Box<dyn PrinterControl + Send>>,
    policy: Option<PolicyCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    events: Option<Arc<dyn EventSink>>,
    override_check: Option<Box<dyn Fn() -> bool + Send + Sync>>,
    counter_store: Option<CounterStore>,
    _g: PhantomData<G>,
    _c: PhantomData<C>,
    _p: PhantomData<P>,
}

impl Default for InterceptorBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            gateway: None,
            classifier: None,
            printer: None,
            policy: None,
            clock: None,
            events: None,
            override_check: None,
            counter_store: None,
            _g: PhantomData,
            _c: PhantomData,
            _p: PhantomData,
        }
    }
}

fn validate_policy(cfg: &PolicyCfg) -> std::result::Result<(), BuildError> {
    if !cfg.probe_target_c.is_finite() || !(0.0..=400.0).contains(&cfg.probe_target_c) {
        return Err(BuildError::InvalidConfig("probe_target_c must be in [0, 400]"));
    }
    let tol = cfg.tolerance_ratio;
    if !(tol.is_finite() && tol > 0.0 && tol <= 0.2) {
        return Err(BuildError::InvalidConfig("tolerance_ratio must be in (0, 0.2]"));
    }
    if cfg.cooldown.is_zero() {
        return Err(BuildError::InvalidConfig("cooldown must be > 0"));
    }
    Ok(())
}

impl<G, C, P> InterceptorBuilder<G, C, P> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<GCodeInterceptor> {
        let gateway = self
            .gateway
            .ok_or_else(|| eyre::Report::new(BuildError::MissingGateway))?;
        let classifier = self
            .classifier
            .ok_or_else(|| eyre::Report::new(BuildError::MissingClassifier))?;
        let printer = self
            .printer
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPrinter))?;

        let policy_cfg = self.policy.unwrap_or_default();
        validate_policy(&policy_cfg).map_err(eyre::Report::new)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };

        let totals = match &self.counter_store {
            Some(store) => store.load().unwrap_or_else(|e| {
                tracing::warn!(error = %e, path = ?store.path(), "counters unreadable; starting from zero");
                UsageCounters::default()
            }),
            None => UsageCounters::default(),
        };

        Ok(GCodeInterceptor {
            pipeline: ScanPipeline::new(gateway, classifier, clock.clone()),
            printer,
            machine: PrintStateMachine::new(policy_cfg.probe_target_c),
            policy: MaterialPolicy::new(policy_cfg),
            clock,
            events: self.events.unwrap_or_else(|| Arc::new(NullSink)),
            override_check: self.override_check,
            counter_store: self.counter_store,
            session: None,
            totals,
            loading: false,
            unloading: false,
        })
    }

    fn retag<G2, C2, P2>(self) -> InterceptorBuilder<G2, C2, P2> {
        InterceptorBuilder {
            gateway: self.gateway,
            classifier: self.classifier,
            printer: self.printer,
            policy: self.policy,
            clock: self.clock,
            events: self.events,
            override_check: self.override_check,
            counter_store: self.counter_store,
            _g: PhantomData,
            _c: PhantomData,
            _p: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<G, C, P> InterceptorBuilder<G, C, P> {
    pub fn with_policy(mut self, policy: PolicyCfg) -> Self {
        self.policy = Some(policy);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }
    /// Operator override: while `f()` is true no scan, pause or correction happens.
    pub fn with_override_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.override_check = Some(Box::new(f));
        self
    }
    /// Persist lifetime totals here after every counted decision.
    pub fn with_counter_store(mut self, store: CounterStore) -> Self {
        self.counter_store = Some(store);
        self
    }
}

// Setters that advance type-state
impl<C, P> InterceptorBuilder<Missing, C, P> {
    pub fn with_gateway(
        self,
        gateway: impl SensorGateway + Send + 'static,
    ) -> InterceptorBuilder<Set, C, P> {
        self.with_shared_gateway(share_gateway(gateway))
    }

    /// Use a gateway that is also handed to a `StreamController`.
    pub fn with_shared_gateway(mut self, gateway: SharedGateway) -> InterceptorBuilder<Set, C, P> {
        self.gateway = Some(gateway);
        self.retag()
    }
}

impl<G, P> InterceptorBuilder<G, Missing, P> {
    pub fn with_classifier(
        self,
        classifier: impl MaterialClassifier + Send + Sync + 'static,
    ) -> InterceptorBuilder<G, Set, P> {
        self.with_shared_classifier(Arc::new(classifier))
    }

    pub fn with_shared_classifier(
        mut self,
        classifier: Arc<dyn MaterialClassifier + Send + Sync>,
    ) -> InterceptorBuilder<G, Set, P> {
        self.classifier = Some(classifier);
        self.retag()
    }
}

impl<G, C> InterceptorBuilder<G, C, Missing> {
    pub fn with_printer(
        mut self,
        printer: impl PrinterControl + Send + 'static,
    ) -> InterceptorBuilder<G, C, Set> {
        self.printer = Some(Box::new(printer));
        self.retag()
    }
}

impl InterceptorBuilder<Set, Set, Set> {
    /// Validate and build. Only available when gateway, classifier and printer are set.
    pub fn build(self) -> Result<GCodeInterceptor> {
        self.try_build()
    }
}
