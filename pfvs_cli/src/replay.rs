//! `pfvs replay`: drive the interceptor from a recorded G-code stream.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use eyre::{Result, WrapErr};
use pfvs_core::{GCodeInterceptor, LifecycleState, PolicyCfg, TracingSink, UsageCounters};
use pfvs_traits::{PrinterControl, ToolTemperature};
use serde_json::json;

use crate::setup::{self, Loaded};

/// Nozzle temperature the replayed printer reports before any M104/M109.
const IDLE_NOZZLE_C: f32 = 25.0;

#[derive(Debug, thiserror::Error)]
#[error("print cancelled: {0}")]
pub struct PrintRejected(pub String);

/// What the simulated print host was asked to do.
#[derive(Debug, Default)]
struct HostLog {
    pauses: u32,
    resumes: u32,
    cancels: u32,
    commands: Vec<String>,
    nozzle_target_c: Option<f32>,
}

/// Print host stand-in: logs every action and keeps a tally for the summary.
#[derive(Clone, Default)]
struct ReplayHost {
    log: Arc<Mutex<HostLog>>,
}

impl ReplayHost {
    fn with_log<R>(&self, f: impl FnOnce(&mut HostLog) -> R) -> R {
        f(&mut self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Target of an `M104 S..` / `M109 S..` line.
fn nozzle_target(line: &str) -> Option<f32> {
    let mut words = line.split_whitespace();
    let cmd = words.next()?;
    if !matches!(cmd, "M104" | "M109") {
        return None;
    }
    words.find_map(|w| w.strip_prefix('S')?.parse().ok())
}

impl PrinterControl for ReplayHost {
    fn pause_print(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("host: pause");
        self.with_log(|l| l.pauses += 1);
        Ok(())
    }

    fn resume_print(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("host: resume");
        self.with_log(|l| l.resumes += 1);
        Ok(())
    }

    fn cancel_print(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("host: cancel");
        self.with_log(|l| l.cancels += 1);
        Ok(())
    }

    fn send_commands(
        &mut self,
        lines: &[String],
        blocking: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(?lines, blocking, "host: send");
        self.with_log(|l| {
            for line in lines {
                if let Some(t) = nozzle_target(line) {
                    l.nozzle_target_c = Some(t);
                }
                l.commands.push(line.clone());
            }
        });
        Ok(())
    }

    fn current_temperatures(
        &self,
    ) -> Result<Vec<ToolTemperature>, Box<dyn std::error::Error + Send + Sync>> {
        let target = self.with_log(|l| l.nozzle_target_c).unwrap_or(0.0);
        Ok(vec![ToolTemperature {
            tool: "tool0".into(),
            actual: IDLE_NOZZLE_C,
            target,
        }])
    }
}

enum Directive<'a> {
    State(&'a str),
    Override(bool),
}

fn directive(line: &str, lineno: usize) -> Result<Option<Directive<'_>>> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("@state") {
        let id = rest.trim();
        if id.is_empty() {
            eyre::bail!("line {lineno}: @state needs a state id");
        }
        return Ok(Some(Directive::State(id)));
    }
    if let Some(rest) = trimmed.strip_prefix("@override") {
        return match rest.trim() {
            "on" => Ok(Some(Directive::Override(true))),
            "off" => Ok(Some(Directive::Override(false))),
            other => eyre::bail!("line {lineno}: @override expects on|off, got {other:?}"),
        };
    }
    Ok(None)
}

struct Summary {
    lines: u64,
    state: LifecycleState,
    loading: bool,
    session: Option<UsageCounters>,
    totals: UsageCounters,
}

fn print_summary(summary: &Summary, host: &HostLog, json_mode: bool) {
    let reason = match &summary.state {
        LifecycleState::Cancelled { reason } => Some(reason.as_str()),
        _ => None,
    };
    if json_mode {
        let obj = json!({
            "lines": summary.lines,
            "state": summary.state.name(),
            "cancel_reason": reason,
            "loading": summary.loading,
            "pauses": host.pauses,
            "resumes": host.resumes,
            "cancels": host.cancels,
            "commands": host.commands,
            "session": summary.session,
            "totals": summary.totals,
        });
        println!("{obj}");
        return;
    }
    println!("replayed {} lines", summary.lines);
    match reason {
        Some(r) => println!("state: {} ({r})", summary.state.name()),
        None => println!("state: {}", summary.state.name()),
    }
    println!(
        "host: pauses={} resumes={} cancels={} commands={}",
        host.pauses,
        host.resumes,
        host.cancels,
        host.commands.len()
    );
    for cmd in &host.commands {
        println!("  > {cmd}");
    }
    let t = summary.totals;
    println!(
        "totals: pla={} asa={} petg={} settings_changed={} prints_stopped={}",
        t.pla, t.asa, t.petg, t.settings_changed, t.prints_stopped
    );
}

pub fn run_replay(
    loaded: &Loaded,
    gcode: &Path,
    material: Option<&str>,
    json_mode: bool,
    shutdown: &AtomicBool,
) -> Result<()> {
    let host = ReplayHost::default();
    let override_flag = Arc::new(AtomicBool::new(false));
    let gpio_override = setup::override_input(loaded);

    let flag = Arc::clone(&override_flag);
    let mut builder = GCodeInterceptor::builder()
        .with_gateway(setup::sensor_head(loaded, material)?)
        .with_shared_classifier(setup::classifier(loaded)?)
        .with_printer(host.clone())
        .with_policy(PolicyCfg::from(&loaded.cfg.policy))
        .with_events(Arc::new(TracingSink))
        .with_override_check(move || {
            flag.load(Ordering::Relaxed) || gpio_override.as_ref().is_some_and(|f| f())
        });
    if let Some(store) = setup::counter_store(loaded) {
        builder = builder.with_counter_store(store);
    }
    let mut interceptor = builder.build()?;

    let file = File::open(gcode).wrap_err_with(|| format!("open G-code {}", gcode.display()))?;
    let mut lines = 0u64;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!(line = idx + 1, "replay interrupted");
            break;
        }
        let lineno = idx + 1;
        let line = line.wrap_err_with(|| format!("read {} line {lineno}", gcode.display()))?;
        match directive(&line, lineno)? {
            Some(Directive::State(id)) => interceptor.on_state_changed(id),
            Some(Directive::Override(on)) => {
                tracing::info!(asserted = on, "manual override");
                override_flag.store(on, Ordering::Relaxed);
            }
            None => {
                let forwarded = interceptor.intercept(&line);
                tracing::trace!(line = forwarded, "forwarded");
                lines += 1;
            }
        }
    }

    let summary = Summary {
        lines,
        state: interceptor.state().clone(),
        loading: interceptor.is_loading(),
        session: interceptor.session().map(|s| s.counters),
        totals: interceptor.totals(),
    };
    host.with_log(|log| print_summary(&summary, log, json_mode));

    if let LifecycleState::Cancelled { reason } = summary.state {
        return Err(eyre::Report::new(PrintRejected(reason)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nozzle_target_reads_s_word() {
        assert_eq!(nozzle_target("M104 S210"), Some(210.0));
        assert_eq!(nozzle_target("M109 T0 S245.5"), Some(245.5));
        assert_eq!(nozzle_target("M140 S60"), None);
        assert_eq!(nozzle_target("M104"), None);
    }

    #[test]
    fn directives_are_recognised() {
        assert!(matches!(
            directive("@state PRINTING", 1).unwrap(),
            Some(Directive::State("PRINTING"))
        ));
        assert!(matches!(
            directive("  @override on", 1).unwrap(),
            Some(Directive::Override(true))
        ));
        assert!(directive("M701", 1).unwrap().is_none());
        assert!(directive("@override maybe", 3).is_err());
        assert!(directive("@state", 4).is_err());
    }
}
