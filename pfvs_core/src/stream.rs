//! Continuous background sampling of the sensor head.
//!
//! Spawns one thread that shares the gateway with verification scans,
//! pushes samples through a bounded channel and closes the LED shutters on
//! every exit path.
//!
//! Each `StreamController` owns at most one worker thread, joined on
//! `stop()` and on drop.
use crossbeam_channel as xch;
use pfvs_traits::clock::Clock;
use pfvs_traits::{ColorLabel, Rgbc, SPECTRAL_CHANNELS, SensorGateway};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::color::classify_color;
use crate::config::StreamCfg;
use crate::error::{Result, VerifyError};
use crate::events::{Event, EventSink};
use crate::hw_error::map_sensor_error;
use crate::scan::{SharedGateway, lock_gateway, read_checked, set_shutters};

#[derive(Debug, Clone, PartialEq)]
pub struct StreamSample {
    /// Monotonic sample counter, starting at 1 for each run.
    pub seq: u64,
    /// Raw lit channels (no dark subtraction).
    pub channels: [f32; SPECTRAL_CHANNELS],
    pub rgbc: Rgbc,
    pub color: ColorLabel,
}

struct Worker {
    rx: xch::Receiver<StreamSample>,
    shutdown: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<VerifyError>>>,
    samples: Arc<AtomicU64>,
    join_handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn is_finished(&self) -> bool {
        self.join_handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

pub struct StreamController {
    gateway: SharedGateway,
    cfg: StreamCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    events: Option<Arc<dyn EventSink>>,
    worker: Option<Worker>,
    last_error: Option<VerifyError>,
}

fn sample_once(
    gw: &mut (dyn SensorGateway + Send),
    seq: u64,
) -> std::result::Result<StreamSample, VerifyError> {
    set_shutters(gw, true)?;
    let channels = read_checked(gw, "stream read")?;
    let rgbc = gw
        .read_color_raw()
        .map_err(|e| map_sensor_error("stream color read", &*e))?;
    Ok(StreamSample {
        seq,
        channels,
        rgbc,
        color: classify_color(rgbc),
    })
}

/// Best-effort shutter close used on every worker exit path.
fn close_shutters(gateway: &SharedGateway) -> std::result::Result<(), VerifyError> {
    let mut guard = lock_gateway(gateway)?;
    set_shutters(&mut **guard, false)
}

impl StreamController {
    pub fn new(gateway: SharedGateway, cfg: StreamCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            gateway,
            cfg,
            clock,
            events: None,
            worker: None,
            last_error: None,
        }
    }

    /// Also publish every sample as `Event::StreamSample`.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Start sampling.
    ///
    /// Errors with `AlreadyRunning` while a worker is live and with
    /// `NoFilamentDetected` (no thread spawned) when the switch reports no
    /// filament.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.as_ref().is_some_and(|w| !w.is_finished()) {
            return Err(eyre::Report::new(VerifyError::AlreadyRunning));
        }
        // A worker that died on a read error is reaped before restarting.
        self.reap();

        let present = {
            let mut guard = lock_gateway(&self.gateway)?;
            guard
                .filament_present()
                .map_err(|e| map_sensor_error("filament switch", &*e))?
        };
        if !present {
            tracing::warn!("stream start refused: no filament detected");
            return Err(eyre::Report::new(VerifyError::NoFilamentDetected));
        }

        let (tx, rx) = xch::bounded(self.cfg.channel_capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let failure = Arc::new(Mutex::new(None));
        let samples = Arc::new(AtomicU64::new(0));

        let shutdown_clone = shutdown.clone();
        let failure_clone = failure.clone();
        let samples_clone = samples.clone();
        let gateway = self.gateway.clone();
        let clock = self.clock.clone();
        let events = self.events.clone();
        let period = self.cfg.sample_period;

        let join_handle = std::thread::Builder::new()
            .name("pfvs-stream".into())
            .spawn(move || {
                stream_loop(
                    &gateway,
                    &*clock,
                    period,
                    &tx,
                    events.as_deref(),
                    &shutdown_clone,
                    &samples_clone,
                    &failure_clone,
                );
            })
            .map_err(|e| VerifyError::Io(format!("spawn stream thread: {e}")))?;

        tracing::info!(period_ms = period.as_millis() as u64, "sensor stream started");
        self.last_error = None;
        self.worker = Some(Worker {
            rx,
            shutdown,
            failure,
            samples,
            join_handle: Some(join_handle),
        });
        Ok(())
    }

    /// Signal the worker, join it, then close all shutters.
    ///
    /// Safe to call when nothing is running; the shutters are closed regardless.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(w) = &self.worker {
            w.shutdown.store(true, Ordering::Relaxed);
        }
        self.reap();
        close_shutters(&self.gateway)?;
        tracing::info!("sensor stream stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Most recent queued sample, draining older ones.
    pub fn latest(&self) -> Option<StreamSample> {
        self.worker.as_ref()?.rx.try_iter().last()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<StreamSample> {
        self.worker.as_ref()?.rx.recv_timeout(timeout).ok()
    }

    /// Samples produced by the current run.
    pub fn samples_taken(&self) -> u64 {
        self.worker
            .as_ref()
            .map_or(0, |w| w.samples.load(Ordering::Relaxed))
    }

    /// Error that ended the last run, if it did not stop cleanly.
    pub fn last_error(&self) -> Option<VerifyError> {
        if let Some(w) = &self.worker
            && let Ok(slot) = w.failure.lock()
            && let Some(e) = slot.as_ref()
        {
            return Some(e.clone());
        }
        self.last_error.clone()
    }

    fn reap(&mut self) {
        let Some(mut w) = self.worker.take() else {
            return;
        };
        if let Some(handle) = w.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("stream thread joined"),
                Err(e) => tracing::warn!(?e, "stream thread panicked"),
            }
        }
        if let Ok(mut slot) = w.failure.lock()
            && let Some(e) = slot.take()
        {
            self.last_error = Some(e);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn stream_loop(
    gateway: &SharedGateway,
    clock: &dyn Clock,
    period: Duration,
    tx: &xch::Sender<StreamSample>,
    events: Option<&dyn EventSink>,
    shutdown: &AtomicBool,
    samples: &AtomicU64,
    failure: &Mutex<Option<VerifyError>>,
) {
    let mut seq = 0u64;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::debug!("stream thread received shutdown signal");
            break;
        }

        seq += 1;
        let result = match lock_gateway(gateway) {
            Ok(mut guard) => sample_once(&mut **guard, seq),
            Err(e) => Err(e),
        };
        match result {
            Ok(sample) => {
                samples.store(seq, Ordering::Relaxed);
                if let Some(sink) = events {
                    sink.publish(Event::StreamSample(sample.clone()));
                }
                match tx.try_send(sample) {
                    Ok(()) | Err(xch::TrySendError::Full(_)) => {}
                    Err(xch::TrySendError::Disconnected(_)) => {
                        tracing::debug!("stream consumer disconnected, exiting thread");
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "stream read failed; stopping stream");
                if let Err(close) = close_shutters(gateway) {
                    tracing::warn!(error = %close, "failed to close shutters after stream error");
                }
                if let Ok(mut slot) = failure.lock() {
                    *slot = Some(e);
                }
                break;
            }
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        clock.sleep(period);
    }
    tracing::trace!("stream thread exiting");
}

impl Drop for StreamController {
    fn drop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "stream shutdown on drop failed");
        }
    }
}
