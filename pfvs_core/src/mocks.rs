//! Test and helper fakes for pfvs_core.
//!
//! Every fake is `Clone` over shared state, so a test can hand one copy to
//! the builder and keep the other to script behavior and inspect calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use pfvs_traits::clock::Clock;
use pfvs_traits::{
    ColorLabel, LED_BANKS, MaterialClassifier, MaterialLabel, PrinterControl, Rgbc,
    SPECTRAL_CHANNELS, SensorGateway, ToolTemperature,
};

pub use crate::events::ChannelSink;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Sensor gateway ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOp {
    Gain(u8),
    Integration(u8),
    Shutter { bank: u8, open: bool },
    ReadRaw { lit: bool },
    ReadColor,
    Presence,
}

#[derive(Debug)]
struct GatewayState {
    dark: Vec<f32>,
    lit: VecDeque<Vec<f32>>,
    last_lit: Vec<f32>,
    rgbc: Rgbc,
    present: bool,
    fail_reads_after: Option<usize>,
    raw_reads: usize,
    shutters: [bool; LED_BANKS as usize],
    ops: Vec<GatewayOp>,
}

/// Gateway returning a fixed dark frame while all shutters are closed and
/// a scripted sequence of lit frames otherwise (the last one repeats).
#[derive(Debug, Clone)]
pub struct ScriptedGateway {
    inner: Arc<Mutex<GatewayState>>,
}

impl ScriptedGateway {
    pub fn new(dark: Vec<f32>, lit: Vec<f32>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GatewayState {
                dark,
                lit: VecDeque::new(),
                last_lit: lit,
                rgbc: Rgbc::new(900, 200, 180, 1300),
                present: true,
                fail_reads_after: None,
                raw_reads: 0,
                shutters: [false; LED_BANKS as usize],
                ops: Vec::new(),
            })),
        }
    }

    /// Every channel at `dark` when closed and `lit` when open.
    pub fn uniform(dark: f32, lit: f32) -> Self {
        Self::new(vec![dark; SPECTRAL_CHANNELS], vec![lit; SPECTRAL_CHANNELS])
    }

    /// Lit frames consumed one per lit read before falling back to the default.
    pub fn with_lit_sequence(self, frames: Vec<Vec<f32>>) -> Self {
        lock(&self.inner).lit = frames.into();
        self
    }

    pub fn with_color(self, rgbc: Rgbc) -> Self {
        lock(&self.inner).rgbc = rgbc;
        self
    }

    pub fn with_filament(self, present: bool) -> Self {
        lock(&self.inner).present = present;
        self
    }

    /// Fail every raw read after the first `n`.
    pub fn with_read_fault_after(self, n: usize) -> Self {
        lock(&self.inner).fail_reads_after = Some(n);
        self
    }

    pub fn set_filament(&self, present: bool) {
        lock(&self.inner).present = present;
    }

    pub fn ops(&self) -> Vec<GatewayOp> {
        lock(&self.inner).ops.clone()
    }

    pub fn shutters(&self) -> [bool; LED_BANKS as usize] {
        lock(&self.inner).shutters
    }

    pub fn raw_reads(&self) -> usize {
        lock(&self.inner).raw_reads
    }
}

impl SensorGateway for ScriptedGateway {
    fn set_gain(&mut self, gain: u8) -> Result<(), BoxError> {
        lock(&self.inner).ops.push(GatewayOp::Gain(gain));
        Ok(())
    }

    fn set_integration_time(&mut self, cycles: u8) -> Result<(), BoxError> {
        lock(&self.inner).ops.push(GatewayOp::Integration(cycles));
        Ok(())
    }

    fn shutter_led(&mut self, bank: u8, open: bool) -> Result<(), BoxError> {
        let mut s = lock(&self.inner);
        let slot = s
            .shutters
            .get_mut(usize::from(bank))
            .ok_or_else(|| std::io::Error::other(format!("bank {bank}")))?;
        *slot = open;
        s.ops.push(GatewayOp::Shutter { bank, open });
        Ok(())
    }

    fn read_raw(&mut self) -> Result<Vec<f32>, BoxError> {
        let mut s = lock(&self.inner);
        let lit = s.shutters.iter().any(|&o| o);
        s.ops.push(GatewayOp::ReadRaw { lit });
        if let Some(limit) = s.fail_reads_after
            && s.raw_reads >= limit
        {
            return Err(Box::new(std::io::Error::other("scripted read fault")));
        }
        s.raw_reads += 1;
        if !lit {
            return Ok(s.dark.clone());
        }
        match s.lit.pop_front() {
            Some(frame) => Ok(frame),
            None => Ok(s.last_lit.clone()),
        }
    }

    fn read_color_raw(&mut self) -> Result<Rgbc, BoxError> {
        let mut s = lock(&self.inner);
        s.ops.push(GatewayOp::ReadColor);
        Ok(s.rgbc)
    }

    fn filament_present(&mut self) -> Result<bool, BoxError> {
        let mut s = lock(&self.inner);
        s.ops.push(GatewayOp::Presence);
        Ok(s.present)
    }
}

// ── Classifier ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ClassifierState {
    script: VecDeque<Result<String, String>>,
    last: Option<Result<String, String>>,
    calls: Vec<(Vec<f32>, ColorLabel)>,
}

/// Returns scripted labels in order; the last answer repeats.
#[derive(Debug, Clone, Default)]
pub struct FixedClassifier {
    inner: Arc<Mutex<ClassifierState>>,
}

impl FixedClassifier {
    pub fn new(label: &str) -> Self {
        Self::sequence([label])
    }

    pub fn sequence<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let c = Self::default();
        lock(&c.inner).script = labels.into_iter().map(|l| Ok(l.to_string())).collect();
        c
    }

    pub fn failing(message: &str) -> Self {
        let c = Self::default();
        lock(&c.inner).script.push_back(Err(message.to_string()));
        c
    }

    /// Features and color passed to every `predict` call so far.
    pub fn calls(&self) -> Vec<(Vec<f32>, ColorLabel)> {
        lock(&self.inner).calls.clone()
    }
}

impl MaterialClassifier for FixedClassifier {
    fn predict(&self, channels: &[f32], color: ColorLabel) -> Result<MaterialLabel, BoxError> {
        let mut s = lock(&self.inner);
        s.calls.push((channels.to_vec(), color));
        if let Some(next) = s.script.pop_front() {
            s.last = Some(next);
        }
        match &s.last {
            Some(Ok(label)) => Ok(MaterialLabel::new(label.clone())),
            Some(Err(msg)) => Err(Box::new(std::io::Error::other(msg.clone()))),
            None => Err(Box::new(std::io::Error::other("no scripted label"))),
        }
    }
}

// ── Printer ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PrinterOp {
    Pause,
    Resume,
    Cancel,
    Send { lines: Vec<String>, blocking: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterAction {
    Pause,
    Resume,
    Cancel,
    Send,
}

#[derive(Debug)]
struct PrinterState {
    ops: Vec<PrinterOp>,
    failing: Vec<PrinterAction>,
    tool: ToolTemperature,
}

/// Records every call; selected actions can be made to fail.
#[derive(Debug, Clone)]
pub struct RecordingPrinter {
    inner: Arc<Mutex<PrinterState>>,
}

impl Default for RecordingPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPrinter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PrinterState {
                ops: Vec::new(),
                failing: Vec::new(),
                tool: ToolTemperature {
                    tool: "tool0".into(),
                    actual: 25.0,
                    target: 0.0,
                },
            })),
        }
    }

    pub fn failing_on(self, action: PrinterAction) -> Self {
        lock(&self.inner).failing.push(action);
        self
    }

    pub fn ops(&self) -> Vec<PrinterOp> {
        lock(&self.inner).ops.clone()
    }

    /// All command lines sent so far, in order.
    pub fn sent_lines(&self) -> Vec<String> {
        lock(&self.inner)
            .ops
            .iter()
            .filter_map(|op| match op {
                PrinterOp::Send { lines, .. } => Some(lines.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn count(&self, op: &PrinterOp) -> usize {
        lock(&self.inner).ops.iter().filter(|o| *o == op).count()
    }

    fn record(&self, action: PrinterAction, op: PrinterOp) -> Result<(), BoxError> {
        let mut s = lock(&self.inner);
        if s.failing.contains(&action) {
            return Err(Box::new(std::io::Error::other(format!("{action:?} refused"))));
        }
        if let PrinterOp::Send { lines, .. } = &op {
            for line in lines {
                if let Some(v) = line.strip_prefix("M104 S").or_else(|| line.strip_prefix("M109 S"))
                    && let Ok(t) = v.trim().parse::<f32>()
                {
                    s.tool.target = t;
                }
            }
        }
        s.ops.push(op);
        Ok(())
    }
}

impl PrinterControl for RecordingPrinter {
    fn pause_print(&mut self) -> Result<(), BoxError> {
        self.record(PrinterAction::Pause, PrinterOp::Pause)
    }

    fn resume_print(&mut self) -> Result<(), BoxError> {
        self.record(PrinterAction::Resume, PrinterOp::Resume)
    }

    fn cancel_print(&mut self) -> Result<(), BoxError> {
        self.record(PrinterAction::Cancel, PrinterOp::Cancel)
    }

    fn send_commands(&mut self, lines: &[String], blocking: bool) -> Result<(), BoxError> {
        self.record(
            PrinterAction::Send,
            PrinterOp::Send {
                lines: lines.to_vec(),
                blocking,
            },
        )
    }

    fn current_temperatures(&self) -> Result<Vec<ToolTemperature>, BoxError> {
        Ok(vec![lock(&self.inner).tool.clone()])
    }
}

// ── Clock ────────────────────────────────────────────────────────────────────

/// Clock that only moves when slept on or advanced.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, d: Duration) {
        let mut off = lock(&self.offset);
        *off = off.saturating_add(d);
    }

    /// Total simulated time slept or advanced.
    pub fn elapsed(&self) -> Duration {
        *lock(&self.offset)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *lock(&self.offset)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
        std::thread::yield_now();
    }
}
