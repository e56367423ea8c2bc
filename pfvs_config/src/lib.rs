#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and reference-spectra parsing for the filament verifier.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section has defaults, so an empty file is a valid config.
//! - The reference-spectra CSV loader enforces the exact header and rejects
//!   non-finite intensities or unknown color codes.
use std::path::PathBuf;

use pfvs_traits::{ColorLabel, SPECTRAL_CHANNELS};
use serde::Deserialize;

/// Highest BCM GPIO number exposed on the 40-pin header.
const MAX_BCM_PIN: u8 = 27;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Pins {
    /// Filament runout switch input.
    pub filament_present: Option<u8>,
    /// Operator button that suspends automatic pause/scan/correct.
    pub manual_override: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Treat a low level on the filament switch as "filament present".
    /// Wiring-dependent; verify on the target machine.
    pub filament_active_low: bool,
    /// Treat a low level on the override button as "asserted".
    pub override_active_low: bool,
    /// How long `stream` and `self-check` wait for filament before giving up (0 = no wait).
    pub filament_wait_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            filament_active_low: true,
            override_active_low: true,
            filament_wait_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PolicyCfg {
    /// Pre-heat target the firmware reports while probing (not the real target).
    pub probe_target_c: f32,
    /// Relative mismatch between requested and profile nozzle temperature that triggers a correction.
    pub tolerance_ratio: f32,
    /// Minimum spacing between two corrections in one session.
    pub cooldown_ms: u64,
}

impl Default for PolicyCfg {
    fn default() -> Self {
        Self {
            probe_target_c: 170.0,
            tolerance_ratio: 0.01,
            cooldown_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StreamCfg {
    /// Interval between live samples.
    pub sample_ms: u64,
    /// Bounded queue depth between the sampling thread and its consumer.
    pub channel_capacity: usize,
}

impl Default for StreamCfg {
    fn default() -> Self {
        Self {
            sample_ms: 250,
            channel_capacity: 16,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClassifierCfg {
    /// Reference spectra CSV (`material,color,c0..c17`); relative paths
    /// resolve against the config file's directory.
    pub references: PathBuf,
}

impl Default for ClassifierCfg {
    fn default() -> Self {
        Self {
            references: PathBuf::from("reference_spectra.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CountersCfg {
    /// JSON file holding lifetime detection/correction/stop totals; relative
    /// paths resolve against the config file's directory.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    /// Filament preset loaded into the simulated sensor head.
    pub material: String,
    /// Simulated filament switch state (ignored when `pins.filament_present` is wired).
    pub filament_present: bool,
    /// Make every spectral read after the first N fail.
    pub read_fault_after: Option<u64>,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            material: "pla".to_string(),
            filament_present: true,
            read_fault_after: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub sensor: SensorCfg,
    pub policy: PolicyCfg,
    pub stream: StreamCfg,
    pub classifier: ClassifierCfg,
    pub counters: CountersCfg,
    pub logging: Logging,
    pub simulation: SimulationCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        for (name, pin) in [
            ("pins.filament_present", self.pins.filament_present),
            ("pins.manual_override", self.pins.manual_override),
        ] {
            if let Some(p) = pin
                && p > MAX_BCM_PIN
            {
                eyre::bail!("{name} must be a BCM pin in 0..={MAX_BCM_PIN}, got {p}");
            }
        }
        if let (Some(a), Some(b)) = (self.pins.filament_present, self.pins.manual_override)
            && a == b
        {
            eyre::bail!("pins.filament_present and pins.manual_override must differ");
        }

        // Sensor
        if self.sensor.filament_wait_ms > 10 * 60 * 1000 {
            eyre::bail!("sensor.filament_wait_ms is unreasonably large (>10min)");
        }

        // Policy
        let probe = self.policy.probe_target_c;
        if !probe.is_finite() || !(0.0..=400.0).contains(&probe) {
            eyre::bail!("policy.probe_target_c must be in [0.0, 400.0]");
        }
        let tol = self.policy.tolerance_ratio;
        if !(tol.is_finite() && tol > 0.0 && tol <= 0.2) {
            eyre::bail!("policy.tolerance_ratio must be in (0.0, 0.2]");
        }
        if self.policy.cooldown_ms < 1000 {
            eyre::bail!("policy.cooldown_ms must be >= 1000");
        }
        if self.policy.cooldown_ms > 60 * 60 * 1000 {
            eyre::bail!("policy.cooldown_ms is unreasonably large (>1h)");
        }

        // Stream
        if self.stream.sample_ms < 10 {
            eyre::bail!("stream.sample_ms must be >= 10");
        }
        if self.stream.sample_ms > 60_000 {
            eyre::bail!("stream.sample_ms is unreasonably large (>60s)");
        }
        if !(1..=1024).contains(&self.stream.channel_capacity) {
            eyre::bail!("stream.channel_capacity must be in 1..=1024");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}

/// One labelled reference spectrum.
///
/// CSV schema (exact header):
/// material,color,c0,c1,...,c17
///
/// Example:
/// material,color,c0,...,c17
/// PLA,R,120.0,...,470.0
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRow {
    pub material: String,
    pub color: ColorLabel,
    pub channels: [f32; SPECTRAL_CHANNELS],
}

fn expected_reference_headers() -> Vec<String> {
    let mut h = vec!["material".to_string(), "color".to_string()];
    h.extend((0..SPECTRAL_CHANNELS).map(|i| format!("c{i}")));
    h
}

fn parse_reference_record(rec: &csv::StringRecord, line: usize) -> eyre::Result<ReferenceRow> {
    let material = rec.get(0).map(str::trim).unwrap_or_default();
    if material.is_empty() {
        eyre::bail!("reference row {line}: material must not be empty");
    }
    let color_field = rec.get(1).map(str::trim).unwrap_or_default();
    let mut chars = color_field.chars();
    let color = match (chars.next(), chars.next()) {
        (Some(c), None) => ColorLabel::from_code(c),
        _ => None,
    }
    .ok_or_else(|| eyre::eyre!("reference row {line}: unknown color code {color_field:?}"))?;

    let mut channels = [0.0f32; SPECTRAL_CHANNELS];
    for (i, slot) in channels.iter_mut().enumerate() {
        let raw = rec.get(i + 2).map(str::trim).unwrap_or_default();
        let v: f32 = raw
            .parse()
            .map_err(|e| eyre::eyre!("reference row {line}: c{i} {raw:?}: {e}"))?;
        if !v.is_finite() {
            eyre::bail!("reference row {line}: c{i} must be finite");
        }
        *slot = v;
    }
    Ok(ReferenceRow {
        material: material.to_string(),
        color,
        channels,
    })
}

/// Parse reference spectra from any reader (file, embedded string, ...).
pub fn read_references<R: std::io::Read>(reader: R) -> eyre::Result<Vec<ReferenceRow>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read reference CSV headers: {e}"))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.trim().to_string()).collect();
    if actual != expected_reference_headers() {
        eyre::bail!(
            "reference CSV must have headers 'material,color,c0..c{}', got: {}",
            SPECTRAL_CHANNELS - 1,
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let rec = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        rows.push(parse_reference_record(&rec, idx + 2)?);
    }
    if rows.is_empty() {
        eyre::bail!("reference CSV contains no spectra");
    }
    Ok(rows)
}

pub fn load_references_csv(path: &std::path::Path) -> eyre::Result<Vec<ReferenceRow>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open reference CSV {:?}: {}", path, e))?;
    read_references(file).map_err(|e| e.wrap_err(format!("reference CSV {path:?}")))
}
