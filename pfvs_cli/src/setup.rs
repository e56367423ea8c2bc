//! Config loading and component assembly shared by every subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, WrapErr};
use pfvs_config::Config;
use pfvs_core::{CounterStore, NearestCentroid, VerifyError};
use pfvs_hardware::{SimMaterial, SimulatedGateway};
use pfvs_traits::SensorGateway;

/// Poll interval while waiting for the filament switch.
const FILAMENT_POLL: Duration = Duration::from_millis(20);

/// A validated config plus the directory relative paths resolve against.
pub struct Loaded {
    pub cfg: Config,
    pub base_dir: PathBuf,
}

impl Loaded {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

pub fn load_config(path: &Path) -> Result<Loaded> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = pfvs_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("invalid configuration in {}: {e}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(Loaded { cfg, base_dir })
}

/// The simulated head, with the filament switch taken from GPIO when wired.
pub fn sensor_head(loaded: &Loaded, material: Option<&str>) -> Result<SimulatedGateway> {
    let cfg = &loaded.cfg;
    let name = material.unwrap_or(&cfg.simulation.material);
    let preset = SimMaterial::from_name(name)
        .ok_or_else(|| eyre::eyre!("unknown simulated material {name:?} (expected pla|petg|asa|tpu)"))?;
    let mut gw = SimulatedGateway::new(preset).with_filament(cfg.simulation.filament_present);
    if let Some(n) = cfg.simulation.read_fault_after {
        gw = gw.with_read_fault_after(n);
    }

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    if let Some(pin) = cfg.pins.filament_present {
        let input = pfvs_hardware::gpio::make_input_checker(pin, cfg.sensor.filament_active_low)
            .wrap_err("open filament switch")?;
        tracing::info!(pin, active_low = cfg.sensor.filament_active_low, "filament switch enabled");
        gw = gw.with_presence_input(input);
    }

    tracing::debug!(material = ?preset, "simulated sensor head ready");
    Ok(gw)
}

/// The manual-override button, if one is wired.
pub fn override_input(loaded: &Loaded) -> Option<Box<dyn Fn() -> bool + Send + Sync>> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let cfg = &loaded.cfg;
        let pin = cfg.pins.manual_override?;
        match pfvs_hardware::gpio::make_input_checker(pin, cfg.sensor.override_active_low) {
            Ok(c) => {
                tracing::info!(
                    pin,
                    active_low = cfg.sensor.override_active_low,
                    "manual override enabled"
                );
                Some(c)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to init manual override; continuing without it");
                None
            }
        }
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = loaded;
        None
    }
}

pub fn classifier(loaded: &Loaded) -> Result<Arc<NearestCentroid>> {
    let path = loaded.resolve(&loaded.cfg.classifier.references);
    let rows = pfvs_config::load_references_csv(&path)?;
    let model = NearestCentroid::from(rows);
    tracing::debug!(references = model.len(), path = %path.display(), "classifier loaded");
    Ok(Arc::new(model))
}

pub fn counter_store(loaded: &Loaded) -> Option<CounterStore> {
    loaded
        .cfg
        .counters
        .file
        .as_deref()
        .map(|p| CounterStore::new(loaded.resolve(p)))
}

/// Check the filament switch, polling up to `sensor.filament_wait_ms`.
pub fn require_filament(gw: &mut dyn SensorGateway, loaded: &Loaded) -> Result<()> {
    let mut present = || match gw.filament_present() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "filament switch read failed");
            false
        }
    };
    let wait_ms = loaded.cfg.sensor.filament_wait_ms;
    let ok = if wait_ms == 0 {
        present()
    } else {
        pfvs_hardware::util::wait_until_with_timeout(
            &mut present,
            Duration::from_millis(wait_ms),
            FILAMENT_POLL,
        )
        .is_ok()
    };
    if ok {
        Ok(())
    } else {
        Err(eyre::Report::new(VerifyError::NoFilamentDetected))
    }
}
