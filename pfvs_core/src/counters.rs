//! Detection / correction / stop counters and their JSON persistence.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};
use crate::material::Material;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageCounters {
    pub pla: u32,
    pub asa: u32,
    pub petg: u32,
    pub settings_changed: u32,
    pub prints_stopped: u32,
}

impl UsageCounters {
    /// Bump the per-material detection count; unknown materials are not counted.
    pub fn record_detection(&mut self, material: &Material) {
        match material {
            Material::Pla => self.pla = self.pla.saturating_add(1),
            Material::Petg => self.petg = self.petg.saturating_add(1),
            Material::Asa => self.asa = self.asa.saturating_add(1),
            Material::Unknown(_) => {}
        }
    }

    pub fn record_correction(&mut self) {
        self.settings_changed = self.settings_changed.saturating_add(1);
    }

    pub fn record_stop(&mut self) {
        self.prints_stopped = self.prints_stopped.saturating_add(1);
    }

    /// Field-wise increase since `earlier`.
    pub fn since(&self, earlier: &UsageCounters) -> UsageCounters {
        UsageCounters {
            pla: self.pla.saturating_sub(earlier.pla),
            asa: self.asa.saturating_sub(earlier.asa),
            petg: self.petg.saturating_sub(earlier.petg),
            settings_changed: self.settings_changed.saturating_sub(earlier.settings_changed),
            prints_stopped: self.prints_stopped.saturating_sub(earlier.prints_stopped),
        }
    }

    pub fn absorb(&mut self, delta: &UsageCounters) {
        self.pla = self.pla.saturating_add(delta.pla);
        self.asa = self.asa.saturating_add(delta.asa);
        self.petg = self.petg.saturating_add(delta.petg);
        self.settings_changed = self.settings_changed.saturating_add(delta.settings_changed);
        self.prints_stopped = self.prints_stopped.saturating_add(delta.prints_stopped);
    }

    pub fn is_zero(&self) -> bool {
        *self == UsageCounters::default()
    }
}

/// Write to `<path>.new`, fsync, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

/// Lifetime totals stored as pretty JSON.
#[derive(Debug, Clone)]
pub struct CounterStore {
    path: PathBuf,
}

impl CounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file reads as all-zero totals.
    pub fn load(&self) -> Result<UsageCounters> {
        match fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s).map_err(|e| {
                eyre::Report::new(VerifyError::Io(format!(
                    "parse counters {:?}: {e}",
                    self.path
                )))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(UsageCounters::default()),
            Err(e) => Err(eyre::Report::new(VerifyError::Io(format!(
                "read counters {:?}: {e}",
                self.path
            )))),
        }
    }

    pub fn save(&self, counters: &UsageCounters) -> Result<()> {
        let json = serde_json::to_vec_pretty(counters)
            .map_err(|e| eyre::Report::new(VerifyError::Io(e.to_string())))?;
        write_atomic(&self.path, &json).map_err(|e| {
            eyre::Report::new(VerifyError::Io(format!(
                "write counters {:?}: {e}",
                self.path
            )))
        })?;
        tracing::debug!(path = ?self.path, "counters saved");
        Ok(())
    }
}
