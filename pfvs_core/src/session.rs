//! Per-print scan session.

use std::time::Instant;

use pfvs_traits::MaterialLabel;

use crate::counters::UsageCounters;

/// State carried across scans of one load / print.
///
/// Created on filament load or on the first temperature probe of a print,
/// dropped on unload, on a new print start and after a cancel.
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    pub predicted: Option<MaterialLabel>,
    /// Monotonic instant of the last corrective command sequence.
    pub last_correction: Option<Instant>,
    pub counters: UsageCounters,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }
}
