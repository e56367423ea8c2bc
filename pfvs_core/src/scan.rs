//! Differential dark/light spectral scan plus color read and classification.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use pfvs_traits::clock::Clock;
use pfvs_traits::{ColorLabel, LED_BANKS, MaterialClassifier, MaterialLabel, Rgbc, SensorGateway};
use tracing::{debug, trace};

use crate::color::classify_color;
use crate::error::{Result, VerifyError};
use crate::hw_error::{map_classifier_error, map_sensor_error};
use crate::spectral::{SpectralFrame, validate_raw};

/// Gain code applied before every scan.
pub const SCAN_GAIN: u8 = 3;
/// Integration cycles applied before every scan.
pub const SCAN_INTEGRATION: u8 = 50;
/// LED shutter settle time after every open/close.
pub const SETTLE: Duration = Duration::from_millis(180);
/// Successive lit reads; only the last one is kept.
pub const LIGHT_READS: usize = 3;

/// One physical sensor head shared by verification scans and the live stream.
pub type SharedGateway = Arc<Mutex<Box<dyn SensorGateway + Send>>>;

pub fn share_gateway(gateway: impl SensorGateway + Send + 'static) -> SharedGateway {
    Arc::new(Mutex::new(Box::new(gateway)))
}

pub(crate) fn lock_gateway(
    gateway: &SharedGateway,
) -> std::result::Result<MutexGuard<'_, Box<dyn SensorGateway + Send>>, VerifyError> {
    gateway
        .lock()
        .map_err(|_| VerifyError::Sensor("sensor gateway lock poisoned".into()))
}

/// Open or close every LED bank.
pub(crate) fn set_shutters<G: SensorGateway + ?Sized>(
    gw: &mut G,
    open: bool,
) -> std::result::Result<(), VerifyError> {
    for bank in 0..LED_BANKS {
        gw.shutter_led(bank, open)
            .map_err(|e| map_sensor_error(&format!("shutter {bank}"), &*e))?;
    }
    Ok(())
}

/// Read one raw frame and range-check it.
pub(crate) fn read_checked<G: SensorGateway + ?Sized>(
    gw: &mut G,
    stage: &str,
) -> std::result::Result<[f32; pfvs_traits::SPECTRAL_CHANNELS], VerifyError> {
    let raw = gw.read_raw().map_err(|e| map_sensor_error(stage, &*e))?;
    validate_raw(stage, &raw)
}

/// Dark baseline then settled light read, same gain and integration.
///
/// Leaves all shutters open.
pub fn acquire_frame<G: SensorGateway + ?Sized>(
    gw: &mut G,
    clock: &dyn Clock,
) -> std::result::Result<SpectralFrame, VerifyError> {
    gw.set_gain(SCAN_GAIN)
        .map_err(|e| map_sensor_error("set gain", &*e))?;
    gw.set_integration_time(SCAN_INTEGRATION)
        .map_err(|e| map_sensor_error("set integration time", &*e))?;

    set_shutters(gw, false)?;
    clock.sleep(SETTLE);
    let dark = read_checked(gw, "dark read")?;

    set_shutters(gw, true)?;
    clock.sleep(SETTLE);
    let mut light = read_checked(gw, "light read 1")?;
    for n in 2..=LIGHT_READS {
        light = read_checked(gw, &format!("light read {n}"))?;
    }
    trace!(?dark, ?light, "spectral frame acquired");
    Ok(SpectralFrame::new(dark, light))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub frame: SpectralFrame,
    pub rgbc: Rgbc,
    pub color: ColorLabel,
    pub material: MaterialLabel,
}

#[derive(Clone)]
pub struct ScanPipeline {
    gateway: SharedGateway,
    classifier: Arc<dyn MaterialClassifier + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for ScanPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScanPipeline").finish_non_exhaustive()
    }
}

impl ScanPipeline {
    pub fn new(
        gateway: SharedGateway,
        classifier: Arc<dyn MaterialClassifier + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            gateway,
            classifier,
            clock,
        }
    }

    pub fn gateway(&self) -> &SharedGateway {
        &self.gateway
    }

    /// Run one full scan while holding the gateway guard.
    ///
    /// Fails with `VerifyError::Sensor` on any read or range error and with
    /// `VerifyError::Classification` when the model fails. Nothing is cached.
    pub fn scan(&self) -> Result<ScanResult> {
        self.scan_typed().map_err(eyre::Report::new)
    }

    pub(crate) fn scan_typed(&self) -> std::result::Result<ScanResult, VerifyError> {
        let mut guard = lock_gateway(&self.gateway)?;
        let gw: &mut (dyn SensorGateway + Send) = &mut **guard;

        let frame = acquire_frame(gw, &*self.clock)?;
        let rgbc = gw
            .read_color_raw()
            .map_err(|e| map_sensor_error("color read", &*e))?;
        let color = classify_color(rgbc);

        let diff = frame.differential();
        let material = self
            .classifier
            .predict(&diff, color)
            .map_err(|e| map_classifier_error(&*e))?;
        drop(guard);

        debug!(%material, %color, r = rgbc.r, g = rgbc.g, b = rgbc.b, clear = rgbc.clear, "scan complete");
        Ok(ScanResult {
            frame,
            rgbc,
            color,
            material,
        })
    }
}
