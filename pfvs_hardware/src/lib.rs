//! Sensor backends: a simulated triad spectrometer + color sensor for
//! development and replay, and (feature `hardware`) GPIO digital inputs for
//! the filament switch and the manual-override button.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod util;

use pfvs_traits::{LED_BANKS, Rgbc, SPECTRAL_CHANNELS, SensorGateway};

use crate::error::HwError;

/// Channels served by each LED bank (one spectrometer device per bank).
const CHANNELS_PER_BANK: usize = SPECTRAL_CHANNELS / LED_BANKS as usize;

/// Fraction of the final reflectance seen on successive reads after a shutter change.
const SETTLE_RESPONSE: [f32; 3] = [0.5, 0.9, 1.0];

const AMBIENT: [f32; SPECTRAL_CHANNELS] = [
    15.0, 16.0, 17.0, 18.0, 19.0, 20.0, 21.0, 22.0, 23.0, 24.0, 25.0, 26.0, 27.0, 28.0, 29.0,
    30.0, 31.0, 32.0,
];

/// Canned filament samples for the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimMaterial {
    Pla,
    Petg,
    Asa,
    Tpu,
}

impl SimMaterial {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pla" => Some(SimMaterial::Pla),
            "petg" | "pet" => Some(SimMaterial::Petg),
            "asa" => Some(SimMaterial::Asa),
            "tpu" => Some(SimMaterial::Tpu),
            _ => None,
        }
    }

    /// Differential reflectance with all banks lit.
    pub fn reflectance(self) -> [f32; SPECTRAL_CHANNELS] {
        match self {
            SimMaterial::Pla => [
                120.0, 135.0, 150.0, 170.0, 190.0, 210.0, 260.0, 300.0, 340.0, 380.0, 420.0,
                450.0, 480.0, 500.0, 510.0, 505.0, 490.0, 470.0,
            ],
            SimMaterial::Petg => [
                400.0, 410.0, 420.0, 425.0, 430.0, 432.0, 435.0, 436.0, 437.0, 436.0, 434.0,
                430.0, 425.0, 420.0, 415.0, 410.0, 405.0, 400.0,
            ],
            SimMaterial::Asa => [
                40.0, 42.0, 44.0, 45.0, 46.0, 47.0, 48.0, 49.0, 50.0, 50.0, 51.0, 51.0, 52.0,
                52.0, 52.0, 53.0, 53.0, 53.0,
            ],
            SimMaterial::Tpu => [
                300.0, 280.0, 260.0, 240.0, 220.0, 200.0, 180.0, 170.0, 160.0, 170.0, 180.0,
                200.0, 220.0, 240.0, 260.0, 280.0, 300.0, 320.0,
            ],
        }
    }

    pub fn color(self) -> Rgbc {
        match self {
            SimMaterial::Pla => Rgbc::new(900, 200, 180, 1300),
            SimMaterial::Petg => Rgbc::new(150, 220, 700, 1100),
            SimMaterial::Asa => Rgbc::new(20, 18, 16, 25),
            SimMaterial::Tpu => Rgbc::new(500, 480, 470, 1600),
        }
    }
}

/// Simulated sensor head.
///
/// Dark reads return the ambient floor; a lit bank adds the material's
/// reflectance on its six channels, ramping in over the first reads after
/// a shutter change like the real part does.
pub struct SimulatedGateway {
    material: SimMaterial,
    shutters: [bool; LED_BANKS as usize],
    reads_since_change: usize,
    gain: u8,
    integration: u8,
    present: bool,
    presence_input: Option<Box<dyn Fn() -> bool + Send>>,
    reads: u64,
    fault_after: Option<u64>,
}

impl SimulatedGateway {
    pub fn new(material: SimMaterial) -> Self {
        Self {
            material,
            shutters: [false; LED_BANKS as usize],
            reads_since_change: 0,
            gain: 0,
            integration: 0,
            present: true,
            presence_input: None,
            reads: 0,
            fault_after: None,
        }
    }

    /// Report the filament switch as open/closed.
    pub fn with_filament(mut self, present: bool) -> Self {
        self.present = present;
        self
    }

    /// Take filament presence from an external input (e.g. a GPIO pin) instead.
    pub fn with_presence_input(mut self, input: Box<dyn Fn() -> bool + Send>) -> Self {
        self.presence_input = Some(input);
        self
    }

    /// Fail every spectral read after the first `n`.
    pub fn with_read_fault_after(mut self, n: u64) -> Self {
        self.fault_after = Some(n);
        self
    }

    pub fn set_material(&mut self, material: SimMaterial) {
        self.material = material;
    }

    pub fn shutters(&self) -> [bool; LED_BANKS as usize] {
        self.shutters
    }

    pub fn gain(&self) -> u8 {
        self.gain
    }

    pub fn integration_time(&self) -> u8 {
        self.integration
    }
}

impl SensorGateway for SimulatedGateway {
    fn set_gain(&mut self, gain: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.gain = gain;
        Ok(())
    }

    fn set_integration_time(
        &mut self,
        cycles: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.integration = cycles;
        Ok(())
    }

    fn shutter_led(
        &mut self,
        bank: u8,
        open: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let slot = self
            .shutters
            .get_mut(usize::from(bank))
            .ok_or(HwError::InvalidBank(bank))?;
        if *slot != open {
            *slot = open;
            self.reads_since_change = 0;
        }
        Ok(())
    }

    fn read_raw(&mut self) -> Result<Vec<f32>, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(limit) = self.fault_after
            && self.reads >= limit
        {
            tracing::debug!(reads = self.reads, "simulated spectrometer fault");
            return Err(Box::new(HwError::Bus("simulated spectrometer fault".into())));
        }
        self.reads += 1;
        let idx = self.reads_since_change.min(SETTLE_RESPONSE.len() - 1);
        let response = SETTLE_RESPONSE[idx];
        self.reads_since_change = self.reads_since_change.saturating_add(1);

        let reflectance = self.material.reflectance();
        let frame = (0..SPECTRAL_CHANNELS)
            .map(|ch| {
                let lit = self.shutters[ch / CHANNELS_PER_BANK];
                AMBIENT[ch] + if lit { reflectance[ch] * response } else { 0.0 }
            })
            .collect();
        tracing::trace!(response, "simulated spectral read");
        Ok(frame)
    }

    fn read_color_raw(&mut self) -> Result<Rgbc, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.material.color())
    }

    fn filament_present(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match &self.presence_input {
            Some(input) => input(),
            None => self.present,
        })
    }
}
