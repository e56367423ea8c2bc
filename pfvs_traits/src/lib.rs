//! Capability interfaces between the verification core and the outside world.
//!
//! The core never talks to GPIO, I2C, the classifier model or the print host
//! directly; everything goes through the three traits below plus `Clock`.
//! Errors crossing these boundaries are boxed so drivers stay free to use
//! their own error types.

pub mod clock;
pub mod types;

pub use clock::{Clock, MonotonicClock};
pub use types::{ColorLabel, LED_BANKS, MaterialLabel, Rgbc, SPECTRAL_CHANNELS, ToolTemperature};

/// Spectrometer, color sensor and filament switch behind one handle.
///
/// Every call is synchronous and may block for the duration of the bus
/// transaction.
pub trait SensorGateway {
    fn set_gain(&mut self, gain: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_integration_time(
        &mut self,
        cycles: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    /// Open (`true`) or close one of the `LED_BANKS` illumination shutters.
    fn shutter_led(
        &mut self,
        bank: u8,
        open: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    /// One raw spectral read; well-behaved drivers return `SPECTRAL_CHANNELS` values.
    fn read_raw(&mut self) -> Result<Vec<f32>, Box<dyn std::error::Error + Send + Sync>>;
    fn read_color_raw(&mut self) -> Result<Rgbc, Box<dyn std::error::Error + Send + Sync>>;
    fn filament_present(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// Pre-trained material model, seen as a pure function.
pub trait MaterialClassifier {
    fn predict(
        &self,
        channels: &[f32],
        color: ColorLabel,
    ) -> Result<MaterialLabel, Box<dyn std::error::Error + Send + Sync>>;
}

/// Print host controls used to pause, correct or stop a job.
pub trait PrinterControl {
    fn pause_print(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn resume_print(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn cancel_print(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    /// Queue commands to the firmware; `blocking` waits until they are acknowledged.
    fn send_commands(
        &mut self,
        lines: &[String],
        blocking: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn current_temperatures(
        &self,
    ) -> Result<Vec<ToolTemperature>, Box<dyn std::error::Error + Send + Sync>>;
}
