//! Debounce-free digital inputs on Raspberry Pi GPIO (filament switch,
//! manual-override button).

use std::sync::Mutex;

use rppal::gpio::{Gpio, InputPin};
use tracing::{debug, warn};

use crate::error::{HwError, Result};

pub struct DigitalInput {
    pin: Mutex<InputPin>,
    active_low: bool,
}

impl DigitalInput {
    /// Open `bcm_pin` as an input with pull-up.
    ///
    /// `active_low` selects which level means "asserted"; the filament switch
    /// polarity depends on wiring and must be confirmed on the real machine.
    pub fn open(bcm_pin: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| HwError::Gpio(format!("pin {bcm_pin}: {e}")))?
            .into_input_pullup();
        debug!(pin = bcm_pin, active_low, "digital input opened");
        Ok(Self {
            pin: Mutex::new(pin),
            active_low,
        })
    }

    pub fn is_active(&self) -> bool {
        match self.pin.lock() {
            Ok(pin) => pin.is_low() == self.active_low,
            Err(_) => {
                warn!("gpio input lock poisoned; reporting inactive");
                false
            }
        }
    }
}

/// Box a GPIO input into the predicate shape the core and the simulator accept.
pub fn make_input_checker(bcm_pin: u8, active_low: bool) -> Result<Box<dyn Fn() -> bool + Send + Sync>> {
    let input = DigitalInput::open(bcm_pin, active_low)?;
    Ok(Box::new(move || input.is_active()))
}
