//! BRC wake line.
//!
//! [`WakeLine`] drives any `embedded-hal` output pin as the robot's BRC
//! line; [`GpioPin`] is the board's raw-GPIO implementation of that trait.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::warn;

use crate::app::ports::WakeLinePort;
use crate::drivers::hw_init;

/// An output already configured by `hw_init`, addressed by GPIO number.
pub struct GpioPin {
    pin: i32,
}

impl GpioPin {
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }
}

impl ErrorType for GpioPin {
    type Error = Infallible;
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, true);
        Ok(())
    }
}

/// Open-drain wake line: low pulls BRC down, high releases it.
pub struct WakeLine<P: OutputPin> {
    pin: P,
}

impl<P: OutputPin> WakeLine<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin> WakeLinePort for WakeLine<P> {
    fn drive_low(&mut self) {
        if let Err(e) = self.pin.set_low() {
            warn!("BRC drive low failed: {:?}", e);
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.pin.set_high() {
            warn!("BRC release failed: {:?}", e);
        }
    }
}
