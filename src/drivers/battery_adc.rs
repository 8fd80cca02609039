//! Battery divider ADC reader.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the battery channel via the ADC1 oneshot API
//! (initialised by hw_init).  On host/test: reads from a static
//! `AtomicU16` for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

/// Roughly 15.3 V through the default divider: a healthy pack.
#[cfg(not(target_os = "espidf"))]
static SIM_BATTERY_ADC: AtomicU16 = AtomicU16::new(900);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_battery_adc(raw: u16) {
    SIM_BATTERY_ADC.store(raw, Ordering::Relaxed);
}

pub struct BatteryAdc {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    channel: u32,
}

impl BatteryAdc {
    pub fn new(channel: u32) -> Self {
        Self { channel }
    }

    #[cfg(target_os = "espidf")]
    pub fn read_raw(&self) -> u16 {
        hw_init::adc1_read(self.channel)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read_raw(&self) -> u16 {
        SIM_BATTERY_ADC.load(Ordering::Relaxed)
    }
}
