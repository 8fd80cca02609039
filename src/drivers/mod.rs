//! Peripheral drivers and one-shot hardware initialisation.

pub mod battery_adc;
pub mod hw_init;
pub mod oi_uart;
pub mod wake_line;
pub mod watchdog;
