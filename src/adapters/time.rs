//! ESP32 time adapter.
//!
//! Provides monotonic time, blocking delays and deep sleep for the bridge.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic),
//!   FreeRTOS delays and `esp_deep_sleep`.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` and
//!   `std::thread::sleep` for host-side testing and simulation.  Deep
//!   sleep is only logged.

use core::time::Duration;

use log::info;

use crate::app::ports::ClockPort;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic, wraps at `u64::MAX`).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl ClockPort for Esp32TimeAdapter {
    fn now_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }

    #[cfg(target_os = "espidf")]
    fn deep_sleep(&mut self, duration: Duration) {
        info!("Deep sleep for {} s", duration.as_secs());
        // SAFETY: does not return; the chip resets on the timer wakeup.
        unsafe { esp_idf_svc::sys::esp_deep_sleep(duration.as_micros() as u64) };
    }

    #[cfg(not(target_os = "espidf"))]
    fn deep_sleep(&mut self, duration: Duration) {
        info!("[SIM] deep sleep for {} s (not entered)", duration.as_secs());
    }
}
