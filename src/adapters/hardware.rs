//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the robot UART, the stream decoder, the BRC wake line, the battery
//! ADC and the clock, exposing them through [`OiPort`], [`WakeLinePort`],
//! [`AnalogPort`] and [`ClockPort`].  This is the only module in the
//! system that touches actual hardware.  On non-espidf targets, the
//! underlying drivers use cfg-gated simulation stubs.

use core::time::Duration;

use embedded_hal::digital::OutputPin;

use crate::adapters::time::Esp32TimeAdapter;
use crate::app::ports::{AnalogPort, ClockPort, OiPort, WakeLinePort};
use crate::drivers::battery_adc::BatteryAdc;
use crate::drivers::oi_uart::OiUart;
use crate::drivers::wake_line::WakeLine;
use crate::oi::StreamDecoder;

/// Bytes pulled from the UART per poll.
const RX_CHUNK: usize = 64;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<P: OutputPin> {
    uart: OiUart,
    decoder: StreamDecoder,
    /// Newest frame completed but not yet handed to the service.
    latest: Option<Vec<u8>>,
    /// Frames replaced by a newer one before the service asked.
    superseded: u32,
    wake: WakeLine<P>,
    battery: BatteryAdc,
    clock: Esp32TimeAdapter,
}

impl<P: OutputPin> HardwareAdapter<P> {
    pub fn new(uart: OiUart, wake: WakeLine<P>, battery: BatteryAdc, clock: Esp32TimeAdapter) -> Self {
        Self {
            uart,
            decoder: StreamDecoder::new(),
            latest: None,
            superseded: 0,
            wake,
            battery,
            clock,
        }
    }

    /// Frames dropped for a bad checksum since boot.
    pub fn checksum_errors(&self) -> u32 {
        self.decoder.checksum_errors()
    }

    /// Valid frames discarded because a newer one arrived first.
    pub fn superseded_frames(&self) -> u32 {
        self.superseded
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn uart_mut(&mut self) -> &mut OiUart {
        &mut self.uart
    }
}

// ── OiPort implementation ─────────────────────────────────────

impl<P: OutputPin> OiPort for HardwareAdapter<P> {
    fn write_byte(&mut self, byte: u8) {
        self.uart.write(&[byte]);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.uart.write(bytes);
    }

    /// Drain the UART and hand over the newest complete frame.  Each frame
    /// is a full snapshot, so older ones queued behind a blocking command
    /// are dropped rather than replayed with a late timestamp.
    fn poll_frame(&mut self) -> Option<Vec<u8>> {
        let mut buf = [0u8; RX_CHUNK];
        loop {
            let n = self.uart.read(&mut buf);
            if n == 0 {
                break;
            }
            for frame in self.decoder.feed(&buf[..n]) {
                if self.latest.replace(frame).is_some() {
                    self.superseded = self.superseded.wrapping_add(1);
                }
            }
        }
        self.latest.take()
    }
}

// ── WakeLinePort implementation ───────────────────────────────

impl<P: OutputPin> WakeLinePort for HardwareAdapter<P> {
    fn drive_low(&mut self) {
        self.wake.drive_low();
    }

    fn release(&mut self) {
        self.wake.release();
    }
}

// ── AnalogPort implementation ─────────────────────────────────

impl<P: OutputPin> AnalogPort for HardwareAdapter<P> {
    fn sample(&mut self) -> u16 {
        self.battery.read_raw()
    }
}

// ── ClockPort implementation ──────────────────────────────────

impl<P: OutputPin> ClockPort for HardwareAdapter<P> {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.delay_ms(ms);
    }

    fn deep_sleep(&mut self, duration: Duration) {
        self.clock.deep_sleep(duration);
    }
}
