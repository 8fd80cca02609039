//! Robot serial link driver.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: writes and non-blocking reads on the UART installed by
//! `hw_init`.  On host/test: an in-memory loopback where tests inject
//! robot bytes and inspect what was sent.

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::pins;

pub struct OiUart {
    #[cfg(not(target_os = "espidf"))]
    tx: Vec<u8>,
    #[cfg(not(target_os = "espidf"))]
    rx: VecDeque<u8>,
}

impl Default for OiUart {
    fn default() -> Self {
        Self::new()
    }
}

impl OiUart {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            tx: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            rx: VecDeque::new(),
        }
    }

    #[cfg(target_os = "espidf")]
    pub fn write(&mut self, bytes: &[u8]) {
        // SAFETY: the driver was installed by hw_init before the loop.
        let n = unsafe { uart_write_bytes(pins::OI_UART_PORT, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 || n as usize != bytes.len() {
            log::warn!("OI UART: short write ({} of {})", n, bytes.len());
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn write(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }

    /// Copy whatever has arrived into `buf` without blocking.  Returns the
    /// number of bytes read.
    #[cfg(target_os = "espidf")]
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        // SAFETY: as for write; a zero tick timeout never blocks.
        let n = unsafe {
            uart_read_bytes(
                pins::OI_UART_PORT,
                buf.as_mut_ptr().cast(),
                buf.len() as u32,
                0,
            )
        };
        n.max(0) as usize
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        n
    }

    /// Queue bytes as if the robot had sent them.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Everything written since the last call.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_take_tx(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_drains_in_order() {
        let mut uart = OiUart::new();
        uart.sim_inject(&[1, 2, 3]);
        let mut buf = [0u8; 2];
        assert_eq!(uart.read(&mut buf), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(uart.read(&mut buf), 1);
        assert_eq!(buf[0], 3);
        assert_eq!(uart.read(&mut buf), 0);
    }

    #[test]
    fn writes_are_recorded() {
        let mut uart = OiUart::new();
        uart.write(&[128]);
        uart.write(&[131, 135]);
        assert_eq!(uart.sim_take_tx(), vec![128, 131, 135]);
        assert!(uart.sim_take_tx().is_empty());
    }
}
