//! GPIO / peripheral pin assignments for the bridge board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Robot Open Interface (mini-DIN)
// ---------------------------------------------------------------------------

/// UART peripheral wired to the robot's serial port.  UART0 stays on the
/// console.
pub const OI_UART_PORT: i32 = 1;
/// Bridge TX → robot RXD (mini-DIN pin 3).
pub const OI_UART_TX_GPIO: i32 = 17;
/// Robot TXD (mini-DIN pin 4) → bridge RX.
pub const OI_UART_RX_GPIO: i32 = 16;
/// 600-series default rate.
pub const OI_BAUD: i32 = 115_200;
/// Driver RX ring buffer.  A full sensor frame is well under 64 bytes.
pub const OI_RX_BUFFER_BYTES: i32 = 512;

/// BRC (mini-DIN pin 5), driven open-drain.  A low pulse wakes the robot.
pub const BRC_WAKE_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Battery sense (ADC1)
// ---------------------------------------------------------------------------

/// Pack voltage through a resistive divider.  ADC1 channel 6 (GPIO 34 on
/// the classic ESP32).
pub const BATTERY_ADC_GPIO: i32 = 34;
pub const BATTERY_ADC_CHANNEL: u32 = 6;
