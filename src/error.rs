//! Unified error types for the bridge firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the top-level
//! loop handles failures uniformly.  All variants are `Copy` so they can be
//! passed through the tick path without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor-stream frame could not be decoded.
    Parse(ParseError),
    /// The message link or network failed.
    Comms(CommsError),
    /// A safety cutoff was triggered.
    Safety(SafetyFault),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Safety(e) => write!(f, "safety: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Why a sensor-stream payload was rejected.
///
/// Any of these discards the whole frame; the previous `DeviceState`
/// stays in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The payload contained no bytes at all.
    Empty,
    /// A packet id outside the known table.  Its width is unknown, so the
    /// rest of the buffer cannot be walked.
    UnknownPacketId { id: u8, offset: usize },
    /// A known packet's payload runs past the end of the buffer.
    Truncated { id: u8, offset: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty sensor payload"),
            Self::UnknownPacketId { id, offset } => {
                write!(f, "unknown packet id {id} at offset {offset}")
            }
            Self::Truncated { id, offset } => {
                write!(f, "packet {id} at offset {offset} overruns buffer")
            }
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    MqttDisconnected,
    MqttPublishFailed,
    MqttSubscribeFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MqttDisconnected => write!(f, "MQTT not connected"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::MqttSubscribeFailed => write!(f, "MQTT subscribe failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Conditions that override normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyFault {
    /// Pack voltage under the per-cell floor.  Carries the measured mV.
    BatteryUnderVoltage(u32),
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BatteryUnderVoltage(mv) => {
                write!(f, "battery under-voltage ({}.{:03} V)", mv / 1000, mv % 1000)
            }
        }
    }
}

impl From<SafetyFault> for Error {
    fn from(e: SafetyFault) -> Self {
        Self::Safety(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
