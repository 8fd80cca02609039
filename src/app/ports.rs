//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BridgeService (domain)
//! ```
//!
//! Driven adapters (OI serial link, wake line, battery ADC, MQTT, OTA,
//! event sinks, storage) implement these traits.  The
//! [`BridgeService`](super::service::BridgeService) consumes them via
//! generics, so the domain core never touches hardware directly.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - Delays on [`ClockPort`] block the loop; only bounded settle times
//!   (wake pulse, melody gaps) use them.

use core::time::Duration;

use crate::config::BridgeConfig;
use crate::error::CommsError;
use crate::oi::SensorPacket;
use crate::oi::opcodes::{stream_pause_resume, stream_request};

// ───────────────────────────────────────────────────────────────
// OI port (driven adapter: domain ↔ robot serial link)
// ───────────────────────────────────────────────────────────────

/// The robot's serial Open Interface.
pub trait OiPort {
    fn write_byte(&mut self, byte: u8);

    fn write_bytes(&mut self, bytes: &[u8]);

    /// Non-blocking: the payload of one complete, checksummed stream frame
    /// if one has arrived.
    fn poll_frame(&mut self) -> Option<Vec<u8>>;

    /// `[148, n, ids…]`
    fn request_stream(&mut self, packets: &[SensorPacket]) {
        self.write_bytes(&stream_request(packets));
    }

    /// `[148, 0]`: stop whatever stream is running.
    fn reset_stream(&mut self) {
        self.request_stream(&[]);
    }

    fn pause_stream(&mut self) {
        self.write_bytes(&stream_pause_resume(false));
    }

    fn resume_stream(&mut self) {
        self.write_bytes(&stream_pause_resume(true));
    }
}

// ───────────────────────────────────────────────────────────────
// Wake line port (driven adapter: domain → BRC pin)
// ───────────────────────────────────────────────────────────────

/// The BRC line that rouses the robot's serial receiver.
pub trait WakeLinePort {
    /// Pull the line low.
    fn drive_low(&mut self);

    /// Let the line float high again.
    fn release(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: domain ↔ MQTT broker)
// ───────────────────────────────────────────────────────────────

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Message-bus transport.
pub trait LinkPort {
    fn is_connected(&self) -> bool;

    /// Try to (re)connect.  Returns whether the link is up afterwards.
    fn reconnect(&mut self) -> bool;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    /// Service the transport and drain messages received since last call.
    fn poll(&mut self) -> Vec<InboundMessage>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: domain → timer / power management)
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Blocking delay.
    fn delay_ms(&mut self, ms: u32);

    /// Enter deep sleep for `duration`.  On the device this does not
    /// return; the chip resets on wake.
    fn deep_sleep(&mut self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Analog port (driven adapter: battery divider → domain)
// ───────────────────────────────────────────────────────────────

pub trait AnalogPort {
    /// One raw ADC reading of the battery divider.
    fn sample(&mut self) -> u16;
}

// ───────────────────────────────────────────────────────────────
// OTA port (driven adapter: firmware update channel)
// ───────────────────────────────────────────────────────────────

/// Firmware update collaborator.  Once [`in_progress`](Self::in_progress)
/// reports true the service does nothing but call [`handle`](Self::handle).
pub trait OtaPort {
    /// Service pending update work (flash writes, reboot).
    fn handle(&mut self);

    fn in_progress(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists bridge configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges should be rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`BridgeConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<BridgeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &BridgeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}
