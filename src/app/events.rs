//! Outbound application events.
//!
//! The [`BridgeService`](super::service::BridgeService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them, such as logging to serial.

use crate::error::{CommsError, ParseError};

use super::commands::Command;

/// Which wake sequence was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeVariant {
    /// Pulse the wake line and send start.
    Plain,
    /// Plain wake followed by the clean+dock pair that keeps a docked robot
    /// from dozing off.
    OnDock,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Startup sequence finished and the stream has been requested.
    Started,

    /// A frame parsed and replaced the device state.
    FrameParsed { current_ma: i16, voltage_mv: u16 },

    /// A frame was rejected; the previous state is kept.
    ParseFailed(ParseError),

    /// The status snapshot was published.
    StatusPublished,

    /// The snapshot was stale; the stream was requested again.
    /// `age_ms` is `None` when nothing has ever been parsed.
    StreamRequested { age_ms: Option<u64> },

    /// Discovery configuration was published.
    ConfigPublished,

    /// A reconnect attempt finished.
    LinkReconnect { connected: bool },

    /// A publish or subscribe failed.
    LinkError(CommsError),

    /// A recognised command was carried out.
    CommandHandled(Command),

    /// An inbound command token was not recognised.
    UnknownCommand(String),

    /// A periodic wake was issued.
    WakeIssued(WakeVariant),

    /// Battery under the cutoff; the board is going to deep sleep.
    LowBattery { millivolts: u32 },

    /// A firmware update started; normal operation is suspended.
    OtaStarted,
}
