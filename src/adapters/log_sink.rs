//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART0 / USB-CDC in production; the
//! robot link uses a different UART).

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | OI running, stream requested"),
            AppEvent::FrameParsed {
                current_ma,
                voltage_mv,
            } => debug!("FRAME | current={}mA voltage={}mV", current_ma, voltage_mv),
            AppEvent::ParseFailed(e) => warn!("FRAME | rejected: {}", e),
            AppEvent::StatusPublished => debug!("MQTT  | status sent"),
            AppEvent::StreamRequested { age_ms } => match age_ms {
                Some(age) => debug!("OI    | stream re-requested, state age {} ms", age),
                None => debug!("OI    | stream re-requested, no state yet"),
            },
            AppEvent::ConfigPublished => debug!("MQTT  | discovery config sent"),
            AppEvent::LinkReconnect { connected } => {
                info!("MQTT  | reconnect {}", if *connected { "ok" } else { "failed" });
            }
            AppEvent::LinkError(e) => warn!("MQTT  | {}", e),
            AppEvent::CommandHandled(cmd) => info!("CMD   | {}", cmd),
            AppEvent::UnknownCommand(token) => warn!("CMD   | unknown {:?}", token),
            AppEvent::WakeIssued(variant) => debug!("WAKE  | {:?}", variant),
            AppEvent::LowBattery { millivolts } => {
                warn!("POWER | pack at {} mV, going to sleep", millivolts);
            }
            AppEvent::OtaStarted => info!("OTA   | update started, bridge suspended"),
        }
    }
}
