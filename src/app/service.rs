//! Bridge service, the hexagonal core.
//!
//! [`BridgeService`] owns the device state, the loop timers and the power
//! guard.  It exposes a hardware-agnostic API.  All I/O flows through port
//! traits injected at call sites, making the entire service testable with
//! mock adapters.
//!
//! ```text
//!      OiPort ──▶ ┌──────────────────────────┐ ──▶ LinkPort
//! WakeLinePort ◀──│      BridgeService        │ ──▶ EventSink
//!  AnalogPort ──▶ │ parse · derive · timers   │ ◀── OtaPort
//!                 └──────────────────────────┘
//! ```
//!
//! ## Tick order
//!
//! 1. Service OTA.  If an update is running, pause the stream (once) and
//!    do nothing else, for the rest of the process lifetime.
//! 2. Timers: reconnect, wakeup, status (each only if due).
//! 3. Read at most one pending sensor frame.
//! 4. Pump the link and dispatch inbound commands.

use log::{debug, info, trace, warn};

use crate::config::BridgeConfig;
use crate::error::ParseError;
use crate::oi::{self, Opcode, STREAMED_PACKETS};
use crate::report::{DiscoveryConfig, StatusReport, Topics, to_payload};
use crate::safety::{PowerGuard, PowerVerdict};
use crate::scheduler::{TimerId, TimerSet};
use crate::state::DeviceState;

use super::commands::Command;
use super::dispatcher;
use super::events::{AppEvent, WakeVariant};
use super::ports::{
    AnalogPort, ClockPort, EventSink, InboundMessage, LinkPort, OiPort, OtaPort, WakeLinePort,
};

// ───────────────────────────────────────────────────────────────
// BridgeService
// ───────────────────────────────────────────────────────────────

/// The bridge service orchestrates all domain logic.
pub struct BridgeService {
    config: BridgeConfig,
    topics: Topics,
    state: DeviceState,
    timers: TimerSet,
    guard: PowerGuard,
    ota_active: bool,
    tick_count: u64,
}

impl BridgeService {
    /// Construct the service from configuration.
    ///
    /// Does **not** talk to the robot; call [`start`](Self::start) next.
    pub fn new(config: BridgeConfig, topics: Topics) -> Self {
        Self {
            timers: TimerSet::new(&config.timing),
            guard: PowerGuard::new(&config.battery),
            state: DeviceState::default(),
            ota_active: false,
            tick_count: 0,
            topics,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put the OI in safe mode, learn the locate songs, start the OI and
    /// request the sensor stream.
    pub fn start(&mut self, hw: &mut (impl OiPort + ClockPort), sink: &mut impl EventSink) {
        hw.write_byte(Opcode::Safe.byte());
        dispatcher::learn_songs(hw);

        hw.write_byte(Opcode::Start.byte());
        hw.delay_ms(100);
        hw.reset_stream();
        hw.delay_ms(100);
        hw.request_stream(&STREAMED_PACKETS);

        sink.emit(&AppEvent::Started);
        info!("BridgeService started, entity {}", self.topics.entity_id());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop iteration.
    ///
    /// `hw` satisfies every robot-side port at once.
    pub fn tick(
        &mut self,
        hw: &mut (impl OiPort + WakeLinePort + AnalogPort + ClockPort),
        link: &mut impl LinkPort,
        ota: &mut impl OtaPort,
        sink: &mut impl EventSink,
    ) -> PowerVerdict {
        self.tick_count += 1;

        // 1. OTA has priority over everything
        ota.handle();
        if !self.ota_active && ota.in_progress() {
            info!("OTA started, pausing sensor stream");
            hw.pause_stream();
            self.ota_active = true;
            sink.emit(&AppEvent::OtaStarted);
        }
        if self.ota_active {
            return PowerVerdict::Ok;
        }

        // 2. Timers
        let now = hw.now_ms();
        for timer in self.timers.poll(now) {
            match timer {
                TimerId::Reconnect => self.on_reconnect_timer(link, sink),
                TimerId::Wakeup => self.on_wakeup_timer(hw, sink),
                TimerId::Status => {
                    if self.on_status_timer(now, hw, link, sink) == PowerVerdict::Sleeping {
                        return PowerVerdict::Sleeping;
                    }
                }
            }
        }

        // 3. Sensor stream
        if let Some(frame) = hw.poll_frame() {
            let now = hw.now_ms();
            let _ = self.ingest_frame(&frame, now, sink);
        }

        // 4. Inbound commands
        for msg in link.poll() {
            self.handle_message(&msg, hw, sink);
        }

        PowerVerdict::Ok
    }

    // ── Sensor frames ─────────────────────────────────────────

    /// Parse `payload` and, only if the whole payload is valid, replace the
    /// device state with one derived from it.
    pub fn ingest_frame(
        &mut self,
        payload: &[u8],
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Result<(), ParseError> {
        trace!("Packet ({} B): {}", payload.len(), hex::encode(payload));
        match oi::parse(payload) {
            Ok(readings) => {
                self.state = DeviceState::derive(&readings, now_ms, &self.config.thresholds);
                sink.emit(&AppEvent::FrameParsed {
                    current_ma: self.state.current,
                    voltage_mv: self.state.voltage,
                });
                Ok(())
            }
            Err(e) => {
                sink.emit(&AppEvent::ParseFailed(e));
                Err(e)
            }
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Dispatch an inbound message.  Only the command topic is acted on.
    pub fn handle_message(
        &mut self,
        msg: &InboundMessage,
        hw: &mut (impl OiPort + WakeLinePort + ClockPort),
        sink: &mut impl EventSink,
    ) {
        if msg.topic != self.topics.command {
            debug!("Ignoring message on {}", msg.topic);
            return;
        }
        let token = String::from_utf8_lossy(&msg.payload);
        match token.parse::<Command>() {
            Ok(cmd) => self.handle_command(cmd, hw, sink),
            Err(_) => {
                warn!("Unknown command {:?}", token);
                sink.emit(&AppEvent::UnknownCommand(token.into_owned()));
            }
        }
    }

    /// Carry out an already-parsed command.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        hw: &mut (impl OiPort + WakeLinePort + ClockPort),
        sink: &mut impl EventSink,
    ) {
        dispatcher::perform(cmd, &mut self.state, hw, &self.config.wake);
        sink.emit(&AppEvent::CommandHandled(cmd));
    }

    // ── Timer handlers ────────────────────────────────────────

    fn on_reconnect_timer(&mut self, link: &mut impl LinkPort, sink: &mut impl EventSink) {
        if link.is_connected() {
            if self.timers.resend.tick() {
                self.send_config(link, sink);
            }
            return;
        }

        info!("Reconnecting link");
        let connected = link.reconnect();
        if connected {
            if let Err(e) = link.subscribe(&self.topics.command) {
                warn!("Subscribe to {} failed: {}", self.topics.command, e);
                sink.emit(&AppEvent::LinkError(e));
            }
        }
        sink.emit(&AppEvent::LinkReconnect { connected });
        self.send_config(link, sink);
    }

    fn on_wakeup_timer(
        &mut self,
        hw: &mut (impl OiPort + WakeLinePort + ClockPort),
        sink: &mut impl EventSink,
    ) {
        let variant = if !self.state.cleaning && self.state.docked {
            WakeVariant::OnDock
        } else {
            WakeVariant::Plain
        };
        dispatcher::wake_with(variant, hw, &self.config.wake);
        sink.emit(&AppEvent::WakeIssued(variant));
    }

    fn on_status_timer(
        &mut self,
        now: u64,
        hw: &mut (impl OiPort + AnalogPort + ClockPort),
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> PowerVerdict {
        if self.state.sent || self.state.is_stale(now, self.config.timing.stale_after_ms) {
            let age_ms = self.state.age_ms(now);
            debug!("State stale or already sent (age {:?} ms), requesting stream", age_ms);
            hw.request_stream(&STREAMED_PACKETS);
            sink.emit(&AppEvent::StreamRequested { age_ms });
        } else {
            self.send_status(link, sink);
        }

        self.guard.enforce(hw, Some(link), &self.topics.state, sink)
    }

    // ── Publishing ────────────────────────────────────────────

    fn send_status(&mut self, link: &mut impl LinkPort, sink: &mut impl EventSink) {
        if !link.is_connected() {
            debug!("Link down, not sending status");
            return;
        }
        let Some(payload) = to_payload(&StatusReport::from(&self.state)) else {
            return;
        };
        match link.publish(&self.topics.state, &payload, false) {
            Ok(()) => {
                self.state.sent = true;
                sink.emit(&AppEvent::StatusPublished);
            }
            Err(e) => sink.emit(&AppEvent::LinkError(e)),
        }
    }

    fn send_config(&mut self, link: &mut impl LinkPort, sink: &mut impl EventSink) {
        if !link.is_connected() {
            debug!("Link down, not sending config");
            return;
        }
        let doc = DiscoveryConfig::new(&self.topics, &self.config.device);
        let Some(payload) = to_payload(&doc) else {
            return;
        };
        match link.publish(&self.topics.config, &payload, false) {
            Ok(()) => sink.emit(&AppEvent::ConfigPublished),
            Err(e) => sink.emit(&AppEvent::LinkError(e)),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Last known robot state.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// True once an OTA update has taken over the loop.
    pub fn ota_active(&self) -> bool {
        self.ota_active
    }

    /// Total loop iterations since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Connected reconnect-timer fires since the last config resend.
    pub fn resend_count(&self) -> u32 {
        self.timers.resend.count()
    }
}
