//! Mock adapters for integration tests.
//!
//! Records every robot-side call so tests can assert on the full byte and
//! timing history without touching a real UART, GPIO or ADC.

use std::collections::VecDeque;
use std::time::Duration;

use roomba_bridge::app::events::AppEvent;
use roomba_bridge::app::ports::{
    AnalogPort, ClockPort, EventSink, InboundMessage, LinkPort, OiPort, OtaPort, WakeLinePort,
};
use roomba_bridge::error::CommsError;
use roomba_bridge::oi::SensorPacket;
use roomba_bridge::oi::opcodes::stream_request;

// ── Hardware call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Write(Vec<u8>),
    WakeLow,
    WakeRelease,
    Delay(u32),
    DeepSleep(Duration),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<HwCall>,
    pub frames: VecDeque<Vec<u8>>,
    pub adc: u16,
    pub now: u64,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            frames: VecDeque::new(),
            // 900 × 17 mV/count ≈ 15.3 V
            adc: 900,
            now: 0,
        }
    }

    /// Every byte written to the OI, in order.
    pub fn written(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Write(b) => Some(b.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Each OI write as it was issued.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Write(b) => Some(b.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn wake_pulses(&self) -> usize {
        self.calls.iter().filter(|c| **c == HwCall::WakeLow).count()
    }

    pub fn deep_sleeps(&self) -> Vec<Duration> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::DeepSleep(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    /// True if a stream request for the bridge's packet set was written.
    pub fn requested_stream(&self, packets: &[SensorPacket]) -> bool {
        let req = stream_request(packets);
        self.writes().iter().any(|w| *w == req)
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl OiPort for MockHardware {
    fn write_byte(&mut self, byte: u8) {
        self.calls.push(HwCall::Write(vec![byte]));
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.calls.push(HwCall::Write(bytes.to_vec()));
    }

    fn poll_frame(&mut self) -> Option<Vec<u8>> {
        self.frames.pop_front()
    }
}

impl WakeLinePort for MockHardware {
    fn drive_low(&mut self) {
        self.calls.push(HwCall::WakeLow);
    }

    fn release(&mut self) {
        self.calls.push(HwCall::WakeRelease);
    }
}

impl AnalogPort for MockHardware {
    fn sample(&mut self) -> u16 {
        self.adc
    }
}

impl ClockPort for MockHardware {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(HwCall::Delay(ms));
        self.now += u64::from(ms);
    }

    fn deep_sleep(&mut self, duration: Duration) {
        self.calls.push(HwCall::DeepSleep(duration));
    }
}

// ── MockLink ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

#[allow(dead_code)]
impl Sent {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).expect("payload is JSON")
    }
}

pub struct MockLink {
    pub connected: bool,
    pub reachable: bool,
    pub reconnects: u32,
    pub sent: Vec<Sent>,
    pub subscriptions: Vec<String>,
    pub inbox: VecDeque<InboundMessage>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn connected() -> Self {
        Self {
            connected: true,
            reachable: true,
            reconnects: 0,
            sent: Vec::new(),
            subscriptions: Vec::new(),
            inbox: VecDeque::new(),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::connected()
        }
    }

    pub fn deliver(&mut self, topic: &str, payload: &str) {
        self.inbox.push_back(InboundMessage {
            topic: topic.to_owned(),
            payload: payload.as_bytes().to_vec(),
        });
    }

    pub fn sent_to(&self, topic: &str) -> Vec<&Sent> {
        self.sent.iter().filter(|s| s.topic == topic).collect()
    }
}

impl LinkPort for MockLink {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reconnect(&mut self) -> bool {
        self.reconnects += 1;
        self.connected = self.reachable;
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::MqttDisconnected);
        }
        self.sent.push(Sent {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        self.inbox.drain(..).collect()
    }
}

// ── MockOta ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockOta {
    pub active: bool,
    pub handled: u32,
}

impl OtaPort for MockOta {
    fn handle(&mut self) {
        self.handled += 1;
    }

    fn in_progress(&self) -> bool {
        self.active
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
