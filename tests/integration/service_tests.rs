//! Integration tests for the BridgeService loop: frames → state → reports,
//! timers, the power guard and the OTA override.
//!
//! These run on the host (x86_64) against the mock adapters in `mock_hw`.

use std::time::Duration;

use crate::mock_hw::{HwCall, MockHardware, MockLink, MockOta, RecordingSink};

use roomba_bridge::adapters::device_id::read_mac;
use roomba_bridge::app::commands::Command;
use roomba_bridge::app::events::{AppEvent, WakeVariant};
use roomba_bridge::app::service::BridgeService;
use roomba_bridge::config::BridgeConfig;
use roomba_bridge::error::ParseError;
use roomba_bridge::oi::STREAMED_PACKETS;
use roomba_bridge::oi::songs::{LOCATE_SONGS, song_definition};
use roomba_bridge::report::Topics;
use roomba_bridge::safety::PowerVerdict;

fn make_service(config: BridgeConfig) -> BridgeService {
    let topics = Topics::new(&config.mqtt, &read_mac());
    BridgeService::new(config, topics)
}

struct Rig {
    svc: BridgeService,
    hw: MockHardware,
    link: MockLink,
    ota: MockOta,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    fn with_config(config: BridgeConfig) -> Self {
        Self {
            svc: make_service(config),
            hw: MockHardware::new(),
            link: MockLink::connected(),
            ota: MockOta::default(),
            sink: RecordingSink::new(),
        }
    }

    fn tick_at(&mut self, now: u64) -> PowerVerdict {
        self.hw.now = now;
        self.svc
            .tick(&mut self.hw, &mut self.link, &mut self.ota, &mut self.sink)
    }

    /// Queue a current-only frame and run one tick at `now`.
    fn feed_current(&mut self, now: u64, current_ma: i16) {
        let [hi, lo] = current_ma.to_be_bytes();
        self.hw.frames.push_back(vec![23, hi, lo]);
        self.tick_at(now);
    }

    fn state_topic(&self) -> String {
        self.svc.topics().state.clone()
    }

    fn command_topic(&self) -> String {
        self.svc.topics().command.clone()
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_sends_safe_songs_start_and_stream_request() {
    let mut rig = Rig::new();
    rig.svc.start(&mut rig.hw, &mut rig.sink);

    let mut expected = vec![vec![131]];
    for (slot, notes) in LOCATE_SONGS.iter().enumerate() {
        expected.push(song_definition(slot as u8, notes));
    }
    expected.push(vec![128]);
    expected.push(vec![148, 0]);
    expected.push(vec![148, 6, 19, 21, 22, 23, 25, 26]);
    assert_eq!(rig.hw.writes(), expected);

    let delays: Vec<_> = rig
        .hw
        .calls
        .iter()
        .filter(|c| matches!(c, HwCall::Delay(_)))
        .collect();
    assert_eq!(delays, vec![&HwCall::Delay(100), &HwCall::Delay(100)]);
    assert_eq!(rig.sink.events, vec![AppEvent::Started]);
}

// ── Classification ────────────────────────────────────────────

#[test]
fn discharging_hard_is_cleaning() {
    let mut rig = Rig::new();
    rig.feed_current(1_000, -500);
    let s = rig.svc.state();
    assert!(s.cleaning);
    assert!(!s.docked);
}

#[test]
fn zero_current_is_docked() {
    let mut rig = Rig::new();
    rig.feed_current(1_000, 0);
    let s = rig.svc.state();
    assert!(!s.cleaning);
    assert!(s.docked);
}

#[test]
fn light_discharge_is_idle() {
    let mut rig = Rig::new();
    rig.feed_current(1_000, -200);
    let s = rig.svc.state();
    assert!(!s.cleaning);
    assert!(!s.docked);
}

#[test]
fn frame_with_unknown_id_keeps_previous_state() {
    let mut rig = Rig::new();
    rig.feed_current(1_000, -500);
    let before = *rig.svc.state();

    rig.hw.frames.push_back(vec![22, 0x3E, 0x80, 77, 0, 0]);
    rig.tick_at(2_000);

    assert_eq!(*rig.svc.state(), before);
    assert!(rig.sink.events.contains(&AppEvent::ParseFailed(
        ParseError::UnknownPacketId { id: 77, offset: 3 }
    )));
}

#[test]
fn one_frame_per_tick() {
    let mut rig = Rig::new();
    rig.hw.frames.push_back(vec![23, 0xFE, 0x0C]);
    rig.hw.frames.push_back(vec![23, 0x00, 0x00]);
    rig.tick_at(1_000);
    assert!(rig.svc.state().cleaning);
    rig.tick_at(1_001);
    assert!(rig.svc.state().docked);
    assert_eq!(rig.svc.tick_count(), 2);
}

// ── Status timer ──────────────────────────────────────────────

#[test]
fn fresh_unsent_state_is_published() {
    let mut rig = Rig::new();
    rig.hw.frames.push_back(vec![23, 0xFE, 0x0C, 22, 0x3E, 0x80]);
    rig.tick_at(5_001);
    rig.tick_at(10_001);

    let topic = rig.state_topic();
    let sent = rig.link.sent_to(&topic);
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].retain);
    let v = sent[0].json();
    assert_eq!(v["cleaning"], true);
    assert_eq!(v["current"], -500);
    assert_eq!(v["voltage"], 16_000);
    assert_eq!(v["state"], "cleaning");
    assert!(rig.svc.state().sent);
}

#[test]
fn sent_state_triggers_stream_request_not_republish() {
    let mut rig = Rig::new();
    rig.feed_current(5_001, -500);
    rig.tick_at(10_001);
    rig.hw.clear();

    rig.tick_at(20_002);
    let topic = rig.state_topic();
    assert_eq!(rig.link.sent_to(&topic).len(), 1);
    assert!(rig.hw.requested_stream(&STREAMED_PACKETS));
}

#[test]
fn stale_state_is_re_requested_not_published() {
    let mut rig = Rig::new();
    rig.svc
        .ingest_frame(&[23, 0xFE, 0x0C], 1_000, &mut rig.sink)
        .unwrap();

    rig.tick_at(41_000);

    let topic = rig.state_topic();
    assert!(rig.link.sent_to(&topic).is_empty());
    assert!(rig.hw.requested_stream(&STREAMED_PACKETS));
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::StreamRequested { age_ms: Some(40_000) })
    );
    assert!(!rig.svc.state().sent);
}

#[test]
fn never_parsed_counts_as_stale() {
    let mut rig = Rig::new();
    rig.tick_at(10_001);
    assert!(rig.hw.requested_stream(&STREAMED_PACKETS));
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::StreamRequested { age_ms: None })
    );
}

#[test]
fn status_is_not_marked_sent_while_offline() {
    let mut rig = Rig::new();
    rig.link.connected = false;
    rig.link.reachable = false;
    rig.feed_current(5_001, -500);
    rig.tick_at(10_001);
    assert!(!rig.svc.state().sent);
}

// ── Power guard ───────────────────────────────────────────────

#[test]
fn low_pack_publishes_retained_report_and_sleeps() {
    let mut rig = Rig::new();
    // 617 × 17 = 10 489 mV
    rig.hw.adc = 617;
    let verdict = rig.tick_at(10_001);

    assert_eq!(verdict, PowerVerdict::Sleeping);
    assert_eq!(rig.hw.deep_sleeps(), vec![Duration::from_secs(600)]);

    let topic = rig.state_topic();
    let sent = rig.link.sent_to(&topic);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].retain);
    let v = sent[0].json();
    assert_eq!(v["battery_level"], 0);
    assert!((v["voltage"].as_f64().unwrap() - 10.489).abs() < 1e-3);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::LowBattery { millivolts: 10_489 })
    );
}

#[test]
fn sleep_pauses_briefly_before_deep_sleep() {
    let mut rig = Rig::new();
    rig.hw.adc = 617;
    rig.tick_at(10_001);
    let n = rig.hw.calls.len();
    assert_eq!(rig.hw.calls[n - 2], HwCall::Delay(200));
    assert!(matches!(rig.hw.calls[n - 1], HwCall::DeepSleep(_)));
}

#[test]
fn healthy_pack_does_not_sleep() {
    let mut rig = Rig::new();
    // 647 × 17 = 10 999 mV
    rig.hw.adc = 647;
    assert_eq!(rig.tick_at(10_001), PowerVerdict::Ok);
    assert!(rig.hw.deep_sleeps().is_empty());
}

#[test]
fn disabled_guard_never_sleeps() {
    let mut config = BridgeConfig::default();
    config.battery.enable_sleep = false;
    let mut rig = Rig::with_config(config);
    rig.hw.adc = 100;
    assert_eq!(rig.tick_at(10_001), PowerVerdict::Ok);
    assert!(rig.hw.deep_sleeps().is_empty());
}

#[test]
fn low_pack_without_link_still_sleeps() {
    let mut rig = Rig::new();
    rig.link.connected = false;
    rig.link.reachable = false;
    rig.hw.adc = 617;
    assert_eq!(rig.tick_at(10_001), PowerVerdict::Sleeping);
    assert!(rig.link.sent.is_empty());
}

// ── Reconnect timer ───────────────────────────────────────────

#[test]
fn reconnect_subscribes_and_sends_config() {
    let mut rig = Rig::new();
    rig.link.connected = false;
    rig.tick_at(30_001);

    assert_eq!(rig.link.reconnects, 1);
    assert_eq!(rig.link.subscriptions, vec![rig.command_topic()]);
    let config_topic = rig.svc.topics().config.clone();
    let sent = rig.link.sent_to(&config_topic);
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].retain);
    assert_eq!(sent[0].json()["schema"], "state");
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::LinkReconnect { connected: true })
    );
}

#[test]
fn failed_reconnect_sends_nothing() {
    let mut rig = Rig::new();
    rig.link.connected = false;
    rig.link.reachable = false;
    rig.tick_at(30_001);
    assert!(rig.link.subscriptions.is_empty());
    assert!(rig.link.sent.is_empty());
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::LinkReconnect { connected: false })
    );
}

#[test]
fn config_is_resent_on_every_twentieth_connected_fire() {
    let mut rig = Rig::new();
    let config_topic = rig.svc.topics().config.clone();

    for k in 1..=19u64 {
        rig.tick_at(k * 30_001);
    }
    assert!(rig.link.sent_to(&config_topic).is_empty());
    assert_eq!(rig.svc.resend_count(), 19);

    rig.tick_at(20 * 30_001);
    assert_eq!(rig.link.sent_to(&config_topic).len(), 1);
    assert_eq!(rig.svc.resend_count(), 0);
    assert_eq!(rig.link.reconnects, 0);
    assert_eq!(rig.svc.tick_count(), 20);
}

// ── Wakeup timer ──────────────────────────────────────────────

#[test]
fn wakeup_on_dock_adds_clean_and_dock() {
    let mut rig = Rig::new();
    rig.feed_current(1_000, 0);
    rig.hw.clear();

    rig.tick_at(50_001);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::WakeIssued(WakeVariant::OnDock))
    );
    let bytes = rig.hw.written();
    let start = bytes.iter().position(|b| *b == 128).unwrap();
    assert_eq!(&bytes[start..start + 3], &[128, 135, 143]);
}

#[test]
fn wakeup_while_cleaning_is_plain() {
    let mut rig = Rig::new();
    rig.feed_current(1_000, -500);
    rig.hw.clear();

    rig.tick_at(50_001);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::WakeIssued(WakeVariant::Plain))
    );
    assert_eq!(rig.hw.wake_pulses(), 1);
    assert!(!rig.hw.written().contains(&143));
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn command_message_wakes_and_dispatches() {
    let mut rig = Rig::new();
    let topic = rig.command_topic();
    rig.link.deliver(&topic, "start");
    rig.tick_at(1_000);

    assert_eq!(rig.hw.wake_pulses(), 1);
    assert_eq!(rig.hw.written(), vec![128, 135]);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::CommandHandled(Command::Start))
    );
}

#[test]
fn unknown_command_does_not_wake() {
    let mut rig = Rig::new();
    let topic = rig.command_topic();
    rig.link.deliver(&topic, "dance");
    rig.tick_at(1_000);

    assert_eq!(rig.hw.wake_pulses(), 0);
    assert!(rig.hw.written().is_empty());
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::UnknownCommand("dance".into()))
    );
}

#[test]
fn messages_on_other_topics_are_ignored() {
    let mut rig = Rig::new();
    rig.link.deliver("homeassistant/status", "online");
    rig.tick_at(1_000);
    assert!(rig.hw.calls.is_empty());
}

// ── OTA override ──────────────────────────────────────────────

#[test]
fn ota_pauses_stream_once_and_suspends_everything() {
    let mut rig = Rig::new();
    rig.ota.active = true;
    rig.hw.frames.push_back(vec![23, 0xFE, 0x0C]);
    let topic = rig.command_topic();
    rig.link.deliver(&topic, "start");

    rig.tick_at(1_000);
    assert_eq!(rig.hw.writes(), vec![vec![150, 0]]);
    assert!(rig.svc.ota_active());

    // Every timer would be due by now.
    rig.hw.adc = 100;
    rig.tick_at(100_000);
    rig.tick_at(200_000);

    assert_eq!(rig.hw.writes(), vec![vec![150, 0]]);
    assert_eq!(rig.hw.frames.len(), 1);
    assert!(rig.link.sent.is_empty());
    assert!(rig.hw.deep_sleeps().is_empty());
    assert_eq!(rig.ota.handled, 3);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::OtaStarted), 1);
}

#[test]
fn ota_override_outlives_the_session() {
    let mut rig = Rig::new();
    rig.ota.active = true;
    rig.tick_at(1_000);
    rig.ota.active = false;
    rig.hw.clear();

    rig.tick_at(60_000);
    assert!(rig.hw.calls.is_empty());
    assert!(rig.svc.ota_active());
}
