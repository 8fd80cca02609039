//! End-to-end tests over the simulation backends of the real adapters:
//! UART bytes in, MQTT payloads out, OTA chunks flushed by the loop.
//!
//! Uses the host clock, so timer periods are shrunk to a millisecond.

use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use roomba_bridge::adapters::device_id::read_mac;
use roomba_bridge::adapters::hardware::HardwareAdapter;
use roomba_bridge::adapters::log_sink::LogEventSink;
use roomba_bridge::adapters::mqtt::MqttAdapter;
use roomba_bridge::adapters::time::Esp32TimeAdapter;
use roomba_bridge::app::service::BridgeService;
use roomba_bridge::config::BridgeConfig;
use roomba_bridge::drivers::battery_adc::BatteryAdc;
use roomba_bridge::drivers::oi_uart::OiUart;
use roomba_bridge::drivers::wake_line::{GpioPin, WakeLine};
use roomba_bridge::oi::encode_frame;
use roomba_bridge::ota::{OtaManager, SharedOta};
use roomba_bridge::pins;
use roomba_bridge::report::Topics;

fn fast_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.timing.reconnect_interval_ms = 1;
    config.timing.status_interval_ms = 1;
    config.timing.wakeup_interval_ms = 3_600_000;
    config
}

fn hardware() -> HardwareAdapter<GpioPin> {
    HardwareAdapter::new(
        OiUart::new(),
        WakeLine::new(GpioPin::new(pins::BRC_WAKE_GPIO)),
        BatteryAdc::new(pins::BATTERY_ADC_CHANNEL),
        Esp32TimeAdapter::new(),
    )
}

#[test]
fn uart_frame_reaches_mqtt_state_topic() {
    let config = fast_config();
    let topics = Topics::new(&config.mqtt, &read_mac());
    let mut link = MqttAdapter::new(&config.mqtt, topics.entity_id());
    let mut svc = BridgeService::new(config, topics);
    let mut hw = hardware();
    let mut ota: SharedOta = Arc::new(Mutex::new(OtaManager::new()));
    let mut sink = LogEventSink::new();

    svc.start(&mut hw, &mut sink);
    assert_eq!(hw.uart_mut().sim_take_tx()[0], 131);

    let frame = encode_frame(&[23, 0xFE, 0x0C, 22, 0x3E, 0x80]).unwrap();
    hw.uart_mut().sim_inject(&frame);

    // Connects, announces itself and ingests the frame.
    svc.tick(&mut hw, &mut link, &mut ota, &mut sink);
    assert!(link.sim_subscriptions().contains(&svc.topics().command));
    assert!(svc.state().cleaning);

    sleep(Duration::from_millis(5));
    svc.tick(&mut hw, &mut link, &mut ota, &mut sink);

    let state_topic = svc.topics().state.clone();
    let status = link
        .sim_published()
        .iter()
        .find(|p| p.topic == state_topic)
        .expect("status published");
    let v: serde_json::Value = serde_json::from_slice(&status.payload).unwrap();
    assert_eq!(v["state"], "cleaning");
    assert_eq!(v["voltage"], 16_000);
    assert!(!status.retain);
}

#[test]
fn mqtt_command_is_written_to_uart() {
    let config = fast_config();
    let topics = Topics::new(&config.mqtt, &read_mac());
    let mut link = MqttAdapter::new(&config.mqtt, topics.entity_id());
    let mut svc = BridgeService::new(config, topics);
    let mut hw = hardware();
    let mut ota: SharedOta = Arc::new(Mutex::new(OtaManager::new()));
    let mut sink = LogEventSink::new();

    sleep(Duration::from_millis(2));
    svc.tick(&mut hw, &mut link, &mut ota, &mut sink);
    hw.uart_mut().sim_take_tx();

    let command_topic = svc.topics().command.clone();
    link.sim_deliver(&command_topic, b"return_to_base");
    svc.tick(&mut hw, &mut link, &mut ota, &mut sink);

    let tx = hw.uart_mut().sim_take_tx();
    let start = tx.iter().position(|b| *b == 128).expect("start byte");
    assert_eq!(tx[start + 1], 143);
}

#[test]
fn ota_session_suspends_bridge_and_flushes_chunks() {
    let config = fast_config();
    let topics = Topics::new(&config.mqtt, &read_mac());
    let mut link = MqttAdapter::new(&config.mqtt, topics.entity_id());
    let mut svc = BridgeService::new(config, topics);
    let mut hw = hardware();
    let mut ota: SharedOta = Arc::new(Mutex::new(OtaManager::new()));
    let mut sink = LogEventSink::new();

    let image = b"firmware";
    {
        let mut mgr = ota.lock().unwrap();
        mgr.begin(image.len() as u32, &hmac_sha256::Hash::hash(image))
            .unwrap();
        mgr.queue_chunk(0, image).unwrap();
    }

    sleep(Duration::from_millis(2));
    svc.tick(&mut hw, &mut link, &mut ota, &mut sink);

    assert!(svc.ota_active());
    assert_eq!(hw.uart_mut().sim_take_tx(), vec![150, 0]);
    assert!(!ota.lock().unwrap().has_pending());
    assert!(ota.lock().unwrap().finalize().is_ok());
    assert!(link.sim_published().is_empty());
}

#[test]
fn commands_survive_background_session_drop() {
    let config = fast_config();
    let topics = Topics::new(&config.mqtt, &read_mac());
    let mut link = MqttAdapter::new(&config.mqtt, topics.entity_id());
    let mut svc = BridgeService::new(config, topics);
    let mut hw = hardware();
    let mut ota: SharedOta = Arc::new(Mutex::new(OtaManager::new()));
    let mut sink = LogEventSink::new();

    sleep(Duration::from_millis(2));
    svc.tick(&mut hw, &mut link, &mut ota, &mut sink);
    let command_topic = svc.topics().command.clone();
    assert!(link.sim_subscriptions().contains(&command_topic));

    // The client drops and comes back on its own between reconnect fires.
    link.sim_disconnect();
    link.sim_auto_reconnect();
    sleep(Duration::from_millis(2));
    svc.tick(&mut hw, &mut link, &mut ota, &mut sink);
    assert!(link.sim_subscriptions().contains(&command_topic));
    hw.uart_mut().sim_take_tx();

    link.sim_deliver(&command_topic, b"start");
    svc.tick(&mut hw, &mut link, &mut ota, &mut sink);

    let tx = hw.uart_mut().sim_take_tx();
    let start = tx.iter().position(|b| *b == 128).expect("start byte");
    assert_eq!(tx[start + 1], 135);
}
