//! Site provisioning: build-time settings must produce a config the
//! network adapters accept, and must survive a reboot through NVS.

use roomba_bridge::adapters::mqtt::MqttAdapter;
use roomba_bridge::adapters::nvs::NvsAdapter;
use roomba_bridge::adapters::wifi::{ConnectivityError, WifiAdapter};
use roomba_bridge::app::ports::ConfigPort;
use roomba_bridge::config::{BridgeConfig, Provisioning};

fn site() -> Provisioning<'static> {
    Provisioning {
        wifi_ssid: Some("HomeWiFi"),
        wifi_password: Some("mysecret8"),
        mqtt_server: Some("broker.lan"),
        mqtt_port: Some("1884"),
        mqtt_user: Some("roomba"),
        mqtt_password: Some("hunter22"),
    }
}

#[test]
fn unprovisioned_defaults_are_detected_before_wifi() {
    let config = BridgeConfig::default();
    assert!(!config.has_wifi_credentials());
    assert_eq!(
        WifiAdapter::new().set_credentials(&config.device.wifi_ssid, &config.device.wifi_password),
        Err(ConnectivityError::InvalidSsid)
    );
}

#[test]
fn provisioned_config_is_accepted_by_wifi() {
    let mut config = BridgeConfig::default();
    assert!(site().apply(&mut config).unwrap());
    assert!(config.has_wifi_credentials());

    let mut wifi = WifiAdapter::new();
    assert!(
        wifi.set_credentials(&config.device.wifi_ssid, &config.device.wifi_password)
            .is_ok()
    );
    assert!(wifi.set_hostname(&config.device.hostname).is_ok());
}

#[test]
fn provisioned_broker_reaches_mqtt_adapter() {
    let mut config = BridgeConfig::default();
    site().apply(&mut config).unwrap();

    let mqtt = MqttAdapter::new(&config.mqtt, "roombadeadbeefcafe");
    assert_eq!(mqtt.url(), "mqtt://broker.lan:1884");
    assert!(mqtt.has_credentials());
}

#[test]
fn provisioned_config_survives_reboot() {
    let nvs = NvsAdapter::new().unwrap();
    let mut config = nvs.load().unwrap();
    assert!(site().apply(&mut config).unwrap());
    nvs.save(&config).unwrap();

    // Next boot: a build without provisioning keeps the stored settings.
    let mut reloaded = nvs.load().unwrap();
    assert!(!Provisioning::default().apply(&mut reloaded).unwrap());
    assert_eq!(reloaded, config);
    assert!(reloaded.has_wifi_credentials());
}
