//! Bridge configuration parameters
//!
//! All tunable parameters for the Roomba bridge.  Defaults reproduce the
//! firmware constants; values can be overridden via NVS.
//!
//! Site credentials (WiFi, broker) have no sensible default.  They are
//! baked in at build time through [`BUILD_PROVISIONING`]:
//!
//! ```text
//! ROOMBA_WIFI_SSID=home ROOMBA_WIFI_PASSWORD=secret123 \
//! ROOMBA_MQTT_SERVER=10.0.0.2 cargo build --release --features espidf
//! ```
//!
//! and written to NVS on the first boot that sees them.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    pub timing: TimingConfig,
    pub thresholds: ThresholdConfig,
    pub battery: BatteryConfig,
    pub wake: WakeConfig,
    pub mqtt: MqttConfig,
    pub device: DeviceConfig,
}

/// Scheduler cadences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Link reconnect / config resend check period (ms)
    pub reconnect_interval_ms: u64,
    /// Number of connected reconnect firings between config resends
    pub config_resend_every: u32,
    /// Hardware wake pulse period (ms)
    pub wakeup_interval_ms: u64,
    /// Status publication period (ms)
    pub status_interval_ms: u64,
    /// Snapshot age beyond which it is considered stale (ms)
    pub stale_after_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: 30_000,
            config_resend_every: 20,
            wakeup_interval_ms: 50_000,
            status_interval_ms: 10_000,
            stale_after_ms: 30_000,
        }
    }
}

/// Current thresholds used to classify the operating mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Below this current (mA) the robot is cleaning
    pub cleaning_current_ma: i16,
    /// Above this current (mA) the robot is on the dock
    pub docked_current_ma: i16,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cleaning_current_ma: -400,
            docked_current_ma: -50,
        }
    }
}

/// Battery under-voltage cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// Whether the under-voltage sleep is armed at all
    pub enable_sleep: bool,
    /// Number of ADC samples averaged per check
    pub adc_samples: u8,
    /// Millivolts per averaged ADC count (resistor divider ratio)
    pub adc_mv_per_count: f32,
    /// Cutoff: 0.9 V/cell × 12 NiMH cells
    pub low_voltage_mv: u32,
    /// Deep-sleep duration after a cutoff (seconds)
    pub sleep_secs: u32,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            enable_sleep: true,
            adc_samples: 10,
            adc_mv_per_count: 17.0,
            low_voltage_mv: 10_800,
            sleep_secs: 600,
        }
    }
}

/// Wake-line and dock-wake timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeConfig {
    /// How long the wake line is held low (ms)
    pub pulse_low_ms: u32,
    /// Settle time after releasing the line, before the start byte (ms)
    pub settle_ms: u32,
    /// Send the extra clean+dock pair when waking on the dock
    pub dock_sleep_fix: bool,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            pulse_low_ms: 200,
            settle_ms: 200,
            dock_sleep_fix: true,
        }
    }
}

/// Broker and topic layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub server: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Prefix for every topic, e.g. `homeassistant/vacuum/`
    pub topic_base: String,
    /// Prepended to the MAC to form the entity id
    pub id_prefix: String,
    /// Separator between entity id and topic leaf
    pub divider: String,
    pub command_topic: String,
    pub state_topic: String,
    pub config_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            server: "mqtt.local".into(),
            port: 1883,
            user: None,
            password: None,
            topic_base: "homeassistant/vacuum/".into(),
            id_prefix: "roomba".into(),
            divider: "/".into(),
            command_topic: "command".into(),
            state_topic: "state".into(),
            config_topic: "config".into(),
        }
    }
}

/// Identity and network bring-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub hostname: String,
    pub model: String,
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// Task watchdog timeout; must exceed the locate melody sequence
    pub watchdog_timeout_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hostname: "roomba".into(),
            model: "650".into(),
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            watchdog_timeout_ms: 30_000,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Build-time provisioning
// ═══════════════════════════════════════════════════════════════

/// Site settings supplied outside the config blob.  Unset fields leave the
/// config untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Provisioning<'a> {
    pub wifi_ssid: Option<&'a str>,
    pub wifi_password: Option<&'a str>,
    pub mqtt_server: Option<&'a str>,
    pub mqtt_port: Option<&'a str>,
    pub mqtt_user: Option<&'a str>,
    pub mqtt_password: Option<&'a str>,
}

/// `ROOMBA_*` environment variables captured when the firmware was built.
pub const BUILD_PROVISIONING: Provisioning<'static> = Provisioning {
    wifi_ssid: option_env!("ROOMBA_WIFI_SSID"),
    wifi_password: option_env!("ROOMBA_WIFI_PASSWORD"),
    mqtt_server: option_env!("ROOMBA_MQTT_SERVER"),
    mqtt_port: option_env!("ROOMBA_MQTT_PORT"),
    mqtt_user: option_env!("ROOMBA_MQTT_USER"),
    mqtt_password: option_env!("ROOMBA_MQTT_PASSWORD"),
};

impl Provisioning<'_> {
    /// Copy every set field into `config`.  Returns whether anything
    /// changed, so the caller knows to persist it.
    pub fn apply(&self, config: &mut BridgeConfig) -> Result<bool, ConfigError> {
        let before = config.clone();

        if let Some(port) = self.mqtt_port {
            config.mqtt.port = port
                .parse()
                .map_err(|_| ConfigError::ValidationFailed("mqtt port must be 1–65535"))?;
        }
        if let Some(ssid) = self.wifi_ssid {
            config.device.wifi_ssid = ssid.to_owned();
        }
        if let Some(password) = self.wifi_password {
            config.device.wifi_password = password.to_owned();
        }
        if let Some(server) = self.mqtt_server {
            config.mqtt.server = server.to_owned();
        }
        if let Some(user) = self.mqtt_user {
            config.mqtt.user = Some(user.to_owned()).filter(|u| !u.is_empty());
        }
        if let Some(password) = self.mqtt_password {
            config.mqtt.password = Some(password.to_owned()).filter(|p| !p.is_empty());
        }

        Ok(*config != before)
    }
}

impl BridgeConfig {
    /// WiFi credentials have been provisioned.
    pub fn has_wifi_credentials(&self) -> bool {
        !self.device.wifi_ssid.is_empty()
    }

    /// Range-check every field that could put the robot or its battery at
    /// risk.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if !(1_000..=600_000).contains(&t.reconnect_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "reconnect_interval_ms must be 1000–600000",
            ));
        }
        if t.config_resend_every == 0 {
            return Err(ConfigError::ValidationFailed(
                "config_resend_every must be at least 1",
            ));
        }
        if !(1_000..=600_000).contains(&t.wakeup_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "wakeup_interval_ms must be 1000–600000",
            ));
        }
        if !(1_000..=600_000).contains(&t.status_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "status_interval_ms must be 1000–600000",
            ));
        }
        if t.stale_after_ms < t.status_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "stale_after_ms must be >= status_interval_ms",
            ));
        }

        let th = &self.thresholds;
        if th.cleaning_current_ma >= th.docked_current_ma {
            return Err(ConfigError::ValidationFailed(
                "cleaning_current_ma must be below docked_current_ma",
            ));
        }

        let b = &self.battery;
        if b.adc_samples == 0 {
            return Err(ConfigError::ValidationFailed("adc_samples must be 1–255"));
        }
        if !(b.adc_mv_per_count > 0.0 && b.adc_mv_per_count.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "adc_mv_per_count must be positive",
            ));
        }
        if !(6_000..=16_000).contains(&b.low_voltage_mv) {
            return Err(ConfigError::ValidationFailed(
                "low_voltage_mv must be 6000–16000",
            ));
        }
        if !(10..=86_400).contains(&b.sleep_secs) {
            return Err(ConfigError::ValidationFailed("sleep_secs must be 10–86400"));
        }

        let w = &self.wake;
        if !(10..=2_000).contains(&w.pulse_low_ms) || w.settle_ms > 2_000 {
            return Err(ConfigError::ValidationFailed(
                "wake pulse must be 10–2000 ms and settle at most 2000 ms",
            ));
        }

        if self.mqtt.server.is_empty() || self.mqtt.port == 0 {
            return Err(ConfigError::ValidationFailed(
                "mqtt server must be set and port non-zero",
            ));
        }
        if self.mqtt.topic_base.is_empty() || self.mqtt.command_topic.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "topic_base and command_topic must be non-empty",
            ));
        }
        if self.device.watchdog_timeout_ms < 15_000 {
            return Err(ConfigError::ValidationFailed(
                "watchdog_timeout_ms must cover the locate sequence (>= 15000)",
            ));
        }
        Ok(())
    }
}
