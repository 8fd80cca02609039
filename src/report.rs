//! Outbound payloads and topic layout.
//!
//! Every topic is `<base><entity id><divider><leaf>`, e.g.
//! `homeassistant/vacuum/roombadeadbeefcafe/state`.  Payloads are JSON
//! built from serde structs; the discovery document uses the abbreviated
//! keys Home Assistant expects.

use log::warn;
use serde::Serialize;

use crate::adapters::device_id::{MacAddress, display_name, entity_id};
use crate::config::{DeviceConfig, MqttConfig};
use crate::state::DeviceState;

// ───────────────────────────────────────────────────────────────
// Topics
// ───────────────────────────────────────────────────────────────

/// Resolved topic names for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    entity_id: String,
    name: String,
    /// `<base><entity id>`, the `~` of the discovery document.
    base: String,
    pub command: String,
    pub state: String,
    pub config: String,
    command_leaf: String,
    state_leaf: String,
}

impl Topics {
    pub fn new(mqtt: &MqttConfig, mac: &MacAddress) -> Self {
        let entity_id = entity_id(&mqtt.id_prefix, mac);
        let base = format!("{}{}", mqtt.topic_base, entity_id);
        let topic = |leaf: &str| format!("{}{}{}", base, mqtt.divider, leaf);
        Self {
            command: topic(&mqtt.command_topic),
            state: topic(&mqtt.state_topic),
            config: topic(&mqtt.config_topic),
            name: display_name(mac),
            command_leaf: mqtt.command_topic.clone(),
            state_leaf: mqtt.state_topic.clone(),
            entity_id,
            base,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// ───────────────────────────────────────────────────────────────
// Status
// ───────────────────────────────────────────────────────────────

/// Periodic state report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Omitted until the robot has reported a non-zero capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
    pub cleaning: bool,
    pub docked: bool,
    pub charging: bool,
    /// mV
    pub voltage: u16,
    /// mA
    pub current: i16,
    /// mAh
    pub charge: i16,
    pub state: &'static str,
}

impl From<&DeviceState> for StatusReport {
    fn from(s: &DeviceState) -> Self {
        Self {
            battery_level: s.battery_level(),
            cleaning: s.cleaning,
            docked: s.docked,
            charging: s.charging(),
            voltage: s.voltage,
            current: s.current,
            charge: s.charge,
            state: s.mode().as_str(),
        }
    }
}

/// Snapshot published just before an under-voltage sleep so the
/// controller does not keep showing the robot as busy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowBatteryReport {
    pub battery_level: u8,
    pub cleaning: bool,
    pub docked: bool,
    pub charging: bool,
    /// Volts, as measured by the board's own divider.
    pub voltage: f32,
    pub charge: i16,
}

impl LowBatteryReport {
    pub fn new(millivolts: u32) -> Self {
        Self {
            battery_level: 0,
            cleaning: false,
            docked: false,
            charging: false,
            voltage: millivolts as f32 / 1000.0,
            charge: 0,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Discovery
// ───────────────────────────────────────────────────────────────

/// Features advertised to the controller.
pub const SUPPORTED_FEATURES: [&str; 6] = [
    "start",
    "stop",
    "pause",
    "return_home",
    "locate",
    "clean_spot",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryDevice {
    pub name: String,
    pub ids: [String; 1],
    pub mf: &'static str,
    pub mdl: String,
}

/// Home Assistant MQTT discovery document for a `state`-schema vacuum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryConfig {
    pub name: String,
    pub unique_id: String,
    pub schema: &'static str,
    #[serde(rename = "~")]
    pub base: String,
    pub stat_t: String,
    pub cmd_t: String,
    pub send_cmd_t: String,
    pub json_attr_t: String,
    pub sup_feat: [&'static str; 6],
    pub dev: DiscoveryDevice,
}

impl DiscoveryConfig {
    pub fn new(topics: &Topics, device: &DeviceConfig) -> Self {
        let rel = |leaf: &str| format!("~/{}", leaf);
        Self {
            name: topics.name.clone(),
            unique_id: topics.entity_id.clone(),
            schema: "state",
            base: topics.base.clone(),
            stat_t: rel(&topics.state_leaf),
            cmd_t: rel(&topics.command_leaf),
            send_cmd_t: rel(&topics.command_leaf),
            json_attr_t: rel(&topics.state_leaf),
            sup_feat: SUPPORTED_FEATURES,
            dev: DiscoveryDevice {
                name: topics.name.clone(),
                ids: [topics.entity_id.clone()],
                mf: "iRobot",
                mdl: device.model.clone(),
            },
        }
    }
}

/// Serialise any report to a JSON byte payload.  `None` (logged) means
/// there is nothing worth publishing.
pub fn to_payload<T: Serialize>(report: &T) -> Option<Vec<u8>> {
    serde_json::to_vec(report)
        .map_err(|e| warn!("{} not serialised: {}", core::any::type_name::<T>(), e))
        .ok()
}
