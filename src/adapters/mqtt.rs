//! MQTT adapter.
//!
//! Implements [`LinkPort`] for the bridge.
//!
//! - **`target_os = "espidf"`**: `EspMqttClient`.  A receiver thread owns
//!   the connection, tracks the connected flag and queues inbound
//!   messages for the loop to drain.  The client reconnects on its own;
//!   [`LinkPort::reconnect`] only creates it once and waits briefly for
//!   the session.
//!
//! Sessions are clean, so the broker forgets subscriptions on every drop.
//! The adapter remembers each subscribed topic and renews them all on the
//! first [`LinkPort::poll`] after a fresh session, whoever reconnected.
//! - **`not(target_os = "espidf")`**: in-memory broker stand-in for host
//!   tests and simulation.

use log::{info, warn};

use crate::app::ports::{InboundMessage, LinkPort};
use crate::config::MqttConfig;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex, PoisonError};
#[cfg(target_os = "espidf")]
use std::{thread, time::Duration};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

/// Inbound payloads above this are dropped.  Commands are single words.
#[cfg(target_os = "espidf")]
const MAX_PAYLOAD_BYTES: usize = 256;

/// How long `reconnect` waits for the broker session.
#[cfg(target_os = "espidf")]
const CONNECT_WAIT_MS: u64 = 2_000;

/// A message the simulated broker accepted.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

pub struct MqttAdapter {
    url: String,
    client_id: String,
    user: Option<String>,
    password: Option<String>,
    /// Topics to renew after a session drop.
    topics: Vec<String>,

    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    connected: Arc<AtomicBool>,
    /// Set by the receiver on every `Connected` event.
    #[cfg(target_os = "espidf")]
    resubscribe: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    inbox: Arc<Mutex<Vec<InboundMessage>>>,

    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimBroker {
    reachable: bool,
    connected: bool,
    subscriptions: Vec<String>,
    published: Vec<Published>,
    inbox: VecDeque<InboundMessage>,
    fresh_session: bool,
}

impl MqttAdapter {
    pub fn new(config: &MqttConfig, client_id: &str) -> Self {
        let url = format!("mqtt://{}:{}", config.server, config.port);
        info!("MqttAdapter: broker {} as {}", url, client_id);
        Self {
            url,
            client_id: client_id.to_owned(),
            user: config.user.clone(),
            password: config.password.clone(),
            topics: Vec::new(),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            connected: Arc::new(AtomicBool::new(false)),
            #[cfg(target_os = "espidf")]
            resubscribe: Arc::new(AtomicBool::new(false)),
            #[cfg(target_os = "espidf")]
            inbox: Arc::new(Mutex::new(Vec::new())),
            #[cfg(not(target_os = "espidf"))]
            sim: SimBroker {
                reachable: true,
                ..SimBroker::default()
            },
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn has_credentials(&self) -> bool {
        self.user.is_some() || self.password.is_some()
    }

    /// Topics renewed on every new session.
    pub fn subscribed_topics(&self) -> &[String] {
        &self.topics
    }

    fn remember(&mut self, topic: &str) {
        if !self.topics.iter().any(|t| t == topic) {
            self.topics.push(topic.to_owned());
        }
    }

    /// Re-issue every remembered subscription after a fresh session.
    fn renew_subscriptions(&mut self) {
        for topic in self.topics.clone() {
            if let Err(e) = self.broker_subscribe(&topic) {
                warn!("MQTT re-subscribe to {} failed: {}", topic, e);
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn create_client(&mut self) -> Result<(), CommsError> {
        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            username: self.user.as_deref(),
            password: self.password.as_deref(),
            ..Default::default()
        };
        let (client, conn) = EspMqttClient::new(self.url.as_str(), &conf).map_err(|e| {
            warn!("MQTT client create failed: {:?}", e);
            CommsError::MqttDisconnected
        })?;
        self.spawn_receiver(conn)?;
        self.client = Some(client);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn spawn_receiver(&self, mut conn: EspMqttConnection) -> Result<(), CommsError> {
        let connected = Arc::clone(&self.connected);
        let resubscribe = Arc::clone(&self.resubscribe);
        let inbox = Arc::clone(&self.inbox);
        thread::Builder::new()
            .name("mqtt-rx".into())
            .stack_size(6 * 1024)
            .spawn(move || {
                while let Ok(event) = conn.next() {
                    match event.payload() {
                        EventPayload::Connected(_) => {
                            info!("MQTT connected");
                            connected.store(true, Ordering::Relaxed);
                            resubscribe.store(true, Ordering::Relaxed);
                        }
                        EventPayload::Disconnected => {
                            warn!("MQTT disconnected");
                            connected.store(false, Ordering::Relaxed);
                        }
                        EventPayload::Received {
                            topic: Some(topic),
                            data,
                            details,
                            ..
                        } => {
                            if !matches!(details, Details::Complete) {
                                continue;
                            }
                            if data.len() > MAX_PAYLOAD_BYTES {
                                warn!("Dropping {} B payload on {}", data.len(), topic);
                                continue;
                            }
                            inbox
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push(InboundMessage {
                                    topic: topic.to_owned(),
                                    payload: data.to_vec(),
                                });
                        }
                        _ => {}
                    }
                }
                connected.store(false, Ordering::Relaxed);
                warn!("MQTT connection closed");
            })
            .map(|_| ())
            .map_err(|e| {
                warn!("mqtt-rx spawn failed: {}", e);
                CommsError::MqttDisconnected
            })
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Whether the next `reconnect` succeeds.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_reachable(&mut self, reachable: bool) {
        self.sim.reachable = reachable;
    }

    /// Drop the current session.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_disconnect(&mut self) {
        self.sim.connected = false;
        self.sim.subscriptions.clear();
    }

    /// The client's own background reconnect, as `EspMqttClient` does it
    /// without anyone calling [`LinkPort::reconnect`].
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_auto_reconnect(&mut self) {
        if self.sim.reachable && !self.sim.connected {
            self.sim.connected = true;
            self.sim.fresh_session = true;
        }
    }

    /// Deliver a message if something is subscribed to `topic`.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_deliver(&mut self, topic: &str, payload: &[u8]) {
        if self.sim.connected && self.sim.subscriptions.iter().any(|t| t == topic) {
            self.sim.inbox.push_back(InboundMessage {
                topic: topic.to_owned(),
                payload: payload.to_vec(),
            });
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[Published] {
        &self.sim.published
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_subscriptions(&self) -> &[String] {
        &self.sim.subscriptions
    }
}

// ── Broker subscribe ──────────────────────────────────────────

impl MqttAdapter {
    #[cfg(target_os = "espidf")]
    fn broker_subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::MqttDisconnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| info!("MQTT subscribed to {}", topic))
            .map_err(|e| {
                warn!("MQTT subscribe to {} failed: {:?}", topic, e);
                CommsError::MqttSubscribeFailed
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn broker_subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if !self.sim.connected {
            return Err(CommsError::MqttSubscribeFailed);
        }
        if !self.sim.subscriptions.iter().any(|t| t == topic) {
            self.sim.subscriptions.push(topic.to_owned());
        }
        Ok(())
    }
}

// ── LinkPort implementation ───────────────────────────────────

#[cfg(target_os = "espidf")]
impl LinkPort for MqttAdapter {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn reconnect(&mut self) -> bool {
        if self.client.is_none() {
            if let Err(e) = self.create_client() {
                warn!("MQTT reconnect: {}", e);
                return false;
            }
        }
        let mut waited = 0;
        while !self.is_connected() && waited < CONNECT_WAIT_MS {
            thread::sleep(Duration::from_millis(50));
            waited += 50;
        }
        self.is_connected()
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(CommsError::MqttDisconnected);
        }
        let client = self.client.as_mut().ok_or(CommsError::MqttDisconnected)?;
        client
            .publish(topic, QoS::AtMostOnce, retain, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT publish to {} failed: {:?}", topic, e);
                CommsError::MqttPublishFailed
            })
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.remember(topic);
        self.broker_subscribe(topic)
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        if self.resubscribe.swap(false, Ordering::Relaxed) {
            self.renew_subscriptions();
        }
        core::mem::take(&mut *self.inbox.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(not(target_os = "espidf"))]
impl LinkPort for MqttAdapter {
    fn is_connected(&self) -> bool {
        self.sim.connected
    }

    fn reconnect(&mut self) -> bool {
        let was_connected = self.sim.connected;
        self.sim.connected = self.sim.reachable;
        if !self.sim.connected {
            warn!("[SIM] MQTT broker unreachable");
        } else if !was_connected {
            self.sim.fresh_session = true;
        }
        self.sim.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError> {
        if !self.sim.connected {
            return Err(CommsError::MqttDisconnected);
        }
        self.sim.published.push(Published {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.remember(topic);
        self.broker_subscribe(topic)
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        if core::mem::take(&mut self.sim.fresh_session) {
            self.renew_subscriptions();
        }
        self.sim.inbox.drain(..).collect()
    }
}
