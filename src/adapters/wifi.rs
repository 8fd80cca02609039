//! WiFi station-mode adapter.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` from `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Connection policy
//!
//! The bridge is useless without the network, so [`WifiAdapter::connect`]
//! blocks and retries every `retry_ms` until the station is up.  Later
//! drops are handled by the ESP-IDF driver's own reconnect and by the
//! MQTT reconnect timer.

use core::fmt;
use log::{info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    InvalidHostname,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 bytes for WPA2, or empty for open)"
            ),
            Self::InvalidHostname => write!(f, "hostname invalid (1-32 bytes)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl core::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    hostname: heapless::String<32>,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: how many upcoming attempts fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> Result<Self, ConnectivityError> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), None).map_err(|e| {
            warn!("EspWifi init failed: {:?}", e);
            ConnectivityError::ConnectionFailed
        })?;
        let wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(|e| {
            warn!("BlockingWifi wrap failed: {:?}", e);
            ConnectivityError::ConnectionFailed
        })?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            hostname: heapless::String::new(),
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            hostname: heapless::String::new(),
            sim_failures: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    pub fn set_hostname(&mut self, hostname: &str) -> Result<(), ConnectivityError> {
        if hostname.is_empty() {
            return Err(ConnectivityError::InvalidHostname);
        }
        self.hostname.clear();
        self.hostname
            .push_str(hostname)
            .map_err(|_| ConnectivityError::InvalidHostname)
    }

    /// Join the configured network, retrying every `retry_ms` until it
    /// succeeds or `max_attempts` (if any) is used up.
    pub fn connect(
        &mut self,
        retry_ms: u32,
        max_attempts: Option<u32>,
    ) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        self.platform_configure()?;
        info!("WiFi: connecting to '{}'", self.ssid);

        let mut attempt = 1;
        loop {
            self.state = WifiState::Connecting { attempt };
            match self.platform_connect() {
                Ok(()) => {
                    self.state = WifiState::Connected;
                    info!("WiFi: connected on attempt {}", attempt);
                    return Ok(());
                }
                Err(e) => {
                    warn!("WiFi: attempt {} failed: {}", attempt, e);
                    if max_attempts.is_some_and(|max| attempt >= max) {
                        self.state = WifiState::Disconnected;
                        return Err(e);
                    }
                }
            }
            attempt += 1;
            self.platform_sleep(retry_ms);
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_configure(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let conf = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        self.wifi.set_configuration(&conf).map_err(|e| {
            warn!("WiFi set_configuration failed: {:?}", e);
            ConnectivityError::ConnectionFailed
        })?;
        if !self.hostname.is_empty() {
            if let Err(e) = self.wifi.wifi_mut().sta_netif_mut().set_hostname(&self.hostname) {
                warn!("WiFi hostname not set: {:?}", e);
            }
        }
        self.wifi.start().map_err(|e| {
            warn!("WiFi start failed: {:?}", e);
            ConnectivityError::ConnectionFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_configure(&mut self) -> Result<(), ConnectivityError> {
        info!("WiFi(sim): configured as '{}'", self.hostname);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let result = self
            .wifi
            .connect()
            .and_then(|()| self.wifi.wait_netif_up());
        if let Err(e) = result {
            warn!("WiFi connect: {:?}", e);
            let _ = self.wifi.disconnect();
            return Err(ConnectivityError::ConnectionFailed);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            return Err(ConnectivityError::ConnectionFailed);
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_sleep(&self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_sleep(&self, _ms: u32) {}

    /// Make the next `n` connection attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures = n;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
