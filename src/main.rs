//! Roomba Bridge Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink   NvsAdapter   MqttAdapter  │
//! │  (Oi+Wake+Analog+Clk) (EventSink)    (Config)     (LinkPort)   │
//! │  WifiAdapter          OtaManager + HTTP upload (OtaPort)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            BridgeService (pure logic)                  │    │
//! │  │  Parser · State · Dispatcher · Timers · PowerGuard     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::http::{Headers, Method};
use esp_idf_svc::http::server::{Configuration as HttpConfiguration, EspHttpServer};
use esp_idf_svc::io::{Read, Write};
use log::{error, info, warn};

use roomba_bridge::adapters::device_id;
use roomba_bridge::adapters::hardware::HardwareAdapter;
use roomba_bridge::adapters::log_sink::LogEventSink;
use roomba_bridge::adapters::mqtt::MqttAdapter;
use roomba_bridge::adapters::nvs::NvsAdapter;
use roomba_bridge::adapters::time::Esp32TimeAdapter;
use roomba_bridge::adapters::wifi::WifiAdapter;
use roomba_bridge::app::ports::ConfigPort;
use roomba_bridge::app::service::BridgeService;
use roomba_bridge::config::{BUILD_PROVISIONING, BridgeConfig};
use roomba_bridge::drivers::battery_adc::BatteryAdc;
use roomba_bridge::drivers::oi_uart::OiUart;
use roomba_bridge::drivers::wake_line::{GpioPin, WakeLine};
use roomba_bridge::drivers::{hw_init, watchdog::Watchdog};
use roomba_bridge::ota::{self, OTA_STAGING_BUF_SIZE, OtaError, OtaManager, SharedOta};
use roomba_bridge::pins;
use roomba_bridge::report::Topics;
use roomba_bridge::safety::{PowerGuard, PowerVerdict};

/// Poll interval while the upload handler waits for the loop to flush.
const OTA_FLUSH_WAIT_MS: u32 = 5;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Roomba Bridge v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    ota::check_rollback();

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = load_config();

    // ── 3. Hardware ───────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Without the robot link there is nothing to bridge.
        error!("HAL init failed: {}", e);
        return Err(anyhow!(e));
    }
    let mut hw = HardwareAdapter::new(
        OiUart::new(),
        WakeLine::new(GpioPin::new(pins::BRC_WAKE_GPIO)),
        BatteryAdc::new(pins::BATTERY_ADC_CHANNEL),
        Esp32TimeAdapter::new(),
    );
    let mut sink = LogEventSink::new();

    let mac = device_id::read_mac();
    let topics = Topics::new(&config.mqtt, &mac);
    info!("Device: {} ({})", topics.name(), topics.entity_id());

    // ── 4. Boot power check, before spending energy on WiFi ───
    let guard = PowerGuard::new(&config.battery);
    if guard.enforce::<MqttAdapter>(&mut hw, None, &topics.state, &mut sink)
        == PowerVerdict::Sleeping
    {
        return Ok(());
    }

    // ── 5. Network ────────────────────────────────────────────
    if !config.has_wifi_credentials() {
        error!("No WiFi credentials provisioned; rebuild with ROOMBA_WIFI_SSID set");
        return Err(anyhow!("WiFi credentials not provisioned"));
    }
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop).map_err(|e| anyhow!(e))?;
    wifi.set_hostname(&config.device.hostname)
        .map_err(|e| anyhow!(e))?;
    wifi.set_credentials(&config.device.wifi_ssid, &config.device.wifi_password)
        .map_err(|e| anyhow!(e))?;
    wifi.connect(500, None).map_err(|e| anyhow!(e))?;

    let mut link = MqttAdapter::new(&config.mqtt, topics.entity_id());

    // ── 6. OTA upload endpoint ────────────────────────────────
    let mut ota: SharedOta = Arc::new(Mutex::new(OtaManager::new()));
    let _http = create_ota_server(Arc::clone(&ota))?;

    // ── 7. Service ────────────────────────────────────────────
    let watchdog = Watchdog::new(config.device.watchdog_timeout_ms);
    let mut service = BridgeService::new(config, topics);
    service.start(&mut hw, &mut sink);

    info!("Entering bridge loop");
    loop {
        if service.tick(&mut hw, &mut link, &mut ota, &mut sink) == PowerVerdict::Sleeping {
            // Deep sleep does not return; reaching this means it failed.
            error!("Deep sleep returned, restarting");
            esp_idf_svc::hal::reset::restart();
        }
        watchdog.feed();
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(1);
    }
}

// ── Config ────────────────────────────────────────────────────

/// Stored config (or defaults) with build-time site settings applied.
/// Newly provisioned values are written back so later builds without
/// them keep working.
fn load_config() -> BridgeConfig {
    let nvs = match NvsAdapter::new() {
        Ok(nvs) => Some(nvs),
        Err(e) => {
            warn!("NVS unavailable ({}), config will not persist", e);
            None
        }
    };
    let mut config = match nvs.as_ref().map(|nvs| nvs.load()) {
        Some(Ok(cfg)) => cfg,
        Some(Err(e)) => {
            warn!("Config load failed ({}), running with defaults", e);
            BridgeConfig::default()
        }
        None => BridgeConfig::default(),
    };

    match BUILD_PROVISIONING.apply(&mut config) {
        Ok(false) => {}
        Ok(true) => {
            if let Some(Err(e)) = nvs.as_ref().map(|nvs| nvs.save(&config)) {
                warn!("Provisioned settings not saved: {}", e);
            }
        }
        Err(e) => warn!("Build provisioning rejected: {}", e),
    }
    config
}

// ── OTA over HTTP ─────────────────────────────────────────────
//
// POST /ota with the raw image as the body and its SHA-256 in an
// `X-Sha256` header (64 hex digits).  The handler only stages chunks;
// the bridge loop writes them to flash and reboots when done.

fn create_ota_server(ota: SharedOta) -> Result<EspHttpServer<'static>> {
    let conf = HttpConfiguration {
        stack_size: 10 * 1024,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&conf)?;

    server.fn_handler::<anyhow::Error, _>("/ota", Method::Post, move |mut req| {
        let Some(size) = req.content_len() else {
            req.into_status_response(411)?.write_all(b"Content-Length required")?;
            return Ok(());
        };
        let Some(digest) = req.header("X-Sha256").map(str::to_owned) else {
            req.into_status_response(400)?.write_all(b"X-Sha256 header required")?;
            return Ok(());
        };

        if let Err(e) = lock(&ota).begin_hex(size as u32, &digest) {
            req.into_status_response(400)?.write_all(e.to_string().as_bytes())?;
            return Ok(());
        }

        let mut buf = [0u8; OTA_STAGING_BUF_SIZE];
        let mut offset: u32 = 0;
        loop {
            let n = req.read(&mut buf)?;
            if n == 0 {
                break;
            }
            loop {
                let queued = lock(&ota).queue_chunk(offset, &buf[..n]);
                match queued {
                    Ok(written) => {
                        offset = written;
                        break;
                    }
                    Err(OtaError::Busy) => {
                        esp_idf_svc::hal::delay::FreeRtos::delay_ms(OTA_FLUSH_WAIT_MS)
                    }
                    Err(e) => {
                        lock(&ota).abort();
                        req.into_status_response(400)?.write_all(e.to_string().as_bytes())?;
                        return Ok(());
                    }
                }
            }
        }

        while lock(&ota).has_pending() {
            esp_idf_svc::hal::delay::FreeRtos::delay_ms(OTA_FLUSH_WAIT_MS);
        }

        let result = lock(&ota).finalize();
        match result {
            Ok(()) => {
                req.into_ok_response()?.write_all(b"OK, rebooting")?;
            }
            Err(e) => {
                warn!("OTA upload rejected: {}", e);
                req.into_status_response(500)?.write_all(e.to_string().as_bytes())?;
            }
        }
        Ok(())
    })?;

    info!("OTA endpoint ready at POST /ota");
    Ok(server)
}

fn lock(ota: &SharedOta) -> std::sync::MutexGuard<'_, OtaManager> {
    ota.lock().unwrap_or_else(PoisonError::into_inner)
}
