//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable entity id in the form `<prefix>aabbccddeeff` (full
//! 6-byte MAC, lowercase hex).  This id is:
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - The middle segment of every MQTT topic
//! - The `unique_id` announced in the discovery config

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// The MAC as twelve lowercase hex digits, no separators.
pub fn mac_hex(mac: &MacAddress) -> heapless::String<12> {
    let mut s = heapless::String::new();
    for b in mac {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// `<prefix><mac hex>`, lowercased so ids never differ only by case.
pub fn entity_id(prefix: &str, mac: &MacAddress) -> String {
    let mut id = String::with_capacity(prefix.len() + 12);
    id.push_str(prefix);
    id.push_str(&mac_hex(mac));
    id.to_lowercase()
}

/// Human-facing device name, e.g. `Roomba deadbeefcafe`.
pub fn display_name(mac: &MacAddress) -> String {
    format!("Roomba {}", mac_hex(mac))
}
