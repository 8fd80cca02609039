//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                  |
//! |-------------|--------------------|------------------------------|
//! | `device_id` | -                  | eFuse factory MAC            |
//! | `hardware`  | OiPort             | Robot UART + stream decoder  |
//! |             | WakeLinePort       | BRC GPIO (open drain)        |
//! |             | AnalogPort         | Battery divider on ADC1      |
//! |             | ClockPort          | ESP32 system timer           |
//! | `log_sink`  | EventSink          | Serial log output            |
//! | `mqtt`      | LinkPort           | ESP-IDF MQTT client          |
//! | `nvs`       | ConfigPort         | NVS / in-memory store        |
//! | `time`      | ClockPort          | ESP32 system timer           |
//! | `wifi`      | -                  | ESP-IDF WiFi STA             |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
