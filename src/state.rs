//! Device state snapshot.
//!
//! [`DeviceState`] is the one long-lived record of what the robot last
//! reported.  It is replaced wholesale by [`DeviceState::derive`] after a
//! successful parse and never touched after a failed one, so readers always
//! see a consistent set of fields from a single frame.

use crate::config::ThresholdConfig;
use crate::oi::{ChargingState, SensorReadings};

/// Operating mode reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Docked,
    Cleaning,
    Idle,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Docked => "docked",
            Self::Cleaning => "cleaning",
            Self::Idle => "idle",
        }
    }
}

/// Last known robot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceState {
    /// Millimetres since the previous reading.
    pub distance: i16,
    pub charging_state: ChargingState,
    /// Pack voltage (mV).
    pub voltage: u16,
    /// Pack current (mA); negative while discharging.
    pub current: i16,
    /// Remaining charge (mAh).
    pub charge: i16,
    /// Estimated capacity (mAh).
    pub capacity: u16,
    pub cleaning: bool,
    pub docked: bool,
    /// Monotonic time (ms) of the parse that produced this snapshot.
    /// `None` until the first frame arrives.
    pub timestamp: Option<u64>,
    /// Already published upstream.
    pub sent: bool,
}

impl DeviceState {
    /// Build the next snapshot from freshly parsed readings.
    ///
    /// `cleaning` and `docked` are derived from current alone and start
    /// from false every time, so a robot that leaves the dock does not keep
    /// a stale `docked` flag.
    pub fn derive(readings: &SensorReadings, now_ms: u64, thresholds: &ThresholdConfig) -> Self {
        Self {
            distance: readings.distance,
            charging_state: readings.charging_state,
            voltage: readings.voltage,
            current: readings.current,
            charge: readings.charge,
            capacity: readings.capacity,
            cleaning: readings.current < thresholds.cleaning_current_ma,
            docked: readings.current > thresholds.docked_current_ma,
            timestamp: Some(now_ms),
            sent: false,
        }
    }

    /// Current is flowing into the pack.
    pub fn charging(&self) -> bool {
        self.charging_state.is_charging()
    }

    /// Remaining charge as a whole percentage of capacity.
    pub fn battery_level(&self) -> Option<u8> {
        if self.capacity == 0 {
            return None;
        }
        let pct = i32::from(self.charge) * 100 / i32::from(self.capacity);
        Some(pct.clamp(0, 100) as u8)
    }

    /// Docked wins over cleaning; neither is idle.
    pub fn mode(&self) -> Mode {
        if self.docked {
            Mode::Docked
        } else if self.cleaning {
            Mode::Cleaning
        } else {
            Mode::Idle
        }
    }

    /// Milliseconds since the snapshot was taken, `None` if never parsed.
    pub fn age_ms(&self, now_ms: u64) -> Option<u64> {
        self.timestamp.map(|t| now_ms.saturating_sub(t))
    }

    /// Older than `max_age_ms`, or never received.
    pub fn is_stale(&self, now_ms: u64, max_age_ms: u64) -> bool {
        self.age_ms(now_ms).is_none_or(|age| age > max_age_ms)
    }
}
