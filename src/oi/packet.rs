//! Sensor packet table.
//!
//! Every packet id the bridge understands is a variant of [`SensorPacket`]
//! with a fixed payload width.  Supporting a new id means adding a variant
//! here and a decode arm in [`SensorPacket::decode`].

/// Known sensor packet ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SensorPacket {
    /// Legacy group of packets 7–26 (26 payload bytes, not interpreted).
    Group7To26 = 0,
    /// Legacy group of packets 7–16 (10 payload bytes, not interpreted).
    Group7To16 = 1,
    BumpsAndWheelDrops = 7,
    VirtualWall = 13,
    /// Distance travelled since last read, mm, signed.
    Distance = 19,
    ChargingState = 21,
    /// Pack voltage, mV, unsigned.
    Voltage = 22,
    /// Pack current, mA, signed (negative = discharging).
    Current = 23,
    /// Remaining charge, mAh.  Documented unsigned, but the robot has been
    /// seen to underflow it, so it is decoded signed.
    BatteryCharge = 25,
    /// Estimated capacity, mAh, unsigned.
    BatteryCapacity = 26,
    /// Undocumented id some firmware revisions interleave in the stream.
    Vendor128 = 128,
}

/// The packets the bridge subscribes to.
pub const STREAMED_PACKETS: [SensorPacket; 6] = [
    SensorPacket::Distance,
    SensorPacket::ChargingState,
    SensorPacket::Voltage,
    SensorPacket::Current,
    SensorPacket::BatteryCharge,
    SensorPacket::BatteryCapacity,
];

/// One decoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Distance(i16),
    ChargingState(ChargingState),
    Voltage(u16),
    Current(i16),
    BatteryCharge(i16),
    BatteryCapacity(u16),
    /// A packet that is walked over but carries nothing the bridge uses.
    Skipped(SensorPacket),
}

impl SensorPacket {
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::Group7To26,
            1 => Self::Group7To16,
            7 => Self::BumpsAndWheelDrops,
            13 => Self::VirtualWall,
            19 => Self::Distance,
            21 => Self::ChargingState,
            22 => Self::Voltage,
            23 => Self::Current,
            25 => Self::BatteryCharge,
            26 => Self::BatteryCapacity,
            128 => Self::Vendor128,
            _ => return None,
        })
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Payload bytes following the id byte.
    pub const fn width(self) -> usize {
        match self {
            Self::Group7To26 => 26,
            Self::Group7To16 => 10,
            Self::BumpsAndWheelDrops
            | Self::VirtualWall
            | Self::ChargingState
            | Self::Vendor128 => 1,
            Self::Distance
            | Self::Voltage
            | Self::Current
            | Self::BatteryCharge
            | Self::BatteryCapacity => 2,
        }
    }

    /// Decode `payload`, which must be exactly [`width`](Self::width) bytes.
    pub fn decode(self, payload: &[u8]) -> Reading {
        debug_assert_eq!(payload.len(), self.width());
        let be_u16 = || u16::from_be_bytes([payload[0], payload[1]]);
        let be_i16 = || i16::from_be_bytes([payload[0], payload[1]]);
        match self {
            Self::Distance => Reading::Distance(be_i16()),
            Self::ChargingState => Reading::ChargingState(ChargingState::from(payload[0])),
            Self::Voltage => Reading::Voltage(be_u16()),
            Self::Current => Reading::Current(be_i16()),
            Self::BatteryCharge => Reading::BatteryCharge(be_i16()),
            Self::BatteryCapacity => Reading::BatteryCapacity(be_u16()),
            other => Reading::Skipped(other),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Charging state
// ───────────────────────────────────────────────────────────────

/// Charging state code (packet 21).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargingState {
    #[default]
    NotCharging,
    ReconditioningCharging,
    FullCharging,
    TrickleCharging,
    Waiting,
    ChargingFault,
    /// A code outside 0–5; kept rather than failing the frame.
    Unknown(u8),
}

impl ChargingState {
    /// True for the three states in which current flows into the pack.
    pub fn is_charging(self) -> bool {
        matches!(
            self,
            Self::ReconditioningCharging | Self::FullCharging | Self::TrickleCharging
        )
    }

    pub fn code(self) -> u8 {
        match self {
            Self::NotCharging => 0,
            Self::ReconditioningCharging => 1,
            Self::FullCharging => 2,
            Self::TrickleCharging => 3,
            Self::Waiting => 4,
            Self::ChargingFault => 5,
            Self::Unknown(c) => c,
        }
    }
}

impl From<u8> for ChargingState {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::NotCharging,
            1 => Self::ReconditioningCharging,
            2 => Self::FullCharging,
            3 => Self::TrickleCharging,
            4 => Self::Waiting,
            5 => Self::ChargingFault,
            c => Self::Unknown(c),
        }
    }
}
