//! Sensor-stream payload parser.
//!
//! A payload is a run of `[id][payload…]` records.  The parser walks it
//! from offset 0 and succeeds only if every id is known and the walk lands
//! exactly on the end of the buffer.  There is no partial result: an
//! unknown id has an unknown width, so nothing after it can be trusted.

use crate::error::ParseError;

use super::packet::{ChargingState, Reading, SensorPacket};

/// The fields the bridge keeps from one payload.  Packets absent from the
/// payload read as zero, matching a freshly reset snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorReadings {
    pub distance: i16,
    pub charging_state: ChargingState,
    pub voltage: u16,
    pub current: i16,
    pub charge: i16,
    pub capacity: u16,
}

impl SensorReadings {
    fn apply(&mut self, reading: Reading) {
        match reading {
            Reading::Distance(v) => self.distance = v,
            Reading::ChargingState(v) => self.charging_state = v,
            Reading::Voltage(v) => self.voltage = v,
            Reading::Current(v) => self.current = v,
            Reading::BatteryCharge(v) => self.charge = v,
            Reading::BatteryCapacity(v) => self.capacity = v,
            Reading::Skipped(_) => {}
        }
    }
}

/// Decode every record in `payload`, in order.
pub fn parse_fields(payload: &[u8]) -> Result<Vec<Reading>, ParseError> {
    if payload.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut fields = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let id = payload[offset];
        let packet = SensorPacket::from_id(id)
            .ok_or(ParseError::UnknownPacketId { id, offset })?;

        let start = offset + 1;
        let end = start + packet.width();
        let body = payload
            .get(start..end)
            .ok_or(ParseError::Truncated { id, offset })?;

        fields.push(packet.decode(body));
        offset = end;
    }
    Ok(fields)
}

/// Decode `payload` into the readings the state deriver consumes.
pub fn parse(payload: &[u8]) -> Result<SensorReadings, ParseError> {
    let mut readings = SensorReadings::default();
    for field in parse_fields(payload)? {
        readings.apply(field);
    }
    Ok(readings)
}
