//! Roomba Open Interface (OI) protocol: opcodes, sensor packets, the
//! stream framer and the payload parser.

pub mod opcodes;
pub mod packet;
pub mod parser;
pub mod songs;
pub mod stream;

pub use opcodes::Opcode;
pub use packet::{ChargingState, Reading, STREAMED_PACKETS, SensorPacket};
pub use parser::{SensorReadings, parse, parse_fields};
pub use stream::{StreamDecoder, encode_frame};
