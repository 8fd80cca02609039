//! Open Interface command opcodes and stream-control encodings.

use super::packet::SensorPacket;

/// Single-byte OI commands the bridge issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Start the OI; required after every wake.
    Start = 128,
    Safe = 131,
    /// Power down (the robot turns off).
    Power = 133,
    Spot = 134,
    /// Start cleaning, or pause if already cleaning.
    Clean = 135,
    /// Define a song slot.
    Song = 140,
    /// Play a learned song slot.
    Play = 141,
    /// Seek the dock.
    SeekDock = 143,
    /// Request a sensor stream.
    Stream = 148,
    /// Pause or resume the stream.
    PauseResumeStream = 150,
}

impl Opcode {
    pub const fn byte(self) -> u8 {
        self as u8
    }
}

/// `[148, n, ids…]`: ask the robot to push these packets every 15 ms.
pub fn stream_request(packets: &[SensorPacket]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + packets.len());
    out.push(Opcode::Stream.byte());
    out.push(packets.len() as u8);
    out.extend(packets.iter().map(|p| p.id()));
    out
}

/// `[150, 0|1]`
pub fn stream_pause_resume(resume: bool) -> [u8; 2] {
    [Opcode::PauseResumeStream.byte(), u8::from(resume)]
}

/// `[141, slot]`
pub fn play_song(slot: u8) -> [u8; 2] {
    [Opcode::Play.byte(), slot]
}
