//! Sensor-stream frame decoder.
//!
//! Wire format (pushed by the robot every 15 ms once a stream is requested):
//! ```text
//! ┌──────────┬──────────┬──────────────────────┬──────────┐
//! │ 19 (1B)  │ N (1B)   │ packet records (N B) │ checksum │
//! └──────────┴──────────┴──────────────────────┴──────────┘
//! ```
//! The low byte of the sum of every byte, checksum included, is zero.
//!
//! The decoder is fed one byte at a time, so a UART read that returns half
//! a frame, or the tail of one frame and the head of the next, loses
//! nothing.  Anything that does not look like a frame is dropped until the
//! next header byte.

use log::trace;

/// First byte of every stream frame.
pub const STREAM_HEADER: u8 = 19;

/// Largest payload a one-byte length can describe.
const MAX_PAYLOAD: usize = 255;

enum DecoderState {
    /// Hunting for the header byte.
    Header,
    /// Header seen, next byte is the payload length.
    Length,
    /// Collecting `expected` payload bytes.
    Payload { expected: usize },
    /// Payload complete, next byte is the checksum.
    Checksum,
}

/// Streaming frame decoder.
pub struct StreamDecoder {
    state: DecoderState,
    payload: heapless::Vec<u8, MAX_PAYLOAD>,
    sum: u8,
    frames: u32,
    checksum_errors: u32,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Header,
            payload: heapless::Vec::new(),
            sum: 0,
            frames: 0,
            checksum_errors: 0,
        }
    }

    /// Feed one byte.  Returns the payload of a frame when this byte
    /// completes one with a valid checksum.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        match self.state {
            DecoderState::Header => {
                if byte == STREAM_HEADER {
                    self.sum = byte;
                    self.payload.clear();
                    self.state = DecoderState::Length;
                }
            }
            DecoderState::Length => {
                self.sum = self.sum.wrapping_add(byte);
                self.state = if byte == 0 {
                    DecoderState::Header
                } else {
                    DecoderState::Payload {
                        expected: byte as usize,
                    }
                };
            }
            DecoderState::Payload { expected } => {
                self.sum = self.sum.wrapping_add(byte);
                // Capacity equals the largest encodable length.
                let _ = self.payload.push(byte);
                if self.payload.len() == expected {
                    self.state = DecoderState::Checksum;
                }
            }
            DecoderState::Checksum => {
                self.state = DecoderState::Header;
                if self.sum.wrapping_add(byte) == 0 {
                    self.frames = self.frames.wrapping_add(1);
                    return Some(self.payload.to_vec());
                }
                self.checksum_errors = self.checksum_errors.wrapping_add(1);
                trace!("stream: checksum mismatch ({} bytes)", self.payload.len());
            }
        }
        None
    }

    /// Feed a chunk and collect every frame it completes.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        data.iter().filter_map(|b| self.push(*b)).collect()
    }

    /// Drop any partial frame (e.g. after the stream is reset).
    pub fn reset(&mut self) {
        self.state = DecoderState::Header;
        self.payload.clear();
        self.sum = 0;
    }

    /// Frames decoded since boot.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Frames dropped for a bad checksum since boot.
    pub fn checksum_errors(&self) -> u32 {
        self.checksum_errors
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap `payload` in a stream frame.  Used by the simulated OI link and
/// by tests.
pub fn encode_frame(payload: &[u8]) -> Option<Vec<u8>> {
    if payload.is_empty() || payload.len() > MAX_PAYLOAD {
        return None;
    }
    let mut out = Vec::with_capacity(payload.len() + 3);
    out.push(STREAM_HEADER);
    out.push(payload.len() as u8);
    out.extend_from_slice(payload);
    let sum = out.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    out.push(0u8.wrapping_sub(sum));
    Some(out)
}
