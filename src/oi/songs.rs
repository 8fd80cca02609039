//! Locate melody.
//!
//! Four song slots are learned once at startup.  Played back in order they
//! make the robot easy to find by ear.  Each slot is a flat list of
//! `(note, duration)` pairs; durations are in 1/64 s.

use super::opcodes::Opcode;

pub const LOCATE_SONGS: [&[u8]; 4] = [
    &[55, 32, 55, 32, 55, 32, 51, 24, 58, 8, 55, 32, 51, 24, 58, 8, 55, 64],
    &[62, 32, 62, 32, 62, 32, 63, 24, 58, 8, 54, 32, 51, 24, 58, 8, 55, 64],
    &[
        67, 32, 55, 24, 55, 8, 67, 32, 66, 24, 65, 8, 64, 8, 63, 8, 64, 16, 30, 16, 56, 16, 61, 32,
    ],
    &[
        60, 24, 59, 8, 58, 8, 57, 8, 58, 16, 10, 16, 52, 16, 54, 32, 51, 24, 58, 8, 55, 32, 51, 24,
        58, 8, 55, 64,
    ],
];

/// Pause after starting each slot except the last, so one finishes before
/// the next begins (ms).
pub const LOCATE_GAPS_MS: [u32; 3] = [4_000, 4_000, 3_500];

/// `[140, slot, note_count, note, duration, …]`
pub fn song_definition(slot: u8, notes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + notes.len());
    out.push(Opcode::Song.byte());
    out.push(slot);
    out.push((notes.len() / 2) as u8);
    out.extend_from_slice(notes);
    out
}
