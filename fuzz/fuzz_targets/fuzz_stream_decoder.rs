//! Fuzz target: `StreamDecoder::feed`
//!
//! Every frame the decoder yields must be non-empty, fit a length byte and
//! re-encode to a frame with a valid checksum.
//!
//! cargo fuzz run fuzz_stream_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomba_bridge::oi::{StreamDecoder, encode_frame};

fuzz_target!(|data: &[u8]| {
    let mut decoder = StreamDecoder::new();
    for payload in decoder.feed(data) {
        assert!(!payload.is_empty(), "decoder must not yield empty payload");
        assert!(payload.len() <= 255);
        let frame = encode_frame(&payload).expect("payload re-encodes");
        let sum = frame.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(sum, 0);
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    let _ = decoder.feed(data);
});
