//! Fuzz target: `oi::parse`
//!
//! Arbitrary payloads must either parse or fail with a `ParseError`, and
//! a successful parse must feed state derivation without panicking.
//!
//! cargo fuzz run fuzz_sensor_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomba_bridge::config::ThresholdConfig;
use roomba_bridge::oi::parse;
use roomba_bridge::state::DeviceState;

fuzz_target!(|data: &[u8]| {
    if let Ok(readings) = parse(data) {
        let state = DeviceState::derive(&readings, 0, &ThresholdConfig::default());
        assert!(!(state.cleaning && state.docked));
        if let Some(level) = state.battery_level() {
            assert!(level <= 100);
        }
    }
});
