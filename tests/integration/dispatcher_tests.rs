//! Integration tests for the command dispatcher: every command's wake
//! sequence and OI bytes, checked against the mock hardware record.

use crate::mock_hw::{HwCall, MockHardware};

use roomba_bridge::app::commands::Command;
use roomba_bridge::app::dispatcher::{perform, perform_token};
use roomba_bridge::config::WakeConfig;
use roomba_bridge::state::DeviceState;

fn run(cmd: Command, cleaning: bool) -> (MockHardware, DeviceState) {
    let mut hw = MockHardware::new();
    let mut state = DeviceState {
        cleaning,
        ..DeviceState::default()
    };
    perform(cmd, &mut state, &mut hw, &WakeConfig::default());
    (hw, state)
}

/// Calls after the wake prefix (low, 200, release, 200, start).
fn after_wake(hw: &MockHardware) -> &[HwCall] {
    &hw.calls[5..]
}

#[test]
fn every_command_starts_with_wake_pulse() {
    for cmd in Command::ALL {
        let (hw, _) = run(cmd, false);
        assert_eq!(
            &hw.calls[..5],
            &[
                HwCall::WakeLow,
                HwCall::Delay(200),
                HwCall::WakeRelease,
                HwCall::Delay(200),
                HwCall::Write(vec![128]),
            ],
            "{cmd} must wake first"
        );
    }
}

#[test]
fn turn_on_cleans_and_sets_flag() {
    let (hw, state) = run(Command::TurnOn, false);
    assert_eq!(after_wake(&hw), &[HwCall::Write(vec![135])]);
    assert!(state.cleaning);
}

#[test]
fn turn_off_powers_down_and_clears_flag() {
    let (hw, state) = run(Command::TurnOff, true);
    assert_eq!(after_wake(&hw), &[HwCall::Write(vec![133])]);
    assert!(!state.cleaning);
}

#[test]
fn start_and_pause_toggle_without_touching_flag() {
    for cmd in [Command::Start, Command::Pause] {
        let (hw, state) = run(cmd, false);
        assert_eq!(after_wake(&hw), &[HwCall::Write(vec![135])]);
        assert!(!state.cleaning);
    }
}

#[test]
fn stop_while_idle_only_wakes() {
    let (hw, state) = run(Command::Stop, false);
    assert!(after_wake(&hw).is_empty());
    assert!(!state.cleaning);
}

#[test]
fn stop_while_cleaning_toggles() {
    let (hw, _) = run(Command::Stop, true);
    assert_eq!(after_wake(&hw), &[HwCall::Write(vec![135])]);
}

#[test]
fn clean_spot_and_return_to_base() {
    let (hw, state) = run(Command::CleanSpot, false);
    assert_eq!(after_wake(&hw), &[HwCall::Write(vec![134])]);
    assert!(state.cleaning);

    let (hw, state) = run(Command::ReturnToBase, false);
    assert_eq!(after_wake(&hw), &[HwCall::Write(vec![143])]);
    assert!(state.cleaning);
}

#[test]
fn locate_plays_four_songs_with_gaps() {
    let (hw, _) = run(Command::Locate, false);
    assert_eq!(
        after_wake(&hw),
        &[
            HwCall::Write(vec![131]),
            HwCall::Delay(50),
            HwCall::Write(vec![141, 0]),
            HwCall::Delay(4_000),
            HwCall::Write(vec![141, 1]),
            HwCall::Delay(4_000),
            HwCall::Write(vec![141, 2]),
            HwCall::Delay(3_500),
            HwCall::Write(vec![141, 3]),
        ]
    );
}

#[test]
fn custom_wake_timing_is_honoured() {
    let mut hw = MockHardware::new();
    let mut state = DeviceState::default();
    let cfg = WakeConfig {
        pulse_low_ms: 500,
        settle_ms: 50,
        ..WakeConfig::default()
    };
    perform(Command::Start, &mut state, &mut hw, &cfg);
    assert_eq!(hw.calls[1], HwCall::Delay(500));
    assert_eq!(hw.calls[3], HwCall::Delay(50));
}

#[test]
fn unknown_token_is_rejected_without_waking() {
    let mut hw = MockHardware::new();
    let mut state = DeviceState::default();
    assert!(!perform_token(
        "vacuum_harder",
        &mut state,
        &mut hw,
        &WakeConfig::default()
    ));
    assert!(hw.calls.is_empty());
}

#[test]
fn tokens_are_case_sensitive() {
    let mut hw = MockHardware::new();
    let mut state = DeviceState::default();
    assert!(!perform_token("Start", &mut state, &mut hw, &WakeConfig::default()));
    assert!(perform_token("start", &mut state, &mut hw, &WakeConfig::default()));
    assert_eq!(hw.wake_pulses(), 1);
}
