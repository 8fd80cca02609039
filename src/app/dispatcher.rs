//! Command dispatcher: semantic commands → wake sequence + OI bytes.
//!
//! Every recognised command wakes the robot first, then writes its
//! opcode(s).  `cleaning` is updated optimistically for the commands that
//! obviously start or stop a run; the next parsed frame corrects it.

use log::{debug, info};

use crate::config::WakeConfig;
use crate::oi::Opcode;
use crate::oi::opcodes::play_song;
use crate::oi::songs::{LOCATE_GAPS_MS, LOCATE_SONGS, song_definition};
use crate::state::DeviceState;

use super::commands::Command;
use super::events::WakeVariant;
use super::ports::{ClockPort, OiPort, WakeLinePort};

// ───────────────────────────────────────────────────────────────
// Wake sequences
// ───────────────────────────────────────────────────────────────

/// Pulse the wake line and send start.
pub fn wake(hw: &mut (impl OiPort + WakeLinePort + ClockPort), cfg: &WakeConfig) {
    hw.drive_low();
    hw.delay_ms(cfg.pulse_low_ms);
    hw.release();
    hw.delay_ms(cfg.settle_ms);
    hw.write_byte(Opcode::Start.byte());
}

/// Wake a robot sitting on its dock.  Some models fall asleep on the dock
/// and stop streaming; a clean immediately followed by a dock keeps them
/// awake without leaving the base.
pub fn wake_on_dock(hw: &mut (impl OiPort + WakeLinePort + ClockPort), cfg: &WakeConfig) {
    wake(hw, cfg);
    if cfg.dock_sleep_fix {
        hw.delay_ms(10);
        hw.write_byte(Opcode::Clean.byte());
        hw.delay_ms(150);
        hw.write_byte(Opcode::SeekDock.byte());
    }
}

/// Issue the wake sequence for `variant`.
pub fn wake_with(
    variant: WakeVariant,
    hw: &mut (impl OiPort + WakeLinePort + ClockPort),
    cfg: &WakeConfig,
) {
    match variant {
        WakeVariant::Plain => wake(hw, cfg),
        WakeVariant::OnDock => wake_on_dock(hw, cfg),
    }
}

/// Upload the four locate songs into slots 0–3.
pub fn learn_songs(hw: &mut impl OiPort) {
    for (slot, notes) in LOCATE_SONGS.iter().enumerate() {
        hw.write_bytes(&song_definition(slot as u8, notes));
    }
}

// ───────────────────────────────────────────────────────────────
// Dispatch
// ───────────────────────────────────────────────────────────────

/// Carry out `cmd`.  Blocks for the wake pulse, and for roughly 11.6 s on
/// `locate`.
pub fn perform(
    cmd: Command,
    state: &mut DeviceState,
    hw: &mut (impl OiPort + WakeLinePort + ClockPort),
    cfg: &WakeConfig,
) {
    wake(hw, cfg);

    match cmd {
        Command::TurnOn => {
            info!("Turning on");
            hw.write_byte(Opcode::Clean.byte());
            state.cleaning = true;
        }
        Command::TurnOff => {
            info!("Turning off");
            hw.write_byte(Opcode::Power.byte());
            state.cleaning = false;
        }
        Command::Start | Command::Pause => {
            info!("Toggling");
            hw.write_byte(Opcode::Clean.byte());
        }
        Command::Stop => {
            if state.cleaning {
                info!("Stopping");
                hw.write_byte(Opcode::Clean.byte());
            } else {
                debug!("Not cleaning, nothing to stop");
            }
        }
        Command::CleanSpot => {
            info!("Cleaning spot");
            hw.write_byte(Opcode::Spot.byte());
            state.cleaning = true;
        }
        Command::Locate => {
            info!("Playing locate melody");
            hw.write_byte(Opcode::Safe.byte());
            hw.delay_ms(50);
            for (slot, gap) in LOCATE_GAPS_MS.iter().enumerate() {
                hw.write_bytes(&play_song(slot as u8));
                hw.delay_ms(*gap);
            }
            hw.write_bytes(&play_song(LOCATE_GAPS_MS.len() as u8));
        }
        Command::ReturnToBase => {
            info!("Returning to base");
            hw.write_byte(Opcode::SeekDock.byte());
            state.cleaning = true;
        }
    }
}

/// Parse `token` and carry it out.  Returns `false`, without waking the
/// robot, when the token is not a known command.
pub fn perform_token(
    token: &str,
    state: &mut DeviceState,
    hw: &mut (impl OiPort + WakeLinePort + ClockPort),
    cfg: &WakeConfig,
) -> bool {
    match token.parse::<Command>() {
        Ok(cmd) => {
            perform(cmd, state, hw, cfg);
            true
        }
        Err(_) => false,
    }
}
