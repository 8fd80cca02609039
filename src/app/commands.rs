//! Inbound commands to the bridge.
//!
//! Commands arrive as bare text tokens on the command topic.  The set is
//! closed; anything else is rejected by [`Command::from_str`] and ignored
//! by the caller.

use core::fmt;
use core::str::FromStr;

/// High-level actions an operator can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TurnOn,
    TurnOff,
    /// Start cleaning, or pause if already cleaning.
    Start,
    /// Same toggle as [`Command::Start`].
    Pause,
    /// Pause only if currently cleaning.
    Stop,
    CleanSpot,
    /// Play the locate melody.
    Locate,
    ReturnToBase,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::TurnOn,
        Command::TurnOff,
        Command::Start,
        Command::Pause,
        Command::Stop,
        Command::CleanSpot,
        Command::Locate,
        Command::ReturnToBase,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::CleanSpot => "clean_spot",
            Self::Locate => "locate",
            Self::ReturnToBase => "return_to_base",
        }
    }
}

/// The token was not one of [`Command::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCommand;

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command")
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    /// Exact, case-sensitive match on the token.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.token() == s)
            .ok_or(UnknownCommand)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
