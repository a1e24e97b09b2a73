//! Commands written to the driver's stdin.

use serde::{Deserialize, Serialize};

use super::events::clamp_speed;

/// Which slice of the on-device workout history to fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HistoryMode {
    /// Most recent workouts only.
    #[default]
    Recent,
    /// The complete stored history.
    All,
}

impl From<HistoryMode> for u8 {
    fn from(mode: HistoryMode) -> Self {
        match mode {
            HistoryMode::Recent => 0,
            HistoryMode::All => 1,
        }
    }
}

impl TryFrom<u8> for HistoryMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Recent),
            1 => Ok(Self::All),
            other => Err(format!("invalid history mode {other}, expected 0 or 1")),
        }
    }
}

/// A single instruction for the driver, serialized as `{"action": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Scan,
    Connect { address: String },
    Disconnect,
    Start,
    Stop,
    SetSpeed { speed: f64 },
    PowerOn,
    PowerOff,
    GetStatus,
    GetWorkoutHistory {
        #[serde(default)]
        mode: HistoryMode,
    },
}

impl Command {
    /// Build a `set_speed` command with the speed clamped to `[0.0, 6.0]`.
    #[must_use]
    pub fn set_speed(speed: f64) -> Self {
        Self::SetSpeed {
            speed: clamp_speed(speed),
        }
    }

    /// Build a `connect` command for the given device address.
    #[must_use]
    pub fn connect(address: impl Into<String>) -> Self {
        Self::Connect {
            address: address.into(),
        }
    }

    /// Wire name of the action.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Connect { .. } => "connect",
            Self::Disconnect => "disconnect",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::SetSpeed { .. } => "set_speed",
            Self::PowerOn => "power_on",
            Self::PowerOff => "power_off",
            Self::GetStatus => "get_status",
            Self::GetWorkoutHistory { .. } => "get_workout_history",
        }
    }

    /// Serialize to a single newline-terminated JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be encoded as JSON.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
