//! Keyboard shortcuts for belt control.

use std::str::FromStr;

/// Speed change applied by the arrow keys, in km/h.
pub const SPEED_STEP: f64 = 0.1;

/// A key press relevant to the shortcut table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    ArrowUp,
    ArrowDown,
    Digit(u8),
    Other,
}

impl Key {
    /// Absolute speed selected by a digit key, if it maps to one.
    #[must_use]
    pub fn preset_speed(self) -> Option<f64> {
        match self {
            Self::Digit(d @ 1..=6) => Some(f64::from(d)),
            _ => None,
        }
    }
}

impl FromStr for Key {
    type Err = std::convert::Infallible;

    /// Accepts DOM-style key names as well as short console aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            " " | "space" | "Space" => Self::Space,
            "up" | "ArrowUp" => Self::ArrowUp,
            "down" | "ArrowDown" => Self::ArrowDown,
            other => match other.as_bytes() {
                [d @ b'0'..=b'9'] => Self::Digit(d - b'0'),
                _ => Self::Other,
            },
        };
        Ok(key)
    }
}
