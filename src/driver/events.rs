//! Message types emitted by the treadmill driver on stdout.
//!
//! Every line the driver prints is an object of the form
//! `{"type": <name>, "data": <payload>}`. The payload shapes defined here are
//! shared with the realtime relay, which forwards them to viewers unchanged.

use serde::{Deserialize, Deserializer, Serialize};

/// Highest belt speed the device accepts, in km/h.
pub const MAX_SPEED: f64 = 6.0;

/// Lowest belt speed, in km/h.
pub const MIN_SPEED: f64 = 0.0;

/// Clamp a speed to the supported range and round it to one decimal place.
///
/// Non-finite input is treated as a request to stop the belt.
#[must_use]
pub fn clamp_speed(speed: f64) -> f64 {
    if !speed.is_finite() {
        return MIN_SPEED;
    }
    let rounded = (speed * 10.0).round() / 10.0;
    rounded.clamp(MIN_SPEED, MAX_SPEED)
}

/// Canonical connection state of the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Whether the driver holds a live connection to a treadmill.
    pub connected: bool,
    /// Advertised name of the connected device.
    pub device_name: Option<String>,
    /// Radio address of the connected device.
    pub device_address: Option<String>,
    /// Driver-formatted timestamp of when the connection was established.
    pub connected_at: Option<String>,
}

impl ConnectionStatus {
    /// Name to show for the device, falling back to the product name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.device_name.as_deref().unwrap_or("WalkingPad")
    }
}

/// Partial connection update as sent by the driver.
///
/// Each field distinguishes "absent" (`None`) from "explicitly null"
/// (`Some(None)`), so that a merge only touches the keys that were present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_address: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub connected_at: Option<Option<String>>,
}

/// Marks a key as present, keeping an explicit `null` as `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ConnectionUpdate {
    /// Update announcing a fresh connection.
    #[must_use]
    pub fn connected(
        name: impl Into<String>,
        address: impl Into<String>,
        at: impl Into<String>,
    ) -> Self {
        Self {
            connected: Some(true),
            device_name: Some(Some(name.into())),
            device_address: Some(Some(address.into())),
            connected_at: Some(Some(at.into())),
        }
    }

    /// Update announcing a disconnect, with every device field nulled.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            connected: Some(false),
            device_name: Some(None),
            device_address: Some(None),
            connected_at: Some(None),
        }
    }
}

/// Operating mode reported by the treadmill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DeviceMode {
    #[default]
    Standby,
    Manual,
    Automatic,
    Unknown(u8),
}

impl From<u8> for DeviceMode {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Standby,
            1 => Self::Manual,
            2 => Self::Automatic,
            other => Self::Unknown(other),
        }
    }
}

impl From<DeviceMode> for u8 {
    fn from(mode: DeviceMode) -> Self {
        match mode {
            DeviceMode::Standby => 0,
            DeviceMode::Manual => 1,
            DeviceMode::Automatic => 2,
            DeviceMode::Unknown(other) => other,
        }
    }
}

impl std::fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Standby => "Standby",
            Self::Manual => "Manual",
            Self::Automatic => "Automatic",
            Self::Unknown(_) => "Unknown",
        };
        f.write_str(label)
    }
}

/// State of the walking belt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum BeltState {
    #[default]
    Stopped,
    Running,
    Starting,
    Stopping,
    Unknown(u8),
}

impl From<u8> for BeltState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Stopped,
            1 => Self::Running,
            2 => Self::Starting,
            3 => Self::Stopping,
            other => Self::Unknown(other),
        }
    }
}

impl From<BeltState> for u8 {
    fn from(state: BeltState) -> Self {
        match state {
            BeltState::Stopped => 0,
            BeltState::Running => 1,
            BeltState::Starting => 2,
            BeltState::Stopping => 3,
            BeltState::Unknown(other) => other,
        }
    }
}

impl std::fmt::Display for BeltState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Stopped => "Stopped",
            Self::Running => "Running",
            Self::Starting => "Starting",
            Self::Stopping => "Stopping",
            Self::Unknown(_) => "Unknown",
        };
        f.write_str(label)
    }
}

/// Complete device status record. Always replaced wholesale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Belt speed in km/h.
    pub speed: f64,
    /// Elapsed workout time in seconds.
    #[serde(deserialize_with = "whole_number")]
    pub time: u64,
    /// Distance covered in meters.
    #[serde(deserialize_with = "whole_number")]
    pub distance: u64,
    /// Step count.
    #[serde(deserialize_with = "whole_number")]
    pub steps: u64,
    pub mode: DeviceMode,
    pub belt_state: BeltState,
}

/// Accepts integer or fractional counters, rounding to the nearest whole value.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value > 0.0 {
        Ok(value.round() as u64)
    } else {
        Ok(0)
    }
}

impl DeviceStatus {
    /// Return the status with its speed clamped to the supported range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.speed = clamp_speed(self.speed);
        self
    }

    /// Returns true while the belt is moving under its own power.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.belt_state == BeltState::Running
    }
}

/// A treadmill found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    /// Unique radio address.
    pub address: String,
    /// Received signal strength.
    pub rssi: i64,
}

/// Severity attached to activity log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

/// Payload of a driver `log` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPayload {
    pub message: String,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl LogPayload {
    /// Info-level log line without a driver timestamp.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Info,
            timestamp: None,
        }
    }
}

/// Payload of a driver `error` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One byte of a workout history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub offset: u32,
    pub value: u32,
    pub hex: String,
}

/// Decoded portion of a workout history record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedWorkout {
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub hex: String,
    #[serde(default)]
    pub data_points: Vec<DataPoint>,
}

/// Result of a `get_workout_history` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutHistoryResult {
    pub timestamp: String,
    pub mode: u8,
    #[serde(default)]
    pub raw_data: Option<String>,
    #[serde(default)]
    pub parsed_data: Option<ParsedWorkout>,
    /// Set when the device had nothing to report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Messages emitted by the driver on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DriverMessage {
    StatusUpdate(DeviceStatus),
    ConnectionUpdate(ConnectionUpdate),
    ScanResults(Vec<Device>),
    Error(ErrorPayload),
    Log(LogPayload),
    WorkoutHistory(WorkoutHistoryResult),
}

impl DriverMessage {
    /// Wire name of the message kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusUpdate(_) => "status_update",
            Self::ConnectionUpdate(_) => "connection_update",
            Self::ScanResults(_) => "scan_results",
            Self::Error(_) => "error",
            Self::Log(_) => "log",
            Self::WorkoutHistory(_) => "workout_history",
        }
    }
}
