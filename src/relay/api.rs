//! Wire types for the realtime WebSocket protocol and the status endpoint.
//!
//! Every WebSocket frame is a JSON text message `{"event": <name>, "data": <payload>}`.
//! Payload-less events omit `data`.

use serde::{Deserialize, Serialize};

use crate::driver::{
    Command, ConnectionStatus, Device, DeviceStatus, ErrorPayload, HistoryMode, LogPayload,
    WorkoutHistoryResult,
};

/// Events sent from the coordinator to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RelayEvent {
    /// Full canonical connection status after a merge.
    ConnectionUpdate(ConnectionStatus),
    StatusUpdate(DeviceStatus),
    ScanResults(Vec<Device>),
    Log(LogPayload),
    Error(ErrorPayload),
    WorkoutHistory(WorkoutHistoryResult),
}

impl RelayEvent {
    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionUpdate(_) => "connection_update",
            Self::StatusUpdate(_) => "status_update",
            Self::ScanResults(_) => "scan_results",
            Self::Log(_) => "log",
            Self::Error(_) => "error",
            Self::WorkoutHistory(_) => "workout_history",
        }
    }
}

/// Speed payload of a `set_speed` request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRequest {
    pub speed: f64,
}

/// Events sent from viewers to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    ScanDevices,
    ConnectDevice {
        address: String,
    },
    DisconnectDevice,
    StartTreadmill,
    StopTreadmill,
    SetSpeed(SpeedRequest),
    PowerOn,
    PowerOff,
    GetStatus,
    GetWorkoutHistory {
        #[serde(default)]
        mode: HistoryMode,
    },
}

impl ClientEvent {
    /// Translate into the driver command it requests.
    ///
    /// Speeds are clamped to the supported range on the way through.
    #[must_use]
    pub fn into_command(self) -> Command {
        match self {
            Self::ScanDevices => Command::Scan,
            Self::ConnectDevice { address } => Command::Connect { address },
            Self::DisconnectDevice => Command::Disconnect,
            Self::StartTreadmill => Command::Start,
            Self::StopTreadmill => Command::Stop,
            Self::SetSpeed(SpeedRequest { speed }) => Command::set_speed(speed),
            Self::PowerOn => Command::PowerOn,
            Self::PowerOff => Command::PowerOff,
            Self::GetStatus => Command::GetStatus,
            Self::GetWorkoutHistory { mode } => Command::GetWorkoutHistory { mode },
        }
    }
}

/// Response for GET /api/status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub connection: ConnectionStatus,
    /// Last reported device status, if any.
    pub device: Option<DeviceStatus>,
    /// Number of connected realtime viewers.
    pub clients: usize,
    /// Whether a driver process is currently alive.
    pub driver_running: bool,
}
