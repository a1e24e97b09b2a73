//! Client-side session state machine.
//!
//! A [`ClientSession`] mirrors the canonical state published by the relay and
//! decides which user actions are allowed. Actions return the [`ClientEvent`]
//! to send, or `None` when the action is not valid in the current state. The
//! machine never mutates device state optimistically: belt, speed and
//! connection changes only land when the relay reports them.

use std::time::{Duration, Instant};

use crate::classify::classify;
use crate::driver::{
    clamp_speed, ConnectionStatus, DataPoint, Device, DeviceMode, DeviceStatus, HistoryMode,
    LogLevel, WorkoutHistoryResult,
};
use crate::relay::{ClientEvent, RelayEvent, SpeedRequest};

use super::keyboard::{Key, SPEED_STEP};
use super::log::ActivityLog;
use super::toast::ToastSlot;

/// Length of the start countdown overlay.
pub const COUNTDOWN: Duration = Duration::from_secs(3);

/// Connection lifecycle as seen by one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    DevicesListed,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct ClientSession {
    phase: Phase,
    devices: Vec<Device>,
    connection: ConnectionStatus,
    device: Option<DeviceStatus>,
    history_loading: bool,
    history: Option<WorkoutHistoryResult>,
    countdown_until: Option<Instant>,
    log: ActivityLog,
    toast: ToastSlot,
}

impl ClientSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            devices: Vec::new(),
            connection: ConnectionStatus::default(),
            device: None,
            history_loading: false,
            history: None,
            countdown_until: None,
            log: ActivityLog::new(),
            toast: ToastSlot::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Connected
    }

    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionStatus {
        &self.connection
    }

    /// Last device status reported by the relay.
    #[must_use]
    pub fn device_status(&self) -> Option<&DeviceStatus> {
        self.device.as_ref()
    }

    #[must_use]
    pub fn is_history_loading(&self) -> bool {
        self.history_loading
    }

    #[must_use]
    pub fn history(&self) -> Option<&WorkoutHistoryResult> {
        self.history.as_ref()
    }

    /// Table rows for the loaded workout history, in the order received.
    #[must_use]
    pub fn history_rows(&self) -> &[DataPoint] {
        self.history
            .as_ref()
            .and_then(|result| result.parsed_data.as_ref())
            .map_or(&[], |parsed| parsed.data_points.as_slice())
    }

    #[must_use]
    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut ActivityLog {
        &mut self.log
    }

    #[must_use]
    pub fn toast(&self) -> &ToastSlot {
        &self.toast
    }

    pub fn toast_mut(&mut self) -> &mut ToastSlot {
        &mut self.toast
    }

    /// Whole seconds left on the start countdown, if it is running.
    #[must_use]
    pub fn countdown_remaining(&self, now: Instant) -> Option<u64> {
        let until = self.countdown_until?;
        let left = until.checked_duration_since(now).filter(|d| !d.is_zero())?;
        Some(left.as_millis().div_ceil(1000).try_into().unwrap_or(u64::MAX))
    }

    #[must_use]
    pub fn is_counting_down(&self, now: Instant) -> bool {
        self.countdown_remaining(now).is_some()
    }

    /// Start a device scan. Not available while connected or already scanning.
    pub fn scan(&mut self) -> Option<ClientEvent> {
        if matches!(self.phase, Phase::Connected | Phase::Scanning) {
            return None;
        }
        self.devices.clear();
        self.phase = Phase::Scanning;
        self.log.push("Scanning for devices...", LogLevel::Info);
        self.toast.info("Scanning for WalkingPad devices...");
        Some(ClientEvent::ScanDevices)
    }

    /// Connect to a listed device.
    pub fn connect(&mut self, address: &str) -> Option<ClientEvent> {
        if self.devices.is_empty() || matches!(self.phase, Phase::Connecting | Phase::Connected)
        {
            return None;
        }
        self.phase = Phase::Connecting;
        self.log
            .push(format!("Connecting to device {address}..."), LogLevel::Info);
        self.toast.info("Attempting to connect to WalkingPad...");
        Some(ClientEvent::ConnectDevice {
            address: address.to_string(),
        })
    }

    /// Ask the driver to disconnect. The phase changes once the relay confirms.
    pub fn disconnect(&mut self) -> Option<ClientEvent> {
        if !self.is_connected() {
            return None;
        }
        self.log.push("Disconnecting from device...", LogLevel::Info);
        Some(ClientEvent::DisconnectDevice)
    }

    /// Start the belt and open the countdown overlay.
    ///
    /// Refused while the device reports standby; power it on first.
    pub fn start_belt(&mut self, now: Instant) -> Option<ClientEvent> {
        if !self.is_connected() || self.is_counting_down(now) || self.is_standby() {
            return None;
        }
        self.countdown_until = Some(now + COUNTDOWN);
        self.log.push("Starting treadmill...", LogLevel::Info);
        Some(ClientEvent::StartTreadmill)
    }

    fn is_standby(&self) -> bool {
        self.device.is_some_and(|d| d.mode == DeviceMode::Standby)
    }

    pub fn stop_belt(&mut self) -> Option<ClientEvent> {
        if !self.is_connected() {
            return None;
        }
        self.log.push("Stopping treadmill...", LogLevel::Info);
        Some(ClientEvent::StopTreadmill)
    }

    /// Request a belt speed, clamped to the supported range.
    pub fn set_speed(&mut self, speed: f64) -> Option<ClientEvent> {
        if !self.is_connected() {
            return None;
        }
        let speed = clamp_speed(speed);
        self.log
            .push(format!("Setting speed to {speed:.1} km/h..."), LogLevel::Info);
        Some(ClientEvent::SetSpeed(SpeedRequest { speed }))
    }

    pub fn power_on(&mut self) -> Option<ClientEvent> {
        if !self.is_connected() {
            return None;
        }
        self.log.push("Powering on device...", LogLevel::Info);
        Some(ClientEvent::PowerOn)
    }

    pub fn power_off(&mut self) -> Option<ClientEvent> {
        if !self.is_connected() {
            return None;
        }
        self.log.push("Powering off device...", LogLevel::Info);
        Some(ClientEvent::PowerOff)
    }

    pub fn get_status(&mut self) -> Option<ClientEvent> {
        self.is_connected().then_some(ClientEvent::GetStatus)
    }

    /// Fetch stored workouts. Clears any previously loaded result.
    pub fn get_workout_history(&mut self, mode: HistoryMode) -> Option<ClientEvent> {
        if !self.is_connected() || self.history_loading {
            return None;
        }
        self.history_loading = true;
        self.history = None;
        self.log.push(
            format!("Requesting workout history (mode {})...", u8::from(mode)),
            LogLevel::Info,
        );
        self.toast.info("Loading workout history...");
        Some(ClientEvent::GetWorkoutHistory { mode })
    }

    /// Dispatch a shortcut key. Ignored unless connected and outside text input.
    pub fn handle_key(&mut self, key: Key, in_text_input: bool, now: Instant) -> Option<ClientEvent> {
        if !self.is_connected() || in_text_input {
            return None;
        }
        let status = self.device.unwrap_or_default();
        match key {
            Key::Space => {
                if self.is_counting_down(now) {
                    None
                } else if status.is_running() {
                    self.stop_belt()
                } else {
                    self.start_belt(now)
                }
            }
            _ if status.mode != DeviceMode::Manual => None,
            Key::ArrowUp => self.set_speed(status.speed + SPEED_STEP),
            Key::ArrowDown => self.set_speed(status.speed - SPEED_STEP),
            Key::Digit(_) => key.preset_speed().and_then(|speed| self.set_speed(speed)),
            Key::Other => None,
        }
    }

    /// Apply an event pushed by the relay.
    pub fn handle_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::ConnectionUpdate(status) => self.on_connection_update(status),
            RelayEvent::StatusUpdate(status) => self.device = Some(status),
            RelayEvent::ScanResults(devices) => self.on_scan_results(devices),
            RelayEvent::Log(payload) => self.log.push(payload.message, payload.level),
            RelayEvent::Error(payload) => self.on_error(&payload.message),
            RelayEvent::WorkoutHistory(result) => self.on_workout_history(result),
        }
    }

    fn on_connection_update(&mut self, status: ConnectionStatus) {
        if status.connected {
            self.phase = Phase::Connected;
            self.log.push("Connection status: Connected", LogLevel::Info);
            self.toast.success(format!(
                "Successfully connected to {}!",
                status.display_name()
            ));
        } else {
            self.phase = Phase::Idle;
            self.device = None;
            self.history_loading = false;
            self.countdown_until = None;
            self.log.push("Connection status: Disconnected", LogLevel::Info);
            self.toast.info("Disconnected from WalkingPad");
        }
        self.connection = status;
    }

    fn on_scan_results(&mut self, devices: Vec<Device>) {
        self.log
            .push(format!("Found {} devices", devices.len()), LogLevel::Info);
        if devices.is_empty() {
            self.toast.error("No devices detected, please try again");
        } else {
            let noun = if devices.len() == 1 { "device" } else { "devices" };
            self.toast
                .success(format!("Found {} WalkingPad {noun}!", devices.len()));
        }
        self.devices = devices;
        if !matches!(self.phase, Phase::Connected | Phase::Connecting) {
            self.phase = self.listing_phase();
        }
    }

    fn on_workout_history(&mut self, result: WorkoutHistoryResult) {
        self.history_loading = false;
        let bytes = result.parsed_data.as_ref().map_or(0, |parsed| parsed.length);
        self.log.push(
            format!("Workout history retrieved: {bytes} bytes"),
            LogLevel::Info,
        );
        match &result.message {
            Some(message) => self.toast.info(message.clone()),
            None => self.toast.success("Workout history loaded successfully"),
        }
        self.history = Some(result);
    }

    fn on_error(&mut self, message: &str) {
        self.log.push(message, LogLevel::Error);
        if matches!(self.phase, Phase::Scanning | Phase::Connecting) {
            self.phase = self.listing_phase();
        }
        self.history_loading = false;

        let classification = classify(message);
        if let Some(text) = classification
            .show_toast
            .then(|| classification.category.toast_message())
            .flatten()
        {
            self.toast.error(text);
        }
    }

    fn listing_phase(&self) -> Phase {
        if self.devices.is_empty() {
            Phase::Idle
        } else {
            Phase::DevicesListed
        }
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}
