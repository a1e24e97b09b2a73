//! Canonical session state shared by every viewer.

use std::sync::RwLock;

use crate::driver::{ConnectionStatus, ConnectionUpdate, DeviceStatus};

/// Store holding the canonical connection and device status.
///
/// All mutation goes through the two `apply_*` methods, each of which holds
/// the write lock for the whole read-modify-write.
#[derive(Debug, Default)]
pub struct SessionStore {
    connection: RwLock<ConnectionStatus>,
    device: RwLock<Option<DeviceStatus>>,
}

/// Result of applying a connection update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionChange {
    pub previous: ConnectionStatus,
    pub current: ConnectionStatus,
}

impl ConnectionChange {
    /// True when this update moved the session from disconnected to connected.
    #[must_use]
    pub fn became_connected(&self) -> bool {
        !self.previous.connected && self.current.connected
    }
}

/// Merge the fields present in `update` into `status`.
///
/// Absent fields keep their value. A result with `connected == false` never
/// carries device details.
#[must_use]
pub fn merge_connection(status: &ConnectionStatus, update: &ConnectionUpdate) -> ConnectionStatus {
    let mut merged = status.clone();
    if let Some(connected) = update.connected {
        merged.connected = connected;
    }
    if let Some(name) = &update.device_name {
        merged.device_name.clone_from(name);
    }
    if let Some(address) = &update.device_address {
        merged.device_address.clone_from(address);
    }
    if let Some(at) = &update.connected_at {
        merged.connected_at.clone_from(at);
    }
    if !merged.connected {
        merged.device_name = None;
        merged.device_address = None;
        merged.connected_at = None;
    }
    merged
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow-merge a partial update into the stored connection status.
    pub fn apply_connection_update(&self, update: &ConnectionUpdate) -> ConnectionChange {
        let mut guard = self
            .connection
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = guard.clone();
        let current = merge_connection(&previous, update);
        guard.clone_from(&current);
        drop(guard);

        tracing::debug!(
            connected = current.connected,
            device = ?current.device_name,
            "Connection status updated"
        );
        ConnectionChange { previous, current }
    }

    /// Replace the stored device status. Returns the normalized record.
    pub fn apply_status_update(&self, status: DeviceStatus) -> DeviceStatus {
        let status = status.normalized();
        *self
            .device
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(status);
        status
    }

    /// Latest connection status.
    #[must_use]
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Latest device status, if any has been reported.
    #[must_use]
    pub fn device(&self) -> Option<DeviceStatus> {
        *self
            .device
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
