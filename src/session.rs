//! The shared treadmill session.
//!
//! A [`Session`] owns the single driver supervisor, the canonical state store,
//! and the broadcaster. Every viewer talks to the same session; there is no
//! per-viewer isolation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::driver::{
    Command, ConnectionStatus, DriverCommand, DriverMessage, DriverOutput, ErrorPayload,
    LogPayload, DEFAULT_CHANNEL_BUFFER,
};
use crate::relay::{Broadcaster, ClientEvent, RelayEvent, StatusResponse};
use crate::supervisor::{DeviceSupervisor, RestartPolicy, SessionStore, SupervisorError};

/// Default delay between connecting and switching the device to manual mode.
pub const DEFAULT_AUTO_POWER_ON_DELAY: Duration = Duration::from_secs(1);

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Delay before the automatic `power_on` after a connect. `None` disables it.
    pub auto_power_on_delay: Option<Duration>,
    /// Capacity of the viewer broadcast channel.
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            auto_power_on_delay: Some(DEFAULT_AUTO_POWER_ON_DELAY),
            event_capacity: crate::relay::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// The process-wide session shared by every viewer.
#[derive(Debug)]
pub struct Session {
    store: SessionStore,
    supervisor: DeviceSupervisor,
    broadcaster: Broadcaster,
    options: SessionOptions,
    cancel: CancellationToken,
}

impl Session {
    /// Create a session and the channel carrying its driver's output.
    ///
    /// Nothing is spawned until [`run`](Self::run) is called. Cancelling
    /// `cancel` tears the session down.
    #[must_use]
    pub fn create(
        command: DriverCommand,
        policy: Box<dyn RestartPolicy>,
        options: SessionOptions,
        cancel: CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<DriverOutput>) {
        let (output_tx, output_rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let supervisor = DeviceSupervisor::new(command, policy, output_tx, cancel.clone());
        let session = Self {
            store: SessionStore::new(),
            supervisor,
            broadcaster: Broadcaster::new(options.event_capacity),
            options,
            cancel,
        };
        (Arc::new(session), output_rx)
    }

    /// Start the driver and process its output until the session is cancelled.
    ///
    /// The driver is killed before this returns.
    pub async fn run(self: Arc<Self>, mut outputs: mpsc::Receiver<DriverOutput>) {
        self.supervisor.launch().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                output = outputs.recv() => match output {
                    Some(output) => self.handle_output(output),
                    None => break,
                },
            }
        }

        self.shutdown().await;
    }

    /// Apply one unit of driver output to the canonical state and fan it out.
    pub fn handle_output(&self, output: DriverOutput) {
        match output {
            DriverOutput::Message(message) => self.handle_message(message),
            DriverOutput::Text(line) => {
                tracing::info!(line = %line, "Driver output");
                self.broadcaster
                    .broadcast(RelayEvent::Log(LogPayload::info(line)));
            }
            DriverOutput::Diagnostic(text) => {
                tracing::warn!(text = %text, "Driver diagnostic");
                self.broadcaster
                    .broadcast(RelayEvent::Error(ErrorPayload::new(text)));
            }
        }
    }

    fn handle_message(&self, message: DriverMessage) {
        tracing::debug!(kind = message.kind(), "Driver message");
        let event = match message {
            DriverMessage::ConnectionUpdate(update) => {
                let change = self.store.apply_connection_update(&update);
                if change.became_connected() {
                    tracing::info!(device = %change.current.display_name(), "Device connected");
                    self.schedule_power_on();
                }
                RelayEvent::ConnectionUpdate(change.current)
            }
            DriverMessage::StatusUpdate(status) => {
                RelayEvent::StatusUpdate(self.store.apply_status_update(status))
            }
            DriverMessage::ScanResults(devices) => RelayEvent::ScanResults(devices),
            DriverMessage::Error(error) => RelayEvent::Error(error),
            DriverMessage::Log(log) => RelayEvent::Log(log),
            DriverMessage::WorkoutHistory(result) => RelayEvent::WorkoutHistory(result),
        };
        self.broadcaster.broadcast(event);
    }

    /// Switch the freshly connected device into manual mode after a short delay.
    fn schedule_power_on(&self) {
        let Some(delay) = self.options.auto_power_on_delay else {
            return;
        };
        let supervisor = self.supervisor.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match supervisor.send(&Command::PowerOn).await {
                Ok(true) => tracing::info!("Enabled manual mode after connect"),
                Ok(false) => tracing::debug!("Driver gone before automatic power on"),
                Err(e) => tracing::warn!(error = %e, "Automatic power on failed"),
            }
        });
    }

    /// Forward a viewer request to the driver.
    ///
    /// Returns `Ok(false)` when no driver is alive and the request was dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be written to the driver.
    pub async fn handle_client(&self, event: ClientEvent) -> Result<bool, SupervisorError> {
        let command = event.into_command();
        self.supervisor.send(&command).await
    }

    /// Subscribe to relay events, returning the connection snapshot to send first.
    ///
    /// The subscription is taken before the snapshot is read so no update
    /// between the two is lost.
    #[must_use]
    pub fn subscribe(&self) -> (ConnectionStatus, broadcast::Receiver<RelayEvent>) {
        let rx = self.broadcaster.subscribe();
        (self.store.connection(), rx)
    }

    /// Current state for the status endpoint.
    pub async fn snapshot(&self) -> StatusResponse {
        StatusResponse {
            connection: self.store.connection(),
            device: self.store.device(),
            clients: self.broadcaster.client_count(),
            driver_running: self.supervisor.is_running().await,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn supervisor(&self) -> &DeviceSupervisor {
        &self.supervisor
    }

    #[must_use]
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the session and kill the driver.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.supervisor.shutdown().await;
        tracing::info!("Session torn down");
    }
}
