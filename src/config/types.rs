//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::DriverCommand;
use crate::session::SessionOptions;
use crate::supervisor::FixedDelay;

/// Default port for the relay server.
pub const DEFAULT_PORT: u16 = 3000;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            cors_permissive: true,
        }
    }
}

/// How to launch the treadmill driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["python_bridge.py".to_string()],
            working_dir: None,
        }
    }
}

impl DriverConfig {
    #[must_use]
    pub fn to_command(&self) -> DriverCommand {
        let command = DriverCommand::new(&self.program).args(self.args.iter().cloned());
        match &self.working_dir {
            Some(dir) => command.working_dir(dir),
            None => command,
        }
    }
}

/// Session timers and channel sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay before restarting a crashed driver.
    pub restart_delay_ms: u64,
    /// Delay before the automatic `power_on` after a connect. 0 disables it.
    pub auto_power_on_delay_ms: u64,
    /// Capacity of the viewer broadcast channel.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: 2000,
            auto_power_on_delay_ms: 1000,
            event_capacity: crate::relay::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn restart_policy(&self) -> FixedDelay {
        FixedDelay::new(Duration::from_millis(self.restart_delay_ms))
    }

    #[must_use]
    pub fn options(&self) -> SessionOptions {
        SessionOptions {
            auto_power_on_delay: (self.auto_power_on_delay_ms > 0)
                .then(|| Duration::from_millis(self.auto_power_on_delay_ms)),
            event_capacity: self.event_capacity,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub driver: DriverConfig,
    pub session: SessionConfig,
}
