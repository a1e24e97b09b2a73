//! Error types for the console client.

use tokio_tungstenite::tungstenite;

/// Errors that can occur while running the console client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Input line did not name a known command.
    #[error("Unknown command: {0} (type `help` for a list)")]
    UnknownCommand(String),

    /// A known command had a missing or malformed argument.
    #[error("Invalid argument for `{command}`: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },

    /// The relay could not be reached.
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        source: Box<tungstenite::Error>,
    },

    /// The WebSocket failed after connecting.
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}
