//! Realtime relay: broadcasts driver events to viewers over WebSocket.

mod api;
mod error;
mod handlers;
mod server;
mod state;

pub use api::{ClientEvent, RelayEvent, SpeedRequest, StatusResponse};
pub use error::RelayError;
pub use handlers::{handle_socket, AppState};
pub use server::RelayServer;
pub use state::{Broadcaster, DEFAULT_EVENT_CHANNEL_CAPACITY};
