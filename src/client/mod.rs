//! Viewer-side session logic and the interactive console client.

mod error;
mod input;
mod keyboard;
mod log;
mod machine;
mod remote;
mod toast;

pub use error::ClientError;
pub use input::{ConsoleCommand, HELP};
pub use keyboard::{Key, SPEED_STEP};
pub use log::{ActivityLog, LogEntry, ACTIVITY_LOG_CAPACITY};
pub use machine::{ClientSession, Phase, COUNTDOWN};
pub use remote::{dispatch, ConsoleClient, Dispatch, View};
pub use toast::{Toast, ToastKind, ToastSlot};
