//! Driver module: process spawning, line protocol, and message types.

mod command;
mod events;
mod process;
mod stream;

pub use command::*;
pub use events::*;
pub use process::*;
pub use stream::*;
