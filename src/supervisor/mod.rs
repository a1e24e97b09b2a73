//! Supervisor module for the driver process and canonical device state.

mod policy;
mod runner;
mod state;

pub use policy::*;
pub use runner::*;
pub use state::*;
