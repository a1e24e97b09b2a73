//! Treadmill Relay - share one WalkingPad driver between realtime viewers.

pub mod classify;
pub mod client;
pub mod config;
pub mod display;
pub mod driver;
pub mod relay;
pub mod session;
pub mod supervisor;
