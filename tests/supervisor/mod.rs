//! Supervisor module tests.

mod runner_test;
mod session_test;
mod state_test;
