//! Restart policy for the driver process.

use std::fmt::Debug;
use std::time::Duration;

/// Default delay before restarting a crashed driver.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(2);

/// Decision from evaluating an exit against the restart policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Restart after the given delay.
    RestartAfter(Duration),
    /// Do not restart.
    GiveUp,
}

/// Decides whether and when a driver that exited on its own gets restarted.
///
/// `attempt` counts consecutive abnormal exits, starting at 1.
pub trait RestartPolicy: Debug + Send + Sync {
    /// Evaluate an exit. `code` is `None` when the process died from a signal.
    fn evaluate(&self, code: Option<i32>, attempt: u32) -> RestartDecision;
}

/// Restart after a fixed delay, with no limit on attempts.
///
/// A clean exit (code 0) is treated as an intentional stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_RESTART_DELAY)
    }
}

impl RestartPolicy for FixedDelay {
    fn evaluate(&self, code: Option<i32>, _attempt: u32) -> RestartDecision {
        match code {
            Some(0) => RestartDecision::GiveUp,
            _ => RestartDecision::RestartAfter(self.delay),
        }
    }
}
