//! Supervisor for the external treadmill driver process.
//!
//! The supervisor owns at most one live driver at a time. It writes commands
//! to the driver's stdin, forwards everything the driver prints into a single
//! output channel, and restarts the driver according to its [`RestartPolicy`]
//! when it exits abnormally.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::driver::{Command, DriverCommand, DriverOutput, DriverProcess, SpawnError, StreamParser};
use crate::supervisor::{RestartDecision, RestartPolicy};

/// Commands that may wait for the driver's stdin before new ones are refused.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Error type for supervisor operations.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    /// The driver could not be spawned.
    #[error("Failed to spawn driver: {0}")]
    Spawn(#[from] SpawnError),
    /// A piped stdio handle was missing after spawn.
    #[error("Driver {0} not available")]
    MissingPipe(&'static str),
    /// A command could not be encoded.
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
    /// The driver is not draining its stdin and the command queue is full.
    #[error("Driver is not accepting commands ({0} queued)")]
    Backlogged(usize),
    /// The supervisor has been shut down.
    #[error("Supervisor is shutting down")]
    ShuttingDown,
}

/// Handle to the currently authoritative driver process.
struct LiveDriver {
    generation: u64,
    pid: Option<u32>,
    commands: mpsc::Sender<String>,
    kill: CancellationToken,
    exited: CancellationToken,
    monitor: JoinHandle<()>,
}

struct Inner {
    command: DriverCommand,
    policy: Box<dyn RestartPolicy>,
    output_tx: mpsc::Sender<DriverOutput>,
    live: Mutex<Option<LiveDriver>>,
    generation: AtomicU64,
    failures: AtomicU32,
    restarts: AtomicU64,
    cancel: CancellationToken,
}

/// Cloneable handle to the device process supervisor.
#[derive(Clone)]
pub struct DeviceSupervisor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for DeviceSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSupervisor")
            .field("program", &self.inner.command.program())
            .field("policy", &self.inner.policy)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl DeviceSupervisor {
    /// Create a supervisor. No process is started until [`start`](Self::start).
    ///
    /// Everything the driver prints is sent to `output_tx`. Cancelling
    /// `cancel` kills the live driver and suppresses further restarts.
    #[must_use]
    pub fn new(
        command: DriverCommand,
        policy: Box<dyn RestartPolicy>,
        output_tx: mpsc::Sender<DriverOutput>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                command,
                policy,
                output_tx,
                live: Mutex::new(None),
                generation: AtomicU64::new(0),
                failures: AtomicU32::new(0),
                restarts: AtomicU64::new(0),
                cancel,
            }),
        }
    }

    /// Kill any previous driver and spawn a fresh one.
    ///
    /// Returns the generation number of the new process. Handles to earlier
    /// generations are invalid once this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the supervisor is shut down or the spawn fails.
    pub async fn start(&self) -> Result<u64, SupervisorError> {
        if self.inner.cancel.is_cancelled() {
            return Err(SupervisorError::ShuttingDown);
        }

        let mut live = self.inner.live.lock().await;
        if let Some(old) = live.take() {
            tracing::info!(pid = ?old.pid, generation = old.generation, "Killing previous driver");
            old.kill.cancel();
            if let Err(e) = old.monitor.await {
                tracing::warn!(error = %e, "Driver monitor task failed");
            }
        }

        let mut process = DriverProcess::spawn(&self.inner.command)?;
        let stdin = process
            .take_stdin()
            .ok_or(SupervisorError::MissingPipe("stdin"))?;
        let stdout = process
            .take_stdout()
            .ok_or(SupervisorError::MissingPipe("stdout"))?;
        let stderr = process
            .take_stderr()
            .ok_or(SupervisorError::MissingPipe("stderr"))?;

        StreamParser::forward_stdout(stdout, self.inner.output_tx.clone());
        StreamParser::forward_stderr(stderr, self.inner.output_tx.clone());

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let pid = process.id();
        let kill = CancellationToken::new();
        let exited = CancellationToken::new();
        let (commands, queue) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        tokio::spawn(write_commands(stdin, queue, generation, exited.clone()));
        let monitor = tokio::spawn(self.clone().monitor(
            process,
            generation,
            kill.clone(),
            exited.clone(),
        ));

        tracing::info!(
            pid = ?pid,
            generation,
            program = %self.inner.command.program(),
            "Driver process started"
        );

        *live = Some(LiveDriver {
            generation,
            pid,
            commands,
            kill,
            exited,
            monitor,
        });
        Ok(generation)
    }

    /// Start the driver, scheduling a retry through the policy if spawning fails.
    pub async fn launch(&self) {
        if let Err(e) = self.start().await {
            if matches!(e, SupervisorError::ShuttingDown) {
                return;
            }
            tracing::error!(error = %e, "Failed to start driver");
            let attempt = self.inner.failures.fetch_add(1, Ordering::SeqCst) + 1;
            self.schedule_restart(None, attempt);
        }
    }

    /// Queue a command for the live driver.
    ///
    /// Commands are written to stdin in the order they were queued. Returns
    /// `Ok(false)` when no driver is alive; the command is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be encoded or the driver has
    /// stopped reading its stdin.
    pub async fn send(&self, command: &Command) -> Result<bool, SupervisorError> {
        let line = command.to_line()?;
        let (generation, commands) = {
            let live = self.inner.live.lock().await;
            match live.as_ref().filter(|d| !d.exited.is_cancelled()) {
                Some(driver) => (driver.generation, driver.commands.clone()),
                None => {
                    tracing::debug!(action = command.action(), "No live driver, dropping command");
                    return Ok(false);
                }
            }
        };

        match commands.try_send(line) {
            Ok(()) => {
                tracing::debug!(action = command.action(), generation, "Queued command");
                Ok(true)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(action = command.action(), generation, "Driver command queue full");
                Err(SupervisorError::Backlogged(COMMAND_QUEUE_CAPACITY))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(action = command.action(), generation, "Driver gone, dropping command");
                Ok(false)
            }
        }
    }

    /// Kill the live driver and stop scheduling restarts.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let old = self.inner.live.lock().await.take();
        if let Some(old) = old {
            tracing::info!(pid = ?old.pid, "Stopping driver process");
            old.kill.cancel();
            if let Err(e) = old.monitor.await {
                tracing::warn!(error = %e, "Driver monitor task failed");
            }
        }
    }

    /// Whether a driver process is currently alive.
    pub async fn is_running(&self) -> bool {
        self.inner
            .live
            .lock()
            .await
            .as_ref()
            .is_some_and(|d| !d.exited.is_cancelled())
    }

    /// Generation number of the most recently started driver (0 if none).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Number of restarts performed after abnormal exits.
    #[must_use]
    pub fn restart_count(&self) -> u64 {
        self.inner.restarts.load(Ordering::SeqCst)
    }

    async fn monitor(
        self,
        mut process: DriverProcess,
        generation: u64,
        kill: CancellationToken,
        exited: CancellationToken,
    ) {
        let status = tokio::select! {
            status = process.wait() => Some(status),
            () = kill.cancelled() => None,
            () = self.inner.cancel.cancelled() => None,
        };
        exited.cancel();

        match status {
            None => {
                if let Err(e) = process.kill().await {
                    tracing::warn!(error = %e, generation, "Failed to kill driver");
                }
                tracing::info!(generation, "Driver process killed");
            }
            Some(Ok(status)) => {
                tracing::info!(code = ?status.code(), generation, "Driver process exited");
                self.handle_exit(generation, status.code());
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, generation, "Failed to wait on driver");
                self.handle_exit(generation, None);
            }
        }
    }

    fn handle_exit(&self, generation: u64, code: Option<i32>) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        if generation != self.inner.generation.load(Ordering::SeqCst) {
            tracing::debug!(generation, "Ignoring exit of superseded driver");
            return;
        }

        let attempt = if code == Some(0) {
            self.inner.failures.store(0, Ordering::SeqCst);
            0
        } else {
            self.inner.failures.fetch_add(1, Ordering::SeqCst) + 1
        };
        self.schedule_restart(code, attempt);
    }

    fn schedule_restart(&self, code: Option<i32>, attempt: u32) {
        let delay = match self.inner.policy.evaluate(code, attempt) {
            RestartDecision::GiveUp => {
                tracing::info!(code = ?code, "Driver stopped, not restarting");
                return;
            }
            RestartDecision::RestartAfter(delay) => delay,
        };

        tracing::warn!(
            code = ?code,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Driver exited abnormally, scheduling restart"
        );

        let supervisor = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if supervisor.inner.cancel.is_cancelled() {
                return;
            }
            supervisor.inner.restarts.fetch_add(1, Ordering::SeqCst);
            supervisor.launch().await;
        });
    }
}

/// Drain the command queue into the driver's stdin until the driver goes away.
async fn write_commands(
    mut stdin: ChildStdin,
    mut queue: mpsc::Receiver<String>,
    generation: u64,
    exited: CancellationToken,
) {
    loop {
        let line = tokio::select! {
            () = exited.cancelled() => break,
            line = queue.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        let written = tokio::select! {
            () = exited.cancelled() => break,
            result = async {
                stdin.write_all(line.as_bytes()).await?;
                stdin.flush().await
            } => result,
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, generation, "Failed to write to driver");
            break;
        }
    }
    tracing::debug!(generation, "Driver writer stopped");
}
