//! Line parser for driver stdout and stderr.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::driver::DriverMessage;

/// Default buffer size for driver output channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// One unit of output observed from the driver process.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverOutput {
    /// A well-formed protocol message from stdout.
    Message(DriverMessage),
    /// A stdout line that is not a protocol message.
    Text(String),
    /// A line from the diagnostic stream (stderr).
    Diagnostic(String),
}

/// Parser for the driver's line protocol.
pub struct StreamParser;

impl StreamParser {
    /// Parse one stdout line.
    ///
    /// Blank lines yield `None`. Lines that are not valid protocol messages are
    /// kept as [`DriverOutput::Text`] so unstructured driver output stays visible.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<DriverOutput> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<DriverMessage>(trimmed) {
            Ok(message) => Some(DriverOutput::Message(message)),
            Err(e) => {
                tracing::trace!(error = %e, "Driver line is not a protocol message");
                Some(DriverOutput::Text(trimmed.to_string()))
            }
        }
    }

    /// Spawn a task that reads `stdout` line by line and forwards parsed output.
    ///
    /// The task ends at EOF, on a read error, or once `tx` is closed.
    pub fn forward_stdout<R>(stdout: R, tx: mpsc::Sender<DriverOutput>) -> tokio::task::JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        if let Some(output) = Self::parse_line(&line) {
                            if tx.send(output).await.is_err() {
                                tracing::debug!("Driver output channel closed");
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read driver stdout");
                        break;
                    }
                }
            }
            tracing::debug!("Driver stdout reader finished");
        })
    }

    /// Spawn a task that forwards every non-blank stderr line as a diagnostic.
    pub fn forward_stderr<R>(stderr: R, tx: mpsc::Sender<DriverOutput>) -> tokio::task::JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end();
                        if line.trim().is_empty() {
                            continue;
                        }
                        if tx
                            .send(DriverOutput::Diagnostic(line.to_string()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read driver stderr");
                        break;
                    }
                }
            }
            tracing::debug!("Driver stderr reader finished");
        })
    }

    /// Forward `stdout` into a fresh channel.
    ///
    /// For callers that read a driver's output without a
    /// [`DeviceSupervisor`](crate::supervisor::DeviceSupervisor), such as a
    /// one-shot driver probe or a replay of recorded driver output.
    #[must_use]
    pub fn into_channel<R>(stdout: R, buffer: usize) -> mpsc::Receiver<DriverOutput>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer);
        Self::forward_stdout(stdout, tx);
        rx
    }
}
