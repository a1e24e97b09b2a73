//! Console client: drives a [`ClientSession`] over the relay WebSocket.

use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use crate::display;
use crate::relay::{ClientEvent, RelayEvent};

use super::error::ClientError;
use super::input::{ConsoleCommand, HELP};
use super::machine::ClientSession;

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Send this event to the relay.
    Send(ClientEvent),
    /// Print local state only.
    Show(View),
    /// The command is not valid in the current state.
    Rejected(&'static str),
    Quit,
}

/// Local views the console can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Status,
    Log,
    Help,
    Cleared,
}

/// Map a console command onto the session machine.
pub fn dispatch(session: &mut ClientSession, command: ConsoleCommand, now: Instant) -> Dispatch {
    let event = match command {
        ConsoleCommand::Scan => session.scan(),
        ConsoleCommand::Connect(address) => session.connect(&address),
        ConsoleCommand::Disconnect => session.disconnect(),
        ConsoleCommand::Start => session.start_belt(now),
        ConsoleCommand::Stop => session.stop_belt(),
        ConsoleCommand::Speed(speed) => session.set_speed(speed),
        ConsoleCommand::PowerOn => session.power_on(),
        ConsoleCommand::PowerOff => session.power_off(),
        ConsoleCommand::History(mode) => session.get_workout_history(mode),
        ConsoleCommand::Key(key) => session.handle_key(key, false, now),
        ConsoleCommand::Status => {
            return match session.get_status() {
                Some(event) => Dispatch::Send(event),
                None => Dispatch::Show(View::Status),
            }
        }
        ConsoleCommand::Log => return Dispatch::Show(View::Log),
        ConsoleCommand::ClearLog => {
            session.log_mut().clear();
            return Dispatch::Show(View::Cleared);
        }
        ConsoleCommand::Help => return Dispatch::Show(View::Help),
        ConsoleCommand::Quit => return Dispatch::Quit,
    };
    event.map_or_else(|| Dispatch::Rejected(rejection(session)), Dispatch::Send)
}

fn rejection(session: &ClientSession) -> &'static str {
    use super::machine::Phase;
    match session.phase() {
        Phase::Scanning => "a scan is already running",
        Phase::Connecting => "a connection attempt is in progress",
        Phase::Connected if session.is_history_loading() => "workout history is still loading",
        Phase::Connected => "not available while connected, in standby or during the start countdown",
        Phase::Idle | Phase::DevicesListed => "not connected to a device (scan and connect first)",
    }
}

/// Interactive client connected to a relay.
pub struct ConsoleClient {
    url: String,
    session: ClientSession,
    /// Value of `ActivityLog::pushed` at the last render.
    rendered: u64,
}

impl ConsoleClient {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session: ClientSession::new(),
            rendered: 0,
        }
    }

    #[must_use]
    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// Connect and run until `quit`, end of input, relay close or cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay cannot be reached or the socket fails.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ClientError> {
        let (ws_stream, _response) =
            connect_async(self.url.as_str())
                .await
                .map_err(|source| ClientError::Connect {
                    url: self.url.clone(),
                    source: Box::new(source),
                })?;
        tracing::info!(url = %self.url, "Connected to relay");
        display::print_text(HELP);

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,

                frame = ws_stream.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => self.handle_frame(text.as_str()),
                        Some(Ok(WsMessage::Close(_))) | None => {
                            tracing::info!("Relay closed the connection");
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err.into()),
                    }
                }

                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let command = match line.parse::<ConsoleCommand>() {
                        Ok(command) => command,
                        Err(err) => {
                            display::print_error(&err.to_string());
                            continue;
                        }
                    };
                    match dispatch(&mut self.session, command, Instant::now()) {
                        Dispatch::Send(event) => {
                            let json = serde_json::to_string(&event)?;
                            tracing::debug!(event = %json, "Sending client event");
                            ws_sink.send(WsMessage::Text(json.into())).await?;
                        }
                        Dispatch::Show(view) => self.show(view),
                        Dispatch::Rejected(reason) => display::print_error(reason),
                        Dispatch::Quit => break,
                    }
                    self.render_updates();
                }
            }
        }

        let _ = ws_sink.send(WsMessage::Close(None)).await;
        Ok(())
    }

    fn handle_frame(&mut self, text: &str) {
        let event = match serde_json::from_str::<RelayEvent>(text) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "Ignoring malformed relay frame");
                return;
            }
        };
        let name = event.name();
        self.session.handle_event(event);
        self.render_updates();

        match name {
            "scan_results" => display::print_devices(self.session.devices()),
            "workout_history" if !self.session.history_rows().is_empty() => {
                display::print_history(self.session.history_rows());
            }
            _ => {}
        }
    }

    /// Print log entries and the toast added since the last render.
    fn render_updates(&mut self) {
        let log = self.session.log();
        let fresh = usize::try_from(log.pushed() - self.rendered)
            .unwrap_or(usize::MAX)
            .min(log.len());
        let entries: Vec<_> = log.entries().take(fresh).collect();
        for entry in entries.into_iter().rev() {
            display::print_log_entry(entry);
        }
        self.rendered = log.pushed();

        if let Some(toast) = self.session.toast_mut().take_unseen() {
            display::print_toast(toast);
        }
    }

    fn show(&self, view: View) {
        match view {
            View::Status => display::print_status(
                self.session.connection(),
                self.session.device_status(),
                self.session.countdown_remaining(Instant::now()),
            ),
            View::Log => {
                let entries: Vec<_> = self.session.log().entries().collect();
                for entry in entries.into_iter().rev() {
                    display::print_log_entry(entry);
                }
            }
            View::Help => display::print_text(HELP),
            View::Cleared => display::print_text("Activity log cleared"),
        }
    }
}
