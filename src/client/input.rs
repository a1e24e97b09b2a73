//! Line commands accepted by the console client.

use std::str::FromStr;

use crate::driver::HistoryMode;

use super::error::ClientError;
use super::keyboard::Key;

/// One parsed line of console input.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Scan,
    Connect(String),
    Disconnect,
    Start,
    Stop,
    Speed(f64),
    PowerOn,
    PowerOff,
    Status,
    History(HistoryMode),
    Key(Key),
    Log,
    ClearLog,
    Help,
    Quit,
}

/// Help text listing every console command.
pub const HELP: &str = "\
commands:
  scan                 scan for devices
  connect <address>    connect to a scanned device
  disconnect           disconnect from the device
  start | stop         start or stop the belt
  speed <km/h>         set the belt speed (0.0 - 6.0)
  on | off             power the device on or off
  status               show connection and device status
  history [0|1]        load recent (0) or all (1) workouts
  key <space|up|down|1-6>
                       press a shortcut key
  log | clear          show or clear the activity log
  quit                 exit";

impl FromStr for ConsoleCommand {
    type Err = ClientError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(ClientError::UnknownCommand(String::new()));
        };
        let arg = words.next();

        let command = match name.to_ascii_lowercase().as_str() {
            "scan" => Self::Scan,
            "connect" => Self::Connect(
                arg.ok_or_else(|| missing("connect", "expected a device address"))?
                    .to_string(),
            ),
            "disconnect" => Self::Disconnect,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "speed" => {
                let raw = arg.ok_or_else(|| missing("speed", "expected a speed in km/h"))?;
                let speed = raw
                    .parse::<f64>()
                    .map_err(|e| missing("speed", &format!("{raw:?}: {e}")))?;
                Self::Speed(speed)
            }
            "on" => Self::PowerOn,
            "off" => Self::PowerOff,
            "status" => Self::Status,
            "history" => {
                let mode = match arg {
                    None => HistoryMode::default(),
                    Some(raw) => raw
                        .parse::<u8>()
                        .map_err(|e| e.to_string())
                        .and_then(HistoryMode::try_from)
                        .map_err(|reason| missing("history", &reason))?,
                };
                Self::History(mode)
            }
            "key" => {
                let raw = arg.ok_or_else(|| missing("key", "expected space, up, down or 1-6"))?;
                match raw.parse::<Key>() {
                    Ok(Key::Other) | Err(_) => {
                        return Err(missing("key", &format!("unsupported key {raw:?}")))
                    }
                    Ok(key) => Self::Key(key),
                }
            }
            "log" => Self::Log,
            "clear" => Self::ClearLog,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => return Err(ClientError::UnknownCommand(name.to_string())),
        };
        Ok(command)
    }
}

fn missing(command: &'static str, reason: &str) -> ClientError {
    ClientError::InvalidArgument {
        command,
        reason: reason.to_string(),
    }
}
