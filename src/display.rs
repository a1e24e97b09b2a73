//! Colored terminal output for the console client.
//!
//! Formatting helpers are pure and tested; the `print_*` functions write one
//! tagged line per item to stdout.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::client::{LogEntry, Toast, ToastKind};
use crate::driver::{ConnectionStatus, DataPoint, Device, DeviceStatus, LogLevel};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate a string to a maximum number of characters, adding an ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

/// Format elapsed seconds as `m:ss`, or `h:mm:ss` from one hour up.
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Format a distance in meters, switching to kilometers at 1000 m.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_distance(meters: u64) -> String {
    if meters < 1000 {
        format!("{meters} m")
    } else {
        format!("{:.2} km", meters as f64 / 1000.0)
    }
}

#[must_use]
pub fn format_speed(speed: f64) -> String {
    format!("{speed:.1} km/h")
}

/// Print a toast notification.
pub fn print_toast(toast: &Toast) {
    let tag = match toast.kind {
        ToastKind::Info => "[INFO]".blue().bold().to_string(),
        ToastKind::Success => "[OK]".green().bold().to_string(),
        ToastKind::Error => "[ERROR]".red().bold().to_string(),
    };
    println!("{} {} {}", timestamp().dimmed(), tag, toast.message.bold());
    let _ = io::stdout().flush();
}

/// Print one activity log line.
pub fn print_log_entry(entry: &LogEntry) {
    let ts = entry.timestamp.format("%H:%M:%S").to_string();
    match entry.level {
        LogLevel::Info => println!("{} {} {}", ts.dimmed(), "[LOG]".cyan(), entry.message),
        LogLevel::Warning => println!(
            "{} {} {}",
            ts.dimmed(),
            "[WARN]".yellow(),
            entry.message.yellow()
        ),
        LogLevel::Error => println!(
            "{} {} {}",
            ts.dimmed(),
            "[ERR]".red(),
            entry.message.red()
        ),
    }
    let _ = io::stdout().flush();
}

/// Print connection and device status.
pub fn print_status(
    connection: &ConnectionStatus,
    device: Option<&DeviceStatus>,
    countdown: Option<u64>,
) {
    if connection.connected {
        println!(
            "{} {} {} ({})",
            "[DEVICE]".magenta().bold(),
            "connected".green(),
            connection.display_name().bold(),
            connection.device_address.as_deref().unwrap_or("-").dimmed()
        );
    } else {
        println!("{} {}", "[DEVICE]".magenta().bold(), "disconnected".red());
    }

    if let Some(status) = device {
        println!(
            "{} speed={} time={} distance={} steps={} mode={} belt={}",
            "[STATUS]".magenta().bold(),
            format_speed(status.speed).cyan(),
            format_elapsed(status.time),
            format_distance(status.distance),
            status.steps,
            status.mode,
            status.belt_state
        );
    }

    if let Some(seconds) = countdown {
        println!("{} starting in {seconds}...", "[BELT]".yellow().bold());
    }
    let _ = io::stdout().flush();
}

/// Print scanned devices, one per line.
pub fn print_devices(devices: &[Device]) {
    for device in devices {
        println!(
            "  {} {} {}",
            device.address.cyan(),
            truncate(&device.name, 32).bold(),
            format!("rssi={}", device.rssi).dimmed()
        );
    }
    let _ = io::stdout().flush();
}

/// Print workout history rows as an offset/value/hex table.
pub fn print_history(rows: &[DataPoint]) {
    println!("{}", "offset  value  hex".bold());
    for row in rows {
        println!("{:>6}  {:>5}  {}", row.offset, row.value, row.hex.dimmed());
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}

/// Print plain informational text.
pub fn print_text(text: &str) {
    println!("{text}");
    let _ = io::stdout().flush();
}
