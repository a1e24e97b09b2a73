//! Tests for the line protocol spoken with the driver.

use treadmill_relay::driver::{
    BeltState, Command, DeviceMode, DriverMessage, DriverOutput, HistoryMode, LogLevel,
    StreamParser,
};

fn parse(line: &str) -> DriverMessage {
    match StreamParser::parse_line(line) {
        Some(DriverOutput::Message(message)) => message,
        other => panic!("Expected protocol message, got {other:?}"),
    }
}

#[test]
fn status_update_from_bridge() {
    let line = r#"{"type":"status_update","data":{"speed":2.5,"time":125,"distance":0.4,"steps":210,"mode":1,"belt_state":1},"timestamp":"2024-05-01T09:30:00.123456"}"#;
    let DriverMessage::StatusUpdate(status) = parse(line) else {
        panic!("Expected status_update");
    };

    assert!((status.speed - 2.5).abs() < f64::EPSILON);
    assert_eq!(status.time, 125);
    assert_eq!(status.distance, 0);
    assert_eq!(status.steps, 210);
    assert_eq!(status.mode, DeviceMode::Manual);
    assert_eq!(status.belt_state, BeltState::Running);
    assert!(status.is_running());
}

#[test]
fn connection_update_with_nulls() {
    let line = r#"{"type":"connection_update","data":{"connected":false,"device_name":null,"device_address":null,"connected_at":null}}"#;
    let DriverMessage::ConnectionUpdate(update) = parse(line) else {
        panic!("Expected connection_update");
    };

    assert_eq!(update.connected, Some(false));
    assert_eq!(update.device_name, Some(None));
    assert_eq!(update.connected_at, Some(None));
}

#[test]
fn scan_results_and_log() {
    let DriverMessage::ScanResults(devices) = parse(
        r#"{"type":"scan_results","data":[{"name":"WalkingPad","address":"57:4C:42:00:00:01","rssi":-61}]}"#,
    ) else {
        panic!("Expected scan_results");
    };
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].rssi, -61);

    let DriverMessage::Log(log) = parse(
        r#"{"type":"log","data":{"message":"Scanning for devices...","level":"warning","timestamp":"2024-05-01T09:30:00"}}"#,
    ) else {
        panic!("Expected log");
    };
    assert_eq!(log.level, LogLevel::Warning);
    assert_eq!(log.timestamp.as_deref(), Some("2024-05-01T09:30:00"));
}

#[test]
fn empty_workout_history() {
    let line = r#"{"type":"workout_history","data":{"timestamp":"2024-05-01T09:30:00","mode":0,"message":"No workout history available","raw_data":null,"parsed_data":null}}"#;
    let DriverMessage::WorkoutHistory(result) = parse(line) else {
        panic!("Expected workout_history");
    };
    assert!(result.parsed_data.is_none());
    assert_eq!(result.message.as_deref(), Some("No workout history available"));
}

#[test]
fn non_protocol_lines_are_text() {
    assert_eq!(
        StreamParser::parse_line("INFO:bleak:connected\n"),
        Some(DriverOutput::Text("INFO:bleak:connected".to_string()))
    );
    assert_eq!(
        StreamParser::parse_line(r#"{"type":"firmware_blob","data":{}}"#),
        Some(DriverOutput::Text(
            r#"{"type":"firmware_blob","data":{}}"#.to_string()
        ))
    );
    assert_eq!(StreamParser::parse_line("   "), None);
}

#[test]
fn every_command_is_one_json_line() {
    let commands = [
        (Command::Scan, r#"{"action":"scan"}"#),
        (Command::connect("AA:BB"), r#"{"action":"connect","address":"AA:BB"}"#),
        (Command::Disconnect, r#"{"action":"disconnect"}"#),
        (Command::Start, r#"{"action":"start"}"#),
        (Command::Stop, r#"{"action":"stop"}"#),
        (Command::set_speed(3.5), r#"{"action":"set_speed","speed":3.5}"#),
        (Command::PowerOn, r#"{"action":"power_on"}"#),
        (Command::PowerOff, r#"{"action":"power_off"}"#),
        (Command::GetStatus, r#"{"action":"get_status"}"#),
        (
            Command::GetWorkoutHistory {
                mode: HistoryMode::All,
            },
            r#"{"action":"get_workout_history","mode":1}"#,
        ),
    ];

    for (command, expected) in commands {
        let line = command.to_line().unwrap();
        assert_eq!(line, format!("{expected}\n"));
        assert_eq!(line.matches('\n').count(), 1);
    }
}

#[test]
fn set_speed_is_clamped_before_encoding() {
    assert_eq!(
        Command::set_speed(7.0).to_line().unwrap(),
        "{\"action\":\"set_speed\",\"speed\":6.0}\n"
    );
}
