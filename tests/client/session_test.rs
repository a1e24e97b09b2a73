//! Scenario tests for the viewer-side session machine.

use std::time::Instant;

use treadmill_relay::client::{
    ActivityLog, ClientSession, Key, Phase, ToastKind, ACTIVITY_LOG_CAPACITY,
};
use treadmill_relay::driver::{
    BeltState, ConnectionStatus, DataPoint, Device, DeviceMode, DeviceStatus, ErrorPayload,
    HistoryMode, LogLevel, ParsedWorkout, WorkoutHistoryResult,
};
use treadmill_relay::relay::{ClientEvent, RelayEvent, SpeedRequest};

fn pad(address: &str) -> Device {
    Device {
        name: "WalkingPad".to_string(),
        address: address.to_string(),
        rssi: -55,
    }
}

fn connected_to(address: &str) -> RelayEvent {
    RelayEvent::ConnectionUpdate(ConnectionStatus {
        connected: true,
        device_name: Some("WalkingPad".to_string()),
        device_address: Some(address.to_string()),
        connected_at: Some("2024-05-01T09:30:00".to_string()),
    })
}

#[test]
fn activity_log_keeps_newest_hundred() {
    let mut log = ActivityLog::new();
    for i in 0..150 {
        log.push(format!("line {i}"), LogLevel::Info);
    }

    assert_eq!(log.len(), ACTIVITY_LOG_CAPACITY);
    let newest: Vec<_> = log.entries().take(2).map(|e| e.message.clone()).collect();
    assert_eq!(newest, ["line 149", "line 148"]);
    assert_eq!(log.entries().last().unwrap().message, "line 50");
}

#[test]
fn full_session_walkthrough() {
    let mut session = ClientSession::new();
    let now = Instant::now();

    // Snapshot sent on connect.
    session.handle_event(RelayEvent::ConnectionUpdate(ConnectionStatus::default()));
    assert_eq!(session.phase(), Phase::Idle);

    assert_eq!(session.scan(), Some(ClientEvent::ScanDevices));
    session.handle_event(RelayEvent::ScanResults(vec![pad("AA")]));
    assert_eq!(
        session.toast().current().unwrap().message,
        "Found 1 WalkingPad device!"
    );

    assert!(session.connect("AA").is_some());
    session.handle_event(connected_to("AA"));
    assert!(session.is_connected());

    session.handle_event(RelayEvent::StatusUpdate(DeviceStatus {
        speed: 1.0,
        mode: DeviceMode::Manual,
        ..Default::default()
    }));
    assert_eq!(session.handle_key(Key::Space, false, now), Some(ClientEvent::StartTreadmill));
    assert_eq!(
        session.handle_key(Key::Digit(3), false, now),
        Some(ClientEvent::SetSpeed(SpeedRequest { speed: 3.0 }))
    );

    session.handle_event(RelayEvent::StatusUpdate(DeviceStatus {
        speed: 3.0,
        mode: DeviceMode::Manual,
        belt_state: BeltState::Running,
        ..Default::default()
    }));
    assert_eq!(session.stop_belt(), Some(ClientEvent::StopTreadmill));

    assert_eq!(session.disconnect(), Some(ClientEvent::DisconnectDevice));
    session.handle_event(RelayEvent::ConnectionUpdate(ConnectionStatus::default()));
    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.device_status().is_none());
}

#[test]
fn zero_devices_shows_error_toast() {
    let mut session = ClientSession::new();
    session.handle_event(RelayEvent::ScanResults(vec![pad("AA")]));
    session.scan();
    session.handle_event(RelayEvent::ScanResults(Vec::new()));

    assert!(session.devices().is_empty());
    let toast = session.toast().current().unwrap();
    assert_eq!(toast.kind, ToastKind::Error);
    assert!(toast.message.contains("No devices detected"));
}

#[test]
fn speed_above_range_is_clamped_before_sending() {
    let mut session = ClientSession::new();
    session.handle_event(connected_to("AA"));

    let Some(ClientEvent::SetSpeed(SpeedRequest { speed })) = session.set_speed(7.0) else {
        panic!("Expected set_speed");
    };
    assert!((speed - 6.0).abs() < f64::EPSILON);

    let json = serde_json::to_string(&ClientEvent::SetSpeed(SpeedRequest { speed })).unwrap();
    assert_eq!(json, r#"{"event":"set_speed","data":{"speed":6.0}}"#);
}

#[test]
fn workout_history_renders_one_row_per_data_point() {
    let mut session = ClientSession::new();
    session.handle_event(connected_to("AA"));

    assert_eq!(
        session.get_workout_history(HistoryMode::All),
        Some(ClientEvent::GetWorkoutHistory {
            mode: HistoryMode::All
        })
    );

    let n = 37u32;
    let data_points: Vec<DataPoint> = (0..n)
        .map(|offset| DataPoint {
            offset,
            value: offset * 7 % 256,
            hex: format!("{:02x}", offset * 7 % 256),
        })
        .collect();
    session.handle_event(RelayEvent::WorkoutHistory(WorkoutHistoryResult {
        timestamp: "2024-05-01T09:30:00".to_string(),
        mode: 1,
        raw_data: None,
        parsed_data: Some(ParsedWorkout {
            length: n as usize,
            hex: String::new(),
            data_points,
        }),
        message: None,
    }));

    let rows = session.history_rows();
    assert_eq!(rows.len(), n as usize);
    assert!(rows.windows(2).all(|pair| pair[0].offset < pair[1].offset));
}

#[test]
fn two_viewers_converge_on_the_same_connection() {
    let mut first = ClientSession::new();
    let mut second = ClientSession::new();

    // The first viewer scans; the second joins mid-scan.
    first.scan();
    let events = [
        RelayEvent::ScanResults(vec![pad("AA")]),
        connected_to("AA"),
    ];
    second.handle_event(RelayEvent::ConnectionUpdate(ConnectionStatus::default()));
    for event in events {
        first.handle_event(event.clone());
        second.handle_event(event);
    }

    assert_eq!(first.phase(), Phase::Connected);
    assert_eq!(second.phase(), Phase::Connected);
    assert_eq!(first.connection(), second.connection());
}

#[test]
fn errors_release_pending_flags() {
    let mut session = ClientSession::new();
    session.handle_event(connected_to("AA"));
    session.get_workout_history(HistoryMode::Recent);

    session.handle_event(RelayEvent::Error(ErrorPayload::new(
        "Workout history retrieval failed: timeout",
    )));

    assert!(!session.is_history_loading());
    assert_eq!(
        session.toast().current().unwrap().message,
        "Failed to load workout history"
    );
    assert!(session.get_workout_history(HistoryMode::Recent).is_some());
}
