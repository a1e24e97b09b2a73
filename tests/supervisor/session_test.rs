//! Tests for the shared session wiring a fake driver to the broadcaster.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use treadmill_relay::driver::{DriverCommand, HistoryMode, LogLevel};
use treadmill_relay::relay::{ClientEvent, RelayEvent, SpeedRequest};
use treadmill_relay::session::{Session, SessionOptions};
use treadmill_relay::supervisor::FixedDelay;

/// Announces a connection, then echoes every command back as a log line.
const ECHO_DRIVER: &str = r#"printf '{"type":"connection_update","data":{"connected":true,"device_name":"Pad","device_address":"AA"}}\n'
while read line; do printf '{"type":"log","data":{"message":"%s"}}\n' "$(echo "$line" | tr -d '"')"; done"#;

fn start(script: &str, power_on: Option<Duration>) -> (Arc<Session>, broadcast::Receiver<RelayEvent>) {
    let (session, outputs) = Session::create(
        DriverCommand::new("sh").args(["-c", script]),
        Box::new(FixedDelay::new(Duration::from_millis(50))),
        SessionOptions {
            auto_power_on_delay: power_on,
            ..Default::default()
        },
        CancellationToken::new(),
    );
    let (_snapshot, rx) = session.subscribe();
    tokio::spawn(Arc::clone(&session).run(outputs));
    (session, rx)
}

async fn next_event(rx: &mut broadcast::Receiver<RelayEvent>) -> RelayEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for relay event")
        .expect("broadcast closed")
}

async fn next_log(rx: &mut broadcast::Receiver<RelayEvent>) -> String {
    loop {
        if let RelayEvent::Log(log) = next_event(rx).await {
            return log.message;
        }
    }
}

#[tokio::test]
async fn connect_triggers_one_automatic_power_on() {
    let (session, mut rx) = start(ECHO_DRIVER, Some(Duration::from_millis(50)));

    match next_event(&mut rx).await {
        RelayEvent::ConnectionUpdate(status) => {
            assert!(status.connected);
            assert_eq!(status.display_name(), "Pad");
        }
        other => panic!("Expected connection_update, got {other:?}"),
    }
    assert_eq!(next_log(&mut rx).await, "{action:power_on}");

    // No second power_on is sent without a new connect edge.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());

    session.shutdown().await;
}

#[tokio::test]
async fn client_requests_reach_driver_in_order() {
    let (session, mut rx) = start(ECHO_DRIVER, None);
    next_event(&mut rx).await;

    let requests = [
        ClientEvent::SetSpeed(SpeedRequest { speed: 7.0 }),
        ClientEvent::StartTreadmill,
        ClientEvent::GetWorkoutHistory {
            mode: HistoryMode::All,
        },
    ];
    for request in requests {
        assert!(session.handle_client(request).await.unwrap());
    }

    assert_eq!(next_log(&mut rx).await, "{action:set_speed,speed:6.0}");
    assert_eq!(next_log(&mut rx).await, "{action:start}");
    assert_eq!(next_log(&mut rx).await, "{action:get_workout_history,mode:1}");

    session.shutdown().await;
}

#[tokio::test]
async fn stderr_and_plain_text_are_relayed() {
    let (session, mut rx) = start("echo hello from driver; echo traceback >&2; exec sleep 30", None);

    let mut saw_text = false;
    let mut saw_error = false;
    while !(saw_text && saw_error) {
        match next_event(&mut rx).await {
            RelayEvent::Log(log) => {
                assert_eq!(log.message, "hello from driver");
                assert_eq!(log.level, LogLevel::Info);
                saw_text = true;
            }
            RelayEvent::Error(error) => {
                assert_eq!(error.message, "traceback");
                saw_error = true;
            }
            other => panic!("Unexpected event {other:?}"),
        }
    }

    session.shutdown().await;
}

#[tokio::test]
async fn shutdown_kills_driver() {
    let (session, _rx) = start("exec sleep 30", None);
    tokio::time::timeout(Duration::from_secs(5), async {
        while !session.supervisor().is_running().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    session.shutdown().await;

    assert!(!session.supervisor().is_running().await);
    assert!(session.cancellation_token().is_cancelled());
    assert!(!session.handle_client(ClientEvent::ScanDevices).await.unwrap());
}
