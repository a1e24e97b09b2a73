//! Integration tests for the driver supervisor using `sh` as a fake driver.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use treadmill_relay::driver::{Command, DriverCommand, DriverOutput};
use treadmill_relay::supervisor::{DeviceSupervisor, FixedDelay, SupervisorError};

fn fake_driver(
    script: &str,
    delay: Duration,
) -> (DeviceSupervisor, mpsc::Receiver<DriverOutput>, CancellationToken) {
    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let supervisor = DeviceSupervisor::new(
        DriverCommand::new("sh").args(["-c", script]),
        Box::new(FixedDelay::new(delay)),
        tx,
        cancel.clone(),
    );
    (supervisor, rx, cancel)
}

async fn wait_for_generation(supervisor: &DeviceSupervisor, generation: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while supervisor.generation() < generation {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("driver was not restarted in time");
}

#[test]
fn supervisor_error_display() {
    let errors = [
        SupervisorError::MissingPipe("stdin"),
        SupervisorError::Backlogged(64),
        SupervisorError::ShuttingDown,
    ];
    for err in errors {
        assert!(!format!("{err}").is_empty());
    }
}

#[tokio::test]
async fn crash_restarts_exactly_once_after_delay() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("crashed");
    // First run crashes with code 1, the restarted driver stays up.
    let script = format!(
        "if [ -f '{m}' ]; then exec sleep 30; else touch '{m}'; exit 1; fi",
        m = marker.display()
    );
    let (supervisor, _rx, _cancel) = fake_driver(&script, Duration::from_millis(400));

    assert_eq!(supervisor.start().await.unwrap(), 1);

    // The crash has happened but the delay has not elapsed yet.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(marker.exists());
    assert_eq!(supervisor.generation(), 1);
    assert_eq!(supervisor.restart_count(), 0);

    wait_for_generation(&supervisor, 2).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(supervisor.restart_count(), 1);
    assert_eq!(supervisor.generation(), 2);
    assert!(supervisor.is_running().await);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn clean_exit_is_not_restarted() {
    let (supervisor, _rx, _cancel) = fake_driver("exit 0", Duration::from_millis(20));

    supervisor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(supervisor.restart_count(), 0);
    assert_eq!(supervisor.generation(), 1);
    assert!(!supervisor.is_running().await);
}

#[tokio::test]
async fn commands_after_exit_are_dropped() {
    let (supervisor, _rx, _cancel) = fake_driver("exit 0", Duration::from_millis(20));
    supervisor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!supervisor.send(&Command::Scan).await.unwrap());
}

#[tokio::test]
async fn cancellation_abandons_pending_restart() {
    let (supervisor, _rx, cancel) = fake_driver("exit 3", Duration::from_millis(200));
    supervisor.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(supervisor.restart_count(), 0);
    assert_eq!(supervisor.generation(), 1);
}

#[tokio::test]
async fn restarted_driver_output_reaches_same_channel() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("run");
    let script = format!(
        "if [ -f '{m}' ]; then echo second; exec sleep 30; else touch '{m}'; echo first; exit 1; fi",
        m = marker.display()
    );
    let (supervisor, mut rx, _cancel) = fake_driver(&script, Duration::from_millis(20));
    supervisor.start().await.unwrap();

    let mut lines = Vec::new();
    while lines.len() < 2 {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(DriverOutput::Text(line))) => lines.push(line),
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }

    assert_eq!(lines, ["first", "second"]);
    supervisor.shutdown().await;
}

#[tokio::test]
async fn driver_ignoring_stdin_does_not_block_supervisor() {
    let (supervisor, _rx, _cancel) = fake_driver("exec sleep 30", Duration::from_millis(20));
    supervisor.start().await.unwrap();

    // Far more than the pipe buffer plus the command queue can hold.
    let address = "A".repeat(4096);
    let mut backlogged = 0;
    for _ in 0..100 {
        let sent = tokio::time::timeout(
            Duration::from_secs(2),
            supervisor.send(&Command::connect(address.clone())),
        )
        .await
        .expect("send blocked on a stalled driver");
        if matches!(sent, Err(SupervisorError::Backlogged(_))) {
            backlogged += 1;
        }
    }
    assert!(backlogged > 0);

    let running = tokio::time::timeout(Duration::from_secs(2), supervisor.is_running())
        .await
        .expect("is_running blocked on a stalled driver");
    assert!(running);

    let generation = tokio::time::timeout(Duration::from_secs(2), supervisor.start())
        .await
        .expect("start blocked on a stalled driver")
        .unwrap();
    assert_eq!(generation, 2);

    tokio::time::timeout(Duration::from_secs(2), supervisor.shutdown())
        .await
        .expect("shutdown blocked on a stalled driver");
    assert!(!supervisor.is_running().await);
}
