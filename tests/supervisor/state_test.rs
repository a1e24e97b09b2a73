//! Tests for the canonical state store.

use treadmill_relay::driver::{
    BeltState, ConnectionStatus, ConnectionUpdate, DeviceMode, DeviceStatus,
};
use treadmill_relay::supervisor::{merge_connection, SessionStore};

/// Small deterministic generator so the sequence test needs no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn field(&mut self, name: &str) -> Option<Option<String>> {
        match self.next() % 4 {
            0 | 1 => None,
            2 => Some(None),
            _ => Some(Some(format!("{name}-{}", self.next() % 100))),
        }
    }
}

#[test]
fn merged_status_keeps_last_value_of_every_field() {
    let mut rng = Lcg(42);

    for _ in 0..500 {
        let len = 1 + rng.next() % 8;
        let mut status = ConnectionStatus::default();
        let mut expected_name = None;
        let mut expected_address = None;
        let mut expected_at = None;

        for step in 0..len {
            let update = ConnectionUpdate {
                // Connected stays true so device fields are never cleared.
                connected: (step == 0 || rng.next() % 2 == 0).then_some(true),
                device_name: rng.field("name"),
                device_address: rng.field("addr"),
                connected_at: rng.field("at"),
            };
            if let Some(v) = &update.device_name {
                expected_name.clone_from(v);
            }
            if let Some(v) = &update.device_address {
                expected_address.clone_from(v);
            }
            if let Some(v) = &update.connected_at {
                expected_at.clone_from(v);
            }
            status = merge_connection(&status, &update);
        }

        assert!(status.connected);
        assert_eq!(status.device_name, expected_name);
        assert_eq!(status.device_address, expected_address);
        assert_eq!(status.connected_at, expected_at);
    }
}

#[test]
fn fields_never_sent_stay_null() {
    let store = SessionStore::new();
    store.apply_connection_update(&ConnectionUpdate {
        connected: Some(true),
        device_name: Some(Some("WalkingPad".to_string())),
        ..Default::default()
    });

    let status = store.connection();
    assert!(status.connected);
    assert_eq!(status.device_name.as_deref(), Some("WalkingPad"));
    assert!(status.device_address.is_none());
    assert!(status.connected_at.is_none());
}

#[test]
fn disconnect_clears_device_fields() {
    let store = SessionStore::new();
    store.apply_connection_update(&ConnectionUpdate::connected("Pad", "AA", "t0"));

    // A bare `connected: false` still drops the stale device details.
    let change = store.apply_connection_update(&ConnectionUpdate {
        connected: Some(false),
        ..Default::default()
    });

    assert_eq!(change.current, ConnectionStatus::default());
    assert!(!change.became_connected());
}

#[test]
fn only_the_false_to_true_edge_counts_as_connect() {
    let store = SessionStore::new();
    let first = store.apply_connection_update(&ConnectionUpdate::connected("Pad", "AA", "t0"));
    let repeat = store.apply_connection_update(&ConnectionUpdate::connected("Pad", "AA", "t1"));

    assert!(first.became_connected());
    assert!(!repeat.became_connected());
    assert_eq!(repeat.current.connected_at.as_deref(), Some("t1"));
}

#[test]
fn status_update_replaces_and_clamps() {
    let store = SessionStore::new();
    assert!(store.device().is_none());

    store.apply_status_update(DeviceStatus {
        speed: 3.0,
        time: 60,
        distance: 50,
        steps: 80,
        mode: DeviceMode::Manual,
        belt_state: BeltState::Running,
    });
    let stored = store.apply_status_update(DeviceStatus {
        speed: 9.9,
        ..Default::default()
    });

    assert!((stored.speed - 6.0).abs() < f64::EPSILON);
    // Replaced wholesale, not merged.
    assert_eq!(store.device().map(|d| d.steps), Some(0));
    assert_eq!(store.device().map(|d| d.mode), Some(DeviceMode::Standby));
}
