use std::sync::Arc;
use std::time::Duration;

use pour_core::MemoryEventLog;
use pour_core::mocks::{FailingEventLog, ScriptedDevice};
use pour_core::{Coordinator, DeviceSnapshot, DeviceTimeouts, DispenseError, DispenseOutcome, Limits};
use pour_traits::{DeviceReading, DeviceState, EventStatus, ManualClock};
use rstest::rstest;

struct Rig {
    device: Arc<ScriptedDevice>,
    log: Arc<MemoryEventLog>,
    clock: ManualClock,
    coord: Coordinator,
}

fn rig(device: ScriptedDevice) -> Rig {
    let device = Arc::new(device);
    let log = Arc::new(MemoryEventLog::new());
    let clock = ManualClock::at_unix(1_700_000_000);
    let coord = Coordinator::builder()
        .with_device(device.clone())
        .with_event_log(log.clone())
        .with_clock(clock.clone())
        .with_timeouts(DeviceTimeouts {
            status_ms: 1000,
            dispense_ms: 2000,
        })
        .build()
        .expect("build coordinator");
    Rig {
        device,
        log,
        clock,
        coord,
    }
}

fn reading(state: &str, glass_present: bool) -> DeviceReading {
    DeviceReading {
        state: DeviceState::from(state),
        glass_present,
        last_pour_ml: 0,
        uptime: 10,
        error: None,
    }
}

#[tokio::test]
async fn accepted_pour_logs_started_row() {
    let r = rig(ScriptedDevice::ready());

    let out = r.coord.request_dispense(50, "alice").await;
    assert_eq!(
        out,
        DispenseOutcome::Accepted {
            request_id: "req_1700000000".into()
        }
    );
    assert!(!r.coord.is_pouring());

    let events = r.log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Started);
    assert_eq!(events[0].amount_ml, 50);
    assert_eq!(events[0].user_token, "alice");
    assert_eq!(events[0].reason, None);
    assert_eq!(events[0].timestamp.timestamp(), 1_700_000_000);

    let (ml, id, timeout) = r.device.last_dispense().expect("dispense sent");
    assert_eq!(ml, 50);
    assert_eq!(id, "req_1700000000");
    assert_eq!(timeout, Duration::from_millis(2000));
}

#[rstest]
#[case(70)]
#[case(61)]
#[case(0)]
#[case(-5)]
#[tokio::test]
async fn invalid_amount_never_reaches_device(#[case] amount: i64) {
    let r = rig(ScriptedDevice::ready());

    let out = r.coord.request_dispense(amount, "bob").await;
    assert_eq!(
        out,
        DispenseOutcome::Rejected(DispenseError::InvalidAmount {
            amount_ml: amount,
            max_ml: 60
        })
    );
    assert_eq!(r.device.calls(), 0);

    let events = r.log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Failed);
    assert_eq!(
        events[0].reason.as_deref(),
        Some(format!("Invalid amount: {amount}ml").as_str())
    );
}

#[tokio::test]
async fn seventy_ml_reason_names_the_limit() {
    let r = rig(ScriptedDevice::ready());
    let err = r.coord.request_dispense(70, "bob").await.into_result().unwrap_err();
    assert_eq!(err.reason(), "Invalid amount (max 60ml)");
    assert!(r.log.events()[0].reason.as_deref().unwrap().contains("70ml"));
}

#[rstest]
#[case(1)]
#[case(60)]
#[tokio::test]
async fn boundary_amounts_are_accepted(#[case] amount: i64) {
    let r = rig(ScriptedDevice::ready());
    assert!(r.coord.request_dispense(amount, "t").await.is_accepted());
}

#[rstest]
#[case(reading("idle", false), DispenseError::NoGlass, "No glass present")]
#[case(reading("busy", true), DispenseError::DeviceBusy { state: "busy".into() }, "ESP32 not idle: busy")]
#[case(reading("cleaning", true), DispenseError::DeviceBusy { state: "cleaning".into() }, "ESP32 not idle: cleaning")]
#[tokio::test]
async fn device_preconditions_reject_without_command(
    #[case] status: DeviceReading,
    #[case] expected: DispenseError,
    #[case] logged: &str,
) {
    let r = rig(ScriptedDevice::new(Ok(status), Ok(true)));

    let out = r.coord.request_dispense(30, "carol").await;
    assert_eq!(out, DispenseOutcome::Rejected(expected));
    assert_eq!(r.device.status_calls(), 1);
    assert_eq!(r.device.dispense_calls(), 0);

    let events = r.log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Failed);
    assert_eq!(events[0].reason.as_deref(), Some(logged));
}

#[tokio::test]
async fn no_glass_caller_reason() {
    let r = rig(ScriptedDevice::new(Ok(reading("idle", false)), Ok(true)));
    let err = r.coord.request_dispense(30, "c").await.into_result().unwrap_err();
    assert_eq!(err.reason(), "No glass present");
    let r = rig(ScriptedDevice::new(Ok(reading("busy", true)), Ok(true)));
    let err = r.coord.request_dispense(30, "c").await.into_result().unwrap_err();
    assert_eq!(err.reason(), "Device is busy");
}

#[tokio::test]
async fn status_timeout_is_connection_error_and_never_pours() {
    let r = rig(ScriptedDevice::new(
        Err("timed out after 1000ms".into()),
        Ok(true),
    ));

    let out = r.coord.request_dispense(40, "dave").await;
    assert_eq!(
        out,
        DispenseOutcome::Rejected(DispenseError::Unreachable("timed out after 1000ms".into()))
    );
    assert_eq!(
        out.clone().into_result().unwrap_err().reason(),
        "Connection error: timed out after 1000ms"
    );
    assert!(!r.coord.is_pouring());
    assert_eq!(r.device.dispense_calls(), 0);
    assert_eq!(
        r.log.events()[0].reason.as_deref(),
        Some("Connection error: timed out after 1000ms")
    );
}

#[rstest]
#[case(Ok(false), DispenseError::DeviceRejected, "ESP32 rejected request")]
#[case(
    Err("connection reset".into()),
    DispenseError::Unreachable("connection reset".into()),
    "Connection error: connection reset"
)]
#[tokio::test]
async fn failed_command_clears_flag_and_logs(
    #[case] command: Result<bool, String>,
    #[case] expected: DispenseError,
    #[case] logged: &str,
) {
    let r = rig(ScriptedDevice::ready());
    r.device.set_dispense(command);

    let out = r.coord.request_dispense(20, "erin").await;
    assert_eq!(out, DispenseOutcome::Rejected(expected));
    assert!(!r.coord.is_pouring());
    assert_eq!(r.device.dispense_calls(), 1);
    assert_eq!(r.log.events()[0].reason.as_deref(), Some(logged));

    // the slot was released: the next attempt reaches the device again
    r.device.set_dispense(Ok(true));
    assert!(r.coord.request_dispense(20, "erin").await.is_accepted());
}

#[tokio::test]
async fn request_id_follows_the_clock() {
    let r = rig(ScriptedDevice::ready());
    r.clock.advance(chrono::TimeDelta::seconds(42));
    let id = r.coord.request_dispense(10, "f").await.into_result().unwrap();
    assert_eq!(id, "req_1700000042");
}

#[tokio::test]
async fn failing_event_log_does_not_change_outcome() {
    let coord = Coordinator::builder()
        .with_device(ScriptedDevice::ready())
        .with_event_log(FailingEventLog)
        .build()
        .unwrap();

    assert!(coord.request_dispense(50, "g").await.is_accepted());
    assert!(!coord.request_dispense(500, "g").await.is_accepted());
    assert_eq!(coord.dropped_events(), 2);
    assert!(coord.recent_events(None).await.is_err());
}

#[tokio::test]
async fn query_status_reports_reading() {
    let r = rig(ScriptedDevice::new(Ok(reading("idle", true)), Ok(true)));
    let s = r.coord.query_status().await;
    assert!(s.server_online);
    assert!(s.device_online);
    assert!(!s.is_pouring);
    assert_eq!(s.timestamp, 1_700_000_000.0);
    assert_eq!(s.device, DeviceSnapshot::Online(reading("idle", true)));
}

#[tokio::test]
async fn query_status_synthesizes_offline_placeholder() {
    let r = rig(ScriptedDevice::unreachable("connection refused"));
    let s = r.coord.query_status().await;
    assert!(s.server_online);
    assert!(!s.device_online);
    let placeholder = s.device.to_reading();
    assert_eq!(placeholder.state, DeviceState::Offline);
    assert!(!placeholder.glass_present);
    assert_eq!(placeholder.uptime, 0);
    assert_eq!(placeholder.last_pour_ml, 0);
    assert_eq!(placeholder.error.as_deref(), Some("connection refused"));
    // status queries are not logged
    assert!(r.log.is_empty());
}

#[tokio::test]
async fn recent_events_newest_first_and_clamped() {
    let device = ScriptedDevice::ready();
    let log = Arc::new(MemoryEventLog::new());
    let clock = ManualClock::at_unix(1_700_000_000);
    let coord = Coordinator::builder()
        .with_device(device)
        .with_event_log(log.clone())
        .with_clock(clock.clone())
        .with_limits(Limits {
            max_dispense_ml: 60,
            default_log_limit: 3,
            max_log_limit: 5,
        })
        .build()
        .unwrap();

    for ml in 1..=8 {
        coord.request_dispense(ml, "h").await;
        clock.advance(chrono::TimeDelta::seconds(1));
    }

    let newest = coord.recent_events(None).await.unwrap();
    assert_eq!(
        newest.iter().map(|e| e.amount_ml).collect::<Vec<_>>(),
        vec![8, 7, 6]
    );
    assert_eq!(coord.recent_events(Some(100)).await.unwrap().len(), 5);
    assert!(coord.recent_events(Some(0)).await.unwrap().is_empty());
    assert!(coord.recent_events(Some(-3)).await.unwrap().is_empty());
    for pair in coord.recent_events(Some(5)).await.unwrap().windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
}

#[rstest]
#[case("50.5")]
#[case("\"x\"")]
#[tokio::test]
async fn unparsed_amount_is_logged_and_never_reaches_device(#[case] raw: &str) {
    let r = rig(ScriptedDevice::ready());

    let out = r.coord.request_dispense_unparsed(raw, "ivan").await;
    assert_eq!(
        out,
        DispenseOutcome::Rejected(DispenseError::UnparsableAmount {
            raw: raw.into(),
            max_ml: 60
        })
    );
    assert_eq!(out.into_result().unwrap_err().reason(), "Invalid amount (max 60ml)");
    assert_eq!(r.device.calls(), 0);
    assert!(!r.coord.is_pouring());

    let events = r.log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Failed);
    assert_eq!(events[0].amount_ml, 0);
    assert_eq!(events[0].user_token, "ivan");
    assert_eq!(
        events[0].reason.as_deref(),
        Some(format!("Invalid amount: {raw}").as_str())
    );

    // the slot was released
    assert!(r.coord.request_dispense(10, "ivan").await.is_accepted());
}
