use herald_core::{ContextType, Event, ListenOutcome, Outcome};
use herald_testing::fixtures::{network_status_event, MaintenanceNotice, ServiceStatusUpdate};
use herald_testing::{assert_outcomes, Recorder};
use pretty_assertions::assert_eq;

fn notice() -> ContextType {
    ContextType::of::<MaintenanceNotice>()
}

#[test]
fn test_held_notice_is_replayed_once_to_first_listener() {
    let mut event: Event<&'static str> = network_status_event(true);

    let report = event.dispatch(MaintenanceNotice::scheduled("core switch upgrade", 2)).unwrap();
    assert!(report.is_empty());
    assert_eq!(event.held(), vec![notice()]);

    let recorder = Recorder::<MaintenanceNotice>::new();
    let outcome = event
        .subscribe()
        .unwrap()
        .listen::<MaintenanceNotice, _>(recorder.listener("seen"))
        .unwrap();

    let replay = outcome.replayed().expect("held notice should be replayed");
    assert_outcomes(replay, &[("network-status-0", Outcome::Uncertain)]);
    assert_eq!(recorder.last().map(|n| n.message), Some("core switch upgrade".to_string()));
    assert!(!event.has_held(notice()));

    // A later listener for the same type gets nothing automatically.
    let outcome = event
        .subscribe()
        .unwrap()
        .listen::<MaintenanceNotice, _>(recorder.listener("late"))
        .unwrap();
    assert!(matches!(outcome, ListenOutcome::Listening));
    assert_eq!(recorder.len(), 1);
}

#[test]
fn test_newest_held_notice_wins() {
    let mut event: Event = network_status_event(true);
    event.dispatch(MaintenanceNotice::scheduled("first window", 1)).unwrap();
    event.dispatch(MaintenanceNotice::scheduled("second window", 1)).unwrap();
    assert_eq!(event.held().len(), 1);

    let recorder = Recorder::<MaintenanceNotice>::new();
    event
        .subscribe()
        .unwrap()
        .listen::<MaintenanceNotice, _>(recorder.listener(()))
        .unwrap();

    let messages: Vec<String> = recorder.seen().into_iter().map(|n| n.message).collect();
    assert_eq!(messages, vec!["second window".to_string()]);
}

#[test]
fn test_notice_is_held_when_nobody_listens_for_it() {
    let mut event: Event = network_status_event(true);
    event
        .subscribe()
        .unwrap()
        .listen(|_: &ServiceStatusUpdate| Ok(()))
        .unwrap();

    let report = event.dispatch(MaintenanceNotice::scheduled("fiber repair", 4)).unwrap();
    assert_outcomes(&report, &[("network-status-0", Outcome::NotListening)]);
    assert!(event.has_held(notice()));

    // The existing subscriber starting to listen also triggers the replay.
    let outcome = event
        .subscription_mut("network-status-0")
        .unwrap()
        .listen(|_: &MaintenanceNotice| Ok(()))
        .unwrap();
    assert_eq!(outcome.replayed().map(|r| r.listener_count()), Some(1));
    assert!(event.held().is_empty());
}

#[test]
fn test_delivered_notice_is_not_held() {
    let mut event: Event = network_status_event(true);
    event
        .subscribe()
        .unwrap()
        .listen(|_: &MaintenanceNotice| Ok(()))
        .unwrap();

    let report = event.dispatch(MaintenanceNotice::scheduled("dns migration", 1)).unwrap();
    assert_eq!(report.listener_count(), 1);
    assert!(event.held().is_empty());
}

#[test]
fn test_non_deferrable_context_is_never_held() {
    let mut event: Event = network_status_event(true);
    event.dispatch(ServiceStatusUpdate::down()).unwrap();
    assert!(event.held().is_empty());

    let outcome = event
        .subscribe()
        .unwrap()
        .listen(|_: &ServiceStatusUpdate| Ok(()))
        .unwrap();
    assert!(matches!(outcome, ListenOutcome::Listening));
}

#[test]
fn test_queue_disabled_holds_nothing() {
    let mut event: Event = network_status_event(false);
    event.dispatch(MaintenanceNotice::scheduled("ignored", 1)).unwrap();

    assert!(!event.has_behavior_queue());
    assert!(!event.has_held(notice()));
}

#[test]
fn test_replay_reaches_every_subscriber_and_counts_as_emit() {
    let mut event: Event<u8> = network_status_event(true);
    event.subscribe().unwrap();
    event.subscribe().unwrap().disconnect();

    event.dispatch(MaintenanceNotice::scheduled("power work", 3)).unwrap();
    // The disconnected subscriber was evicted by that dispatch.
    assert_eq!(event.count(), 1);
    assert!(event.has_held(notice()));

    let outcome = event
        .subscribe()
        .unwrap()
        .listen(|_: &MaintenanceNotice| Ok(9))
        .unwrap();
    let replay = outcome.replayed().unwrap();
    assert_outcomes(
        replay,
        &[
            ("network-status-0", Outcome::NotListening),
            ("network-status-2", Outcome::Uncertain),
        ],
    );
    assert_eq!(event.stats().map(|s| s.emits(notice())), Some(2));
}

#[test]
fn test_failed_replay_is_not_held_again() {
    let mut event: Event = network_status_event(true);
    event.dispatch(MaintenanceNotice::scheduled("router reboot", 1)).unwrap();

    let outcome = event
        .subscribe()
        .unwrap()
        .listen(|_: &MaintenanceNotice| -> anyhow::Result<()> { anyhow::bail!("pager unavailable") })
        .unwrap();

    let replay = outcome.replayed().unwrap();
    assert_eq!(replay.listener_count(), 0);
    assert_outcomes(replay, &[("network-status-0", Outcome::Error)]);
    assert!(event.held().is_empty());
}
