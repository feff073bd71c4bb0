use crate::diagnostics::{DiagnosticsSink, NoopDiagnostics, PrometheusDiagnostics};
use crate::metrics::{
    SESSION_PUBLISH_REQUESTS, SESSION_PUBLISH_REQUESTS_DROPPED, SESSION_REPUBLISH_REQUESTS, SESSION_SUBSCRIPTIONS,
    SUBSCRIPTION_LIFETIME_COUNT, SUBSCRIPTION_MONITORED_ITEMS, SUBSCRIPTION_NOTIFICATIONS,
    SUBSCRIPTION_UNACKNOWLEDGED_MESSAGES,
};
use crate::publish_engine::SessionDiagnostics;
use crate::subscription::SubscriptionDiagnostics;

fn snapshot(
    session_id: Option<u32>,
    subscription_id: u32,
) -> SubscriptionDiagnostics {
    SubscriptionDiagnostics {
        subscription_id,
        session_id,
        monitored_item_count: 4,
        unacknowledged_message_count: 2,
        notifications_count: 17,
        ..Default::default()
    }
}

#[test]
fn test_expose_sets_per_subscription_gauges() {
    let sink = PrometheusDiagnostics::new();

    sink.expose(&snapshot(Some(3), 9001));

    assert_eq!(sink.exposed_count(), 1);
    assert_eq!(SUBSCRIPTION_MONITORED_ITEMS.with_label_values(&["3", "9001"]).get(), 4);
    assert_eq!(SUBSCRIPTION_NOTIFICATIONS.with_label_values(&["3", "9001"]).get(), 17);
}

#[test]
fn test_session_change_moves_the_series() {
    let sink = PrometheusDiagnostics::new();
    sink.expose(&snapshot(Some(3), 9002));

    sink.expose(&snapshot(None, 9002));

    assert_eq!(sink.exposed_count(), 1);
    assert!(SUBSCRIPTION_MONITORED_ITEMS
        .remove_label_values(&["3", "9002"])
        .is_err());
    assert_eq!(
        SUBSCRIPTION_UNACKNOWLEDGED_MESSAGES
            .with_label_values(&["none", "9002"])
            .get(),
        2
    );
}

#[test]
fn test_withdraw_removes_the_series() {
    let sink = PrometheusDiagnostics::new();
    sink.expose(&snapshot(Some(5), 9003));

    sink.withdraw(9003);
    sink.withdraw(9003);

    assert_eq!(sink.exposed_count(), 0);
    assert!(SUBSCRIPTION_LIFETIME_COUNT
        .remove_label_values(&["5", "9003"])
        .is_err());
}

fn session_snapshot(session_id: u32) -> SessionDiagnostics {
    SessionDiagnostics {
        session_id,
        subscription_count: 2,
        publish_request_count: 11,
        evicted_publish_request_count: 3,
        timed_out_publish_request_count: 1,
        republish_request_count: 4,
        republish_message_count: 3,
        ..Default::default()
    }
}

#[test]
fn test_expose_session_sets_per_session_gauges() {
    let sink = PrometheusDiagnostics::new();

    sink.expose_session(&session_snapshot(9101));

    assert_eq!(sink.exposed_session_count(), 1);
    assert_eq!(SESSION_SUBSCRIPTIONS.with_label_values(&["9101"]).get(), 2);
    assert_eq!(SESSION_PUBLISH_REQUESTS.with_label_values(&["9101"]).get(), 11);
    assert_eq!(
        SESSION_PUBLISH_REQUESTS_DROPPED
            .with_label_values(&["9101", "too_many"])
            .get(),
        3
    );
    assert_eq!(
        SESSION_REPUBLISH_REQUESTS
            .with_label_values(&["9101", "not_available"])
            .get(),
        1
    );
}

#[test]
fn test_withdraw_session_removes_the_series() {
    let sink = PrometheusDiagnostics::new();
    sink.expose_session(&session_snapshot(9102));

    sink.withdraw_session(9102);
    sink.withdraw_session(9102);

    assert_eq!(sink.exposed_session_count(), 0);
    assert!(SESSION_SUBSCRIPTIONS.remove_label_values(&["9102"]).is_err());
    assert!(SESSION_PUBLISH_REQUESTS_DROPPED
        .remove_label_values(&["9102", "timeout"])
        .is_err());
}

#[test]
fn test_noop_sink_accepts_everything() {
    let sink = NoopDiagnostics;
    sink.expose(&snapshot(Some(1), 1));
    sink.withdraw(1);
    sink.expose_session(&session_snapshot(1));
    sink.withdraw_session(1);
}
