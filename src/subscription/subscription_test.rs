use tokio::time::Duration;
use tokio::time::Instant;

use super::*;
use crate::address_space::MemoryAddressSpace;
use crate::config::{MonitoredItemConfig, SubscriptionConfig};
use crate::monitored_item::MonitoredItem;
use crate::types::{
    DataValue, MonitoredItemCreateRequest, MonitoringMode, MonitoringParameters, NodeId, ReadValueId, StatusCode,
    TimestampsToReturn,
};

fn params(
    publishing_interval: f64,
    max_keep_alive_count: u32,
    lifetime_count: u32,
    max_notifications_per_publish: u32,
) -> RevisedParameters {
    RevisedParameters {
        publishing_interval,
        lifetime_count,
        max_keep_alive_count,
        max_notifications_per_publish,
    }
}

fn subscription(
    params: RevisedParameters,
    now: Instant,
) -> Subscription {
    Subscription::new(1, Some(1), params, 0, true, 32, now)
}

fn item(
    id: u32,
    queue_size: u32,
) -> MonitoredItem {
    let space = MemoryAddressSpace::new();
    space.add_variable(NodeId::numeric(2, 1), DataValue::new(0.0));
    let request = MonitoredItemCreateRequest {
        item_to_monitor: ReadValueId::value(NodeId::numeric(2, 1)),
        monitoring_mode: MonitoringMode::Reporting,
        requested_parameters: MonitoringParameters {
            client_handle: id * 10,
            queue_size,
            ..Default::default()
        },
    };
    MonitoredItem::new(
        id,
        &request,
        TimestampsToReturn::Both,
        100.0,
        &MonitoredItemConfig::default(),
        &space,
    )
    .map(|(item, _)| item)
    .expect("valid item")
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn record(
    subscription: &mut Subscription,
    item_id: u32,
    values: impl IntoIterator<Item = i32>,
) {
    let item = subscription.item_mut(item_id).expect("item exists");
    for value in values {
        item.record_value(DataValue::new(value), 0);
    }
}

fn published(outcome: TickOutcome) -> PublishedMessage {
    match outcome {
        TickOutcome::Published(published) => published,
        other => panic!("expected a published message, got {other:?}"),
    }
}

// ============================================================================
// Parameter revision
// ============================================================================

#[test]
fn test_revise_clamps_to_server_limits() {
    let config = SubscriptionConfig::default();

    let revised = RevisedParameters::revise(1.0, 1, 0, 0, &config);
    assert_eq!(revised.publishing_interval, config.min_publishing_interval_ms);
    assert_eq!(revised.max_keep_alive_count, config.default_keep_alive_count);
    assert_eq!(revised.lifetime_count, config.default_keep_alive_count * 3);
    assert_eq!(revised.max_notifications_per_publish, config.max_notifications_per_publish);

    let revised = RevisedParameters::revise(f64::NAN, u32::MAX, u32::MAX, 5, &config);
    assert_eq!(revised.publishing_interval, config.min_publishing_interval_ms);
    assert_eq!(revised.max_keep_alive_count, config.max_keep_alive_count);
    assert_eq!(revised.lifetime_count, config.max_lifetime_count);
    assert_eq!(revised.max_notifications_per_publish, 5);

    let revised = RevisedParameters::revise(1e12, 100, 10, 0, &config);
    assert_eq!(revised.publishing_interval, config.max_publishing_interval_ms);
    assert_eq!(revised.lifetime_count, 100);
}

#[test]
fn test_revise_keeps_unlimited_notifications_when_server_allows() {
    let config = SubscriptionConfig {
        max_notifications_per_publish: 0,
        ..Default::default()
    };
    assert_eq!(RevisedParameters::revise(100.0, 30, 10, 0, &config).max_notifications_per_publish, 0);
    assert_eq!(RevisedParameters::revise(100.0, 30, 10, 7, &config).max_notifications_per_publish, 7);
}

// ============================================================================
// Keep-alive and lifetime
// ============================================================================

#[test]
fn test_idle_subscription_sends_one_keep_alive_per_keep_alive_period() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 3, 30, 0), start);

    assert_eq!(sub.on_publishing_timer(start + ms(100), true), TickOutcome::Idle);
    assert_eq!(sub.state(), SubscriptionState::Normal);
    assert_eq!(sub.on_publishing_timer(start + ms(200), true), TickOutcome::Idle);

    let keep_alive = published(sub.on_publishing_timer(start + ms(300), true));
    assert!(keep_alive.message.is_keep_alive());
    assert_eq!(keep_alive.message.sequence_number, 1);
    assert_eq!(sub.state(), SubscriptionState::KeepAlive);

    assert_eq!(sub.on_publishing_timer(start + ms(400), true), TickOutcome::Idle);
    assert_eq!(sub.next_sequence_number(), 1);
    assert!(sub.available_sequence_numbers().is_empty());
    assert_eq!(sub.diagnostics().keep_alive_message_count, 1);
}

#[test]
fn test_owed_keep_alive_waits_for_a_request() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 1, 10, 0), start);

    assert_eq!(sub.on_publishing_timer(start + ms(100), false), TickOutcome::Late);
    assert_eq!(sub.state(), SubscriptionState::Late);
    assert!(sub.is_ready_to_publish());

    let keep_alive = sub.publish_on_request().expect("keep-alive owed");
    assert!(keep_alive.message.is_keep_alive());
    assert_eq!(sub.diagnostics().current_lifetime_count, 0);
    assert!(sub.publish_on_request().is_none());
}

#[test]
fn test_lifetime_expires_after_consecutive_intervals_without_requests() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 1, 3, 0), start);

    assert_eq!(sub.on_publishing_timer(start + ms(100), false), TickOutcome::Late);
    assert_eq!(sub.on_publishing_timer(start + ms(200), false), TickOutcome::Late);
    assert_eq!(sub.remaining_lifetime(), 1);
    assert_eq!(sub.on_publishing_timer(start + ms(300), false), TickOutcome::Expired);
}

#[test]
fn test_available_request_resets_lifetime() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);

    sub.on_publishing_timer(start + ms(100), false);
    sub.on_publishing_timer(start + ms(200), false);
    assert_eq!(sub.remaining_lifetime(), 28);

    sub.on_publishing_timer(start + ms(300), true);
    assert_eq!(sub.remaining_lifetime(), 30);
}

// ============================================================================
// Publishing
// ============================================================================

#[test]
fn test_data_is_published_with_consecutive_sequence_numbers() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);
    sub.insert_item(item(1, 10));

    record(&mut sub, 1, [1]);
    let first = published(sub.on_publishing_timer(start + ms(100), true));
    assert_eq!(first.message.sequence_number, 1);
    assert_eq!(first.message.data_changes().count(), 1);
    assert!(!first.more_notifications);
    assert!(sub.has_sent_first_message());

    record(&mut sub, 1, [2]);
    let second = published(sub.on_publishing_timer(start + ms(200), true));
    assert_eq!(second.message.sequence_number, 2);
    assert_eq!(sub.available_sequence_numbers(), vec![1, 2]);
}

#[test]
fn test_late_subscription_answers_the_next_request() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);
    sub.insert_item(item(1, 10));
    record(&mut sub, 1, [1, 2]);

    assert_eq!(sub.on_publishing_timer(start + ms(100), false), TickOutcome::Late);
    let message = sub.publish_on_request().expect("data owed").message;

    assert_eq!(message.data_changes().count(), 2);
    assert_eq!(sub.state(), SubscriptionState::Normal);
    assert_eq!(sub.diagnostics().late_publish_request_count, 1);
}

#[test]
fn test_oversized_harvest_is_split_across_messages() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 2), start);
    sub.insert_item(item(1, 10));
    record(&mut sub, 1, 1..=5);

    let first = published(sub.on_publishing_timer(start + ms(100), true));
    assert_eq!(first.message.notification_count(), 2);
    assert!(first.more_notifications);
    assert!(sub.is_ready_to_publish());

    let second = sub.publish_on_request().expect("backlog");
    assert_eq!(second.message.notification_count(), 2);
    assert!(second.more_notifications);

    let third = sub.publish_on_request().expect("backlog");
    assert_eq!(third.message.notification_count(), 1);
    assert!(!third.more_notifications);
    assert_eq!(
        [first, second, third].map(|p| p.message.sequence_number),
        [1, 2, 3]
    );
}

#[test]
fn test_disabled_publishing_holds_notifications() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 1, 30, 0), start);
    sub.insert_item(item(1, 10));
    sub.set_publishing_enabled(false);
    record(&mut sub, 1, [1]);

    assert!(!sub.has_pending_notifications());
    let keep_alive = published(sub.on_publishing_timer(start + ms(100), true));
    assert!(keep_alive.message.is_keep_alive());
    assert_eq!(sub.item(1).map(MonitoredItem::queue_len), Some(1));

    sub.set_publishing_enabled(true);
    let data = published(sub.on_publishing_timer(start + ms(200), true));
    assert_eq!(data.message.data_changes().count(), 1);
    assert_eq!(sub.diagnostics().disable_count, 1);
    assert_eq!(sub.diagnostics().enable_count, 1);
}

// ============================================================================
// Acknowledgement and republish
// ============================================================================

#[test]
fn test_acknowledge_removes_retained_messages() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);
    sub.insert_item(item(1, 10));
    record(&mut sub, 1, [1]);
    published(sub.on_publishing_timer(start + ms(100), true));

    assert_eq!(sub.acknowledge(1), StatusCode::GOOD);
    assert_eq!(sub.acknowledge(1), StatusCode::BAD_SEQUENCE_NUMBER_UNKNOWN);
    assert_eq!(sub.acknowledge(99), StatusCode::BAD_SEQUENCE_NUMBER_UNKNOWN);
    assert!(sub.available_sequence_numbers().is_empty());
}

#[test]
fn test_republish_returns_identical_copy() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);
    sub.insert_item(item(1, 10));
    record(&mut sub, 1, [1]);
    let original = published(sub.on_publishing_timer(start + ms(100), true)).message;

    assert_eq!(sub.republish(1), Ok(original));
    assert_eq!(sub.republish(2), Err(StatusCode::BAD_MESSAGE_NOT_AVAILABLE));

    let diagnostics = sub.diagnostics();
    assert_eq!(diagnostics.republish_request_count, 2);
    assert_eq!(diagnostics.republish_message_count, 1);
}

#[test]
fn test_retransmission_queue_drops_oldest_beyond_limit() {
    let start = Instant::now();
    let mut sub = Subscription::new(1, Some(1), params(100.0, 10, 30, 0), 0, true, 2, start);
    sub.insert_item(item(1, 10));

    for (tick, value) in (1..=3).enumerate() {
        record(&mut sub, 1, [value]);
        published(sub.on_publishing_timer(start + ms(100 * (tick as u64 + 1)), true));
    }

    assert_eq!(sub.available_sequence_numbers(), vec![2, 3]);
    assert_eq!(sub.diagnostics().discarded_message_count, 1);
}

#[test]
fn test_status_change_consumes_sequence_number_without_retention() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);

    let notice = sub.status_change_message(StatusCode::GOOD_SUBSCRIPTION_TRANSFERRED);

    assert_eq!(notice.message.sequence_number, 1);
    assert_eq!(
        notice.message.status_change_code(),
        Some(StatusCode::GOOD_SUBSCRIPTION_TRANSFERRED)
    );
    assert_eq!(sub.next_sequence_number(), 2);
    assert!(sub.available_sequence_numbers().is_empty());
}

// ============================================================================
// Termination and transfer
// ============================================================================

#[test]
fn test_terminate_keeps_harvested_data_for_a_final_publish() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);
    sub.insert_item(item(1, 10));
    record(&mut sub, 1, [1, 2]);

    let released = sub.terminate();

    assert_eq!(released.len(), 1);
    assert_eq!(sub.state(), SubscriptionState::Closed);
    assert_eq!(sub.item_count(), 0);
    assert_eq!(sub.on_publishing_timer(start + ms(100), true), TickOutcome::Idle);
    let last = sub.publish_on_request().expect("final data");
    assert_eq!(last.message.data_changes().count(), 2);
    assert!(sub.publish_on_request().is_none());
}

#[test]
fn test_expire_discards_undelivered_data() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);
    sub.insert_item(item(1, 10));
    record(&mut sub, 1, [1]);

    assert_eq!(sub.expire().len(), 1);
    assert!(!sub.has_pending_notifications());
    assert!(sub.publish_on_request().is_none());
}

#[test]
fn test_transfer_rebinds_session_and_counts() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);
    sub.insert_item(item(1, 10));
    record(&mut sub, 1, [5]);
    sub.item_mut(1).map(MonitoredItem::extract_notifications);

    sub.transfer_to(9);
    assert_eq!(sub.session_id(), Some(9));
    assert_eq!(sub.resend_initial_values(), 1);
    assert!(sub.has_pending_notifications());

    let diagnostics = sub.diagnostics();
    assert_eq!(diagnostics.transfer_request_count, 1);
    assert_eq!(diagnostics.transferred_to_alt_client_count, 1);
}

#[test]
fn test_modify_rearms_timer_and_counts() {
    let start = Instant::now();
    let mut sub = subscription(params(100.0, 10, 30, 0), start);
    let later = start + ms(40);

    sub.modify(params(500.0, 5, 15, 0), 7, later);

    assert_eq!(sub.priority(), 7);
    assert_eq!(sub.next_deadline(), later + ms(500));
    assert!(!sub.is_due(later + ms(499)));
    assert!(sub.is_due(later + ms(500)));
    assert_eq!(sub.diagnostics().modify_count, 1);
}

