use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use tracing::warn;

use crate::{Result, SystemError};

lazy_static! {
    pub static ref NOTIFICATIONS_PUBLISHED: IntCounter = IntCounter::new(
        "notifications_published",
        "Data change and event notifications sent in NotificationMessages"
    )
    .expect("metric can not be created");

    pub static ref KEEP_ALIVE_MESSAGES: IntCounter =
        IntCounter::new("keep_alive_messages", "Keep-alive messages sent")
            .expect("metric can not be created");

    pub static ref LATE_PUBLISH_CYCLES: IntCounter = IntCounter::new(
        "late_publish_cycles",
        "Times a subscription owed a message with no publish request queued"
    )
    .expect("metric can not be created");

    pub static ref REPUBLISH_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("republish_requests", "Republish requests by result"),
        &["result"]
    )
    .expect("metric can not be created");

    pub static ref PUBLISH_REQUESTS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("publish_requests_rejected", "Publish requests answered with a fault"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref PUBLISH_REQUEST_WAIT_MS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "publish_request_wait_ms",
            "Time a publish request stayed queued before being answered, in ms"
        )
        .buckets(exponential_buckets(1.0, 2.0, 16).expect("valid buckets"))
    )
    .expect("metric can not be created");

    pub static ref SUBSCRIPTIONS_EXPIRED: IntCounter =
        IntCounter::new("subscriptions_expired", "Subscriptions closed after lifetime expiry")
            .expect("metric can not be created");

    pub static ref SUBSCRIPTIONS_ORPHANED: IntCounter = IntCounter::new(
        "subscriptions_orphaned",
        "Subscriptions kept alive after their session closed"
    )
    .expect("metric can not be created");

    pub static ref SUBSCRIPTIONS_TRANSFERRED: IntCounter =
        IntCounter::new("subscriptions_transferred", "Successful subscription transfers")
            .expect("metric can not be created");

    pub static ref QUEUE_OVERFLOWS: IntCounter = IntCounter::new(
        "monitored_item_queue_overflows",
        "Notifications discarded by a full monitored item queue"
    )
    .expect("metric can not be created");

    pub static ref SAMPLING_FAILURES: IntCounter =
        IntCounter::new("sampling_failures", "Attribute reads that failed while sampling")
            .expect("metric can not be created");

    pub static ref SUBSCRIPTION_MONITORED_ITEMS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("subscription_monitored_items", "Monitored items per subscription"),
        &["session_id", "subscription_id"]
    )
    .expect("metric can not be created");

    pub static ref SUBSCRIPTION_UNACKNOWLEDGED_MESSAGES: IntGaugeVec = IntGaugeVec::new(
        Opts::new(
            "subscription_unacknowledged_messages",
            "Messages held for republishing per subscription"
        ),
        &["session_id", "subscription_id"]
    )
    .expect("metric can not be created");

    pub static ref SUBSCRIPTION_NOTIFICATIONS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("subscription_notifications", "Notifications sent per subscription"),
        &["session_id", "subscription_id"]
    )
    .expect("metric can not be created");

    pub static ref SUBSCRIPTION_LIFETIME_COUNT: IntGaugeVec = IntGaugeVec::new(
        Opts::new(
            "subscription_current_lifetime_count",
            "Publishing intervals elapsed without a publish exchange"
        ),
        &["session_id", "subscription_id"]
    )
    .expect("metric can not be created");

    pub static ref SESSION_SUBSCRIPTIONS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("session_subscriptions", "Live subscriptions per session"),
        &["session_id"]
    )
    .expect("metric can not be created");

    pub static ref SESSION_PUBLISH_REQUESTS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("session_publish_requests", "Publish requests received per session"),
        &["session_id"]
    )
    .expect("metric can not be created");

    pub static ref SESSION_QUEUED_PUBLISH_REQUESTS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("session_queued_publish_requests", "Publish requests waiting per session"),
        &["session_id"]
    )
    .expect("metric can not be created");

    pub static ref SESSION_PUBLISH_REQUESTS_DROPPED: IntGaugeVec = IntGaugeVec::new(
        Opts::new(
            "session_publish_requests_dropped",
            "Publish requests evicted or timed out per session"
        ),
        &["session_id", "reason"]
    )
    .expect("metric can not be created");

    pub static ref SESSION_REPUBLISH_REQUESTS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("session_republish_requests", "Republish requests per session by result"),
        &["session_id", "result"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(NOTIFICATIONS_PUBLISHED.clone()),
        Box::new(KEEP_ALIVE_MESSAGES.clone()),
        Box::new(LATE_PUBLISH_CYCLES.clone()),
        Box::new(REPUBLISH_REQUESTS.clone()),
        Box::new(PUBLISH_REQUESTS_REJECTED.clone()),
        Box::new(PUBLISH_REQUEST_WAIT_MS.clone()),
        Box::new(SUBSCRIPTIONS_EXPIRED.clone()),
        Box::new(SUBSCRIPTIONS_ORPHANED.clone()),
        Box::new(SUBSCRIPTIONS_TRANSFERRED.clone()),
        Box::new(QUEUE_OVERFLOWS.clone()),
        Box::new(SAMPLING_FAILURES.clone()),
        Box::new(SUBSCRIPTION_MONITORED_ITEMS.clone()),
        Box::new(SUBSCRIPTION_UNACKNOWLEDGED_MESSAGES.clone()),
        Box::new(SUBSCRIPTION_NOTIFICATIONS.clone()),
        Box::new(SUBSCRIPTION_LIFETIME_COUNT.clone()),
        Box::new(SESSION_SUBSCRIPTIONS.clone()),
        Box::new(SESSION_PUBLISH_REQUESTS.clone()),
        Box::new(SESSION_QUEUED_PUBLISH_REQUESTS.clone()),
        Box::new(SESSION_PUBLISH_REQUESTS_DROPPED.clone()),
        Box::new(SESSION_REPUBLISH_REQUESTS.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            warn!("collector can not be registered: {:?}", e);
        }
    }
}

/// Renders the default registry in the Prometheus text format.
pub fn gather() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| SystemError::Observability(format!("could not encode metrics: {e}")))?;
    String::from_utf8(buffer)
        .map_err(|e| SystemError::Observability(format!("metrics are not valid utf8: {e}")).into())
}
