use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::VecDeque;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::SessionDiagnostics;
use crate::metrics::{PUBLISH_REQUESTS_REJECTED, PUBLISH_REQUEST_WAIT_MS, SUBSCRIPTIONS_EXPIRED};
use crate::monitored_item::MonitoredItem;
use crate::subscription::{PublishedMessage, Subscription, TickOutcome};
use crate::types::{PublishRequest, PublishResponse, ServiceResult, SessionId, StatusCode, SubscriptionId};
use crate::utils::time::elapsed_ms;

/// All live subscriptions of the server, keyed by id.
pub type SubscriptionArena = HashMap<SubscriptionId, Subscription>;

pub type PublishResponder = oneshot::Sender<ServiceResult<PublishResponse>>;

struct PendingPublish {
    results: Vec<StatusCode>,
    received_at: Instant,
    deadline: Option<Instant>,
    responder: PublishResponder,
}

/// A message produced while no request was queued, sent with the next one.
struct QueuedResponse {
    subscription_id: SubscriptionId,
    available_sequence_numbers: Vec<u32>,
    published: PublishedMessage,
}

/// What a publishing tick changed.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Subscriptions removed after lifetime expiry, with their released items
    pub expired: Vec<(SubscriptionId, Vec<MonitoredItem>)>,
    /// Subscriptions that ran a publishing interval
    pub touched: Vec<SubscriptionId>,
}

/// Per-session pairing of publish requests with subscriptions that have
/// something to say.
///
/// The orphan engine is a `PublishEngine` that never receives requests: its
/// subscriptions only count down their lifetime until a transfer rescues them.
pub struct PublishEngine {
    session_id: Option<SessionId>,
    serves_requests: bool,
    max_publish_requests: usize,
    pending_requests: VecDeque<PendingPublish>,
    pending_responses: VecDeque<QueuedResponse>,
    subscriptions: BTreeSet<SubscriptionId>,
    /// Deleted subscriptions that still hold undelivered notifications
    closed: Vec<Subscription>,
    counters: SessionDiagnostics,
}

impl PublishEngine {
    pub fn new(
        session_id: SessionId,
        max_publish_requests: usize,
    ) -> Self {
        PublishEngine {
            session_id: Some(session_id),
            serves_requests: true,
            max_publish_requests: max_publish_requests.max(1),
            pending_requests: VecDeque::new(),
            pending_responses: VecDeque::new(),
            subscriptions: BTreeSet::new(),
            closed: Vec::new(),
            counters: SessionDiagnostics::default(),
        }
    }

    pub fn orphans() -> Self {
        PublishEngine {
            session_id: None,
            serves_requests: false,
            max_publish_requests: 0,
            pending_requests: VecDeque::new(),
            pending_responses: VecDeque::new(),
            subscriptions: BTreeSet::new(),
            closed: Vec::new(),
            counters: SessionDiagnostics::default(),
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn pending_request_count(&self) -> usize {
        self.pending_requests.len()
    }

    pub fn queued_response_count(&self) -> usize {
        self.pending_responses.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Current counters of a session engine; the orphan engine has none.
    pub fn diagnostics(&self) -> Option<SessionDiagnostics> {
        let session_id = self.session_id?;
        Some(SessionDiagnostics {
            session_id,
            subscription_count: self.subscriptions.len() as u32,
            queued_publish_request_count: self.pending_requests.len() as u32,
            ..self.counters.clone()
        })
    }

    pub fn count_republish(
        &mut self,
        message_sent: bool,
    ) {
        self.counters.republish_request_count += 1;
        if message_sent {
            self.counters.republish_message_count += 1;
        }
    }

    pub fn contains(
        &self,
        subscription_id: SubscriptionId,
    ) -> bool {
        self.subscriptions.contains(&subscription_id)
    }

    pub fn subscription_ids(&self) -> impl Iterator<Item = SubscriptionId> + '_ {
        self.subscriptions.iter().copied()
    }

    pub fn add_subscription(
        &mut self,
        subscription_id: SubscriptionId,
    ) {
        self.subscriptions.insert(subscription_id);
    }

    pub fn remove_subscription(
        &mut self,
        subscription_id: SubscriptionId,
    ) -> bool {
        self.subscriptions.remove(&subscription_id)
    }

    /// Detaches every subscription id, leaving the engine empty.
    pub fn take_subscriptions(&mut self) -> BTreeSet<SubscriptionId> {
        std::mem::take(&mut self.subscriptions)
    }

    /// Keeps a deleted subscription around until its remaining data is sent.
    pub fn add_closed(
        &mut self,
        subscription: Subscription,
    ) {
        if self.serves_requests && subscription.has_pending_notifications() {
            self.closed.push(subscription);
        }
    }

    /// Queues a publish request and answers whatever can be answered now.
    pub fn handle_publish_request(
        &mut self,
        request: PublishRequest,
        responder: PublishResponder,
        now: Instant,
        arena: &mut SubscriptionArena,
    ) {
        self.counters.publish_request_count += 1;
        let results = request
            .subscription_acknowledgements
            .iter()
            .map(|ack| {
                if !self.subscriptions.contains(&ack.subscription_id) {
                    return StatusCode::BAD_SUBSCRIPTION_ID_INVALID;
                }
                arena
                    .get_mut(&ack.subscription_id)
                    .map_or(StatusCode::BAD_SUBSCRIPTION_ID_INVALID, |sub| {
                        sub.acknowledge(ack.sequence_number)
                    })
            })
            .collect();

        if !self.serves_requests || self.is_exhausted() {
            PUBLISH_REQUESTS_REJECTED.with_label_values(&["no_subscription"]).inc();
            let _ = responder.send(Err(StatusCode::BAD_NO_SUBSCRIPTION));
            return;
        }

        for id in &self.subscriptions {
            if let Some(sub) = arena.get_mut(id) {
                sub.count_publish_request();
            }
        }

        let deadline = (!request.timeout_hint.is_zero()).then(|| now + request.timeout_hint);
        self.pending_requests.push_back(PendingPublish {
            results,
            received_at: now,
            deadline,
            responder,
        });
        trace!(
            session_id = ?self.session_id,
            queued = self.pending_requests.len(),
            "publish request queued"
        );

        self.drain_queued_responses(now);
        self.flush_closed(now);
        self.feed_ready(now, arena);

        while self.pending_requests.len() > self.max_publish_requests {
            if let Some(oldest) = self.pending_requests.pop_front() {
                warn!(session_id = ?self.session_id, "too many publish requests, evicting the oldest");
                self.counters.evicted_publish_request_count += 1;
                PUBLISH_REQUESTS_REJECTED.with_label_values(&["too_many"]).inc();
                let _ = oldest.responder.send(Err(StatusCode::BAD_TOO_MANY_PUBLISH_REQUESTS));
            }
        }
    }

    /// Hands a message to the oldest queued request. Without one, the message
    /// is queued unless `requires_immediate` is set.
    ///
    /// Returns whether the message was delivered or queued.
    pub fn deliver(
        &mut self,
        subscription_id: SubscriptionId,
        published: PublishedMessage,
        available_sequence_numbers: Vec<u32>,
        requires_immediate: bool,
        now: Instant,
    ) -> bool {
        if !self.serves_requests {
            return false;
        }
        if !self.pending_requests.is_empty() {
            return self.respond(subscription_id, published, available_sequence_numbers, now);
        }
        if requires_immediate {
            return false;
        }
        self.pending_responses.push_back(QueuedResponse {
            subscription_id,
            available_sequence_numbers,
            published,
        });
        true
    }

    /// Runs the publishing intervals that are due.
    pub fn tick(
        &mut self,
        now: Instant,
        arena: &mut SubscriptionArena,
    ) -> TickReport {
        let mut report = TickReport::default();
        self.expire_requests(now);

        let mut due: Vec<(u8, SubscriptionId)> = self
            .subscriptions
            .iter()
            .filter_map(|id| arena.get(id).filter(|sub| sub.is_due(now)).map(|sub| (sub.priority(), *id)))
            .collect();
        due.sort_by_key(|(priority, id)| (Reverse(*priority), *id));

        let mut expired = Vec::new();
        for (_, id) in due {
            let Some(sub) = arena.get_mut(&id) else {
                continue;
            };
            let request_available = self.serves_requests && !self.pending_requests.is_empty();
            match sub.on_publishing_timer(now, request_available) {
                TickOutcome::Published(published) => {
                    let available = sub.available_sequence_numbers();
                    self.respond(id, published, available, now);
                }
                TickOutcome::Expired => expired.push(id),
                TickOutcome::Idle | TickOutcome::Late => {}
            }
            report.touched.push(id);
        }

        for id in expired {
            self.subscriptions.remove(&id);
            let Some(mut sub) = arena.remove(&id) else {
                continue;
            };
            debug!(session_id = ?self.session_id, subscription_id = id, "subscription expired");
            SUBSCRIPTIONS_EXPIRED.inc();
            let items = sub.expire();
            let notice = sub.status_change_message(StatusCode::BAD_TIMEOUT);
            self.deliver(id, notice, Vec::new(), false, now);
            report.expired.push((id, items));
        }

        self.flush_closed(now);
        self.fail_if_exhausted();
        report
    }

    /// Re-evaluates the engine after subscriptions were added or removed.
    pub fn on_subscriptions_changed(
        &mut self,
        now: Instant,
        arena: &mut SubscriptionArena,
    ) {
        self.drain_queued_responses(now);
        self.flush_closed(now);
        self.feed_ready(now, arena);
        self.fail_if_exhausted();
    }

    /// Fails every queued request with `status`.
    pub fn cancel_pending_requests(
        &mut self,
        status: StatusCode,
    ) -> usize {
        let cancelled = self.pending_requests.len();
        for request in self.pending_requests.drain(..) {
            let _ = request.responder.send(Err(status));
        }
        if cancelled > 0 {
            debug!(session_id = ?self.session_id, cancelled, %status, "publish requests cancelled");
        }
        cancelled
    }

    /// Drops queued responses and closed subscriptions.
    pub fn clear(&mut self) {
        self.pending_responses.clear();
        self.closed.clear();
    }

    pub fn next_deadline(
        &self,
        arena: &SubscriptionArena,
    ) -> Option<Instant> {
        let request_deadline = self.pending_requests.iter().filter_map(|r| r.deadline).min();
        let publish_deadline = self
            .subscriptions
            .iter()
            .filter_map(|id| arena.get(id))
            .map(Subscription::next_deadline)
            .min();
        match (request_deadline, publish_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.subscriptions.is_empty() && self.closed.is_empty() && self.pending_responses.is_empty()
    }

    fn fail_if_exhausted(&mut self) {
        if self.serves_requests && self.is_exhausted() && !self.pending_requests.is_empty() {
            PUBLISH_REQUESTS_REJECTED
                .with_label_values(&["no_subscription"])
                .inc_by(self.pending_requests.len() as u64);
            self.cancel_pending_requests(StatusCode::BAD_NO_SUBSCRIPTION);
        }
    }

    fn expire_requests(
        &mut self,
        now: Instant,
    ) {
        if self.pending_requests.iter().all(|r| r.deadline.map_or(true, |d| d > now)) {
            return;
        }
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_requests)
            .into_iter()
            .partition(|r| r.deadline.is_some_and(|d| d <= now));
        self.pending_requests = kept.into();
        for request in expired {
            self.counters.timed_out_publish_request_count += 1;
            PUBLISH_REQUESTS_REJECTED.with_label_values(&["timeout"]).inc();
            let _ = request.responder.send(Err(StatusCode::BAD_TIMEOUT));
        }
    }

    fn drain_queued_responses(
        &mut self,
        now: Instant,
    ) {
        while !self.pending_requests.is_empty() {
            let Some(queued) = self.pending_responses.pop_front() else {
                break;
            };
            self.respond(
                queued.subscription_id,
                queued.published,
                queued.available_sequence_numbers,
                now,
            );
        }
    }

    fn flush_closed(
        &mut self,
        now: Instant,
    ) {
        let mut closed = std::mem::take(&mut self.closed);
        for sub in closed.iter_mut() {
            while !self.pending_requests.is_empty() {
                let Some(published) = sub.publish_on_request() else {
                    break;
                };
                self.respond(sub.id(), published, Vec::new(), now);
            }
        }
        closed.retain(Subscription::has_pending_notifications);
        self.closed = closed;
    }

    /// Answers queued requests from subscriptions that owe a message, picking
    /// subscriptions that never published first, then by priority, then the
    /// one closest to lifetime expiry.
    fn feed_ready(
        &mut self,
        now: Instant,
        arena: &mut SubscriptionArena,
    ) {
        if self.pending_requests.is_empty() {
            return;
        }
        let mut candidates: Vec<_> = self
            .subscriptions
            .iter()
            .filter_map(|id| arena.get(id).filter(|sub| sub.is_ready_to_publish()))
            .map(|sub| {
                (
                    sub.has_sent_first_message(),
                    Reverse(sub.priority()),
                    sub.remaining_lifetime(),
                    sub.id(),
                )
            })
            .collect();
        candidates.sort();

        for (_, _, _, id) in candidates {
            while !self.pending_requests.is_empty() {
                let Some(sub) = arena.get_mut(&id) else {
                    break;
                };
                let Some(published) = sub.publish_on_request() else {
                    break;
                };
                let available = sub.available_sequence_numbers();
                self.respond(id, published, available, now);
            }
            if self.pending_requests.is_empty() {
                break;
            }
        }
    }

    fn respond(
        &mut self,
        subscription_id: SubscriptionId,
        published: PublishedMessage,
        available_sequence_numbers: Vec<u32>,
        now: Instant,
    ) -> bool {
        let Some(request) = self.pending_requests.pop_front() else {
            return false;
        };
        PUBLISH_REQUEST_WAIT_MS.observe(elapsed_ms(request.received_at, now));
        let response = PublishResponse {
            subscription_id,
            available_sequence_numbers,
            more_notifications: published.more_notifications,
            notification_message: published.message,
            results: request.results,
        };
        if request.responder.send(Ok(response)).is_err() {
            debug!(
                session_id = ?self.session_id,
                subscription_id,
                "publish requester went away, message stays available for republish"
            );
        }
        true
    }
}
