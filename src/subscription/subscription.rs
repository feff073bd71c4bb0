use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::time::SystemTime;

use tokio::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use tracing::trace;

use super::SubscriptionDiagnostics;
use crate::config::SubscriptionConfig;
use crate::constants::INITIAL_SEQUENCE_NUMBER;
use crate::constants::MIN_LIFETIME_TO_KEEP_ALIVE_RATIO;
use crate::metrics::{KEEP_ALIVE_MESSAGES, LATE_PUBLISH_CYCLES, NOTIFICATIONS_PUBLISHED};
use crate::monitored_item::MonitoredItem;
use crate::timer::PublishTimer;
use crate::types::{
    MonitoredItemId, MonitoringMode, Notification, NotificationMessage, ServiceResult, SessionId, StatusCode,
    SubscriptionId,
};
use crate::utils::time::millis_to_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Creating,
    Normal,
    Late,
    KeepAlive,
    Closed,
}

/// Subscription parameters after revision against the server limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevisedParameters {
    /// Milliseconds
    pub publishing_interval: f64,
    pub lifetime_count: u32,
    pub max_keep_alive_count: u32,
    /// 0 means unlimited
    pub max_notifications_per_publish: u32,
}

impl RevisedParameters {
    pub fn revise(
        requested_publishing_interval: f64,
        requested_lifetime_count: u32,
        requested_max_keep_alive_count: u32,
        requested_max_notifications_per_publish: u32,
        config: &SubscriptionConfig,
    ) -> Self {
        let publishing_interval = if requested_publishing_interval > 0.0 {
            requested_publishing_interval.clamp(config.min_publishing_interval_ms, config.max_publishing_interval_ms)
        } else {
            // Also covers NaN.
            config.min_publishing_interval_ms
        };

        let max_keep_alive_count = match requested_max_keep_alive_count {
            0 => config.default_keep_alive_count,
            requested => requested,
        }
        .min(config.max_keep_alive_count);

        let lifetime_count = requested_lifetime_count
            .max(max_keep_alive_count.saturating_mul(MIN_LIFETIME_TO_KEEP_ALIVE_RATIO))
            .min(config.max_lifetime_count);

        let max_notifications_per_publish = match (
            requested_max_notifications_per_publish,
            config.max_notifications_per_publish,
        ) {
            (0, cap) => cap,
            (requested, 0) => requested,
            (requested, cap) => requested.min(cap),
        };

        RevisedParameters {
            publishing_interval,
            lifetime_count,
            max_keep_alive_count,
            max_notifications_per_publish,
        }
    }

    pub fn publishing_duration(&self) -> Duration {
        millis_to_duration(self.publishing_interval)
    }
}

/// A NotificationMessage ready to be paired with a publish request.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub message: NotificationMessage,
    pub more_notifications: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing to send, or nothing owed yet
    Idle,
    /// A message must be delivered now; a request was available
    Published(PublishedMessage),
    /// Something is owed but no request was available
    Late,
    /// Lifetime exhausted; the owner must terminate the subscription
    Expired,
}

/// Aggregates monitored items and turns their queues into sequence-numbered
/// NotificationMessages on the publishing cadence.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    session_id: Option<SessionId>,
    params: RevisedParameters,
    priority: u8,
    publishing_enabled: bool,
    state: SubscriptionState,
    timer: PublishTimer,

    next_sequence_number: u32,
    keep_alive_counter: u32,
    lifetime_counter: u32,
    keep_alive_due: bool,
    first_message_sent: bool,

    items: BTreeMap<MonitoredItemId, MonitoredItem>,
    /// Notifications harvested but not yet sent because of the per-message cap
    backlog: VecDeque<Notification>,
    retransmission: VecDeque<NotificationMessage>,
    retransmission_limit: usize,

    counters: SubscriptionDiagnostics,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        session_id: Option<SessionId>,
        params: RevisedParameters,
        priority: u8,
        publishing_enabled: bool,
        retransmission_limit: usize,
        now: Instant,
    ) -> Self {
        Subscription {
            id,
            session_id,
            params,
            priority,
            publishing_enabled,
            state: SubscriptionState::Creating,
            timer: PublishTimer::new(params.publishing_duration(), now),
            next_sequence_number: INITIAL_SEQUENCE_NUMBER,
            keep_alive_counter: 0,
            lifetime_counter: 0,
            keep_alive_due: false,
            first_message_sent: false,
            items: BTreeMap::new(),
            backlog: VecDeque::new(),
            retransmission: VecDeque::new(),
            retransmission_limit: retransmission_limit.max(1),
            counters: SubscriptionDiagnostics::default(),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn params(&self) -> &RevisedParameters {
        &self.params
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn publishing_enabled(&self) -> bool {
        self.publishing_enabled
    }

    pub fn next_sequence_number(&self) -> u32 {
        self.next_sequence_number
    }

    pub fn next_deadline(&self) -> Instant {
        self.timer.next_deadline()
    }

    pub fn is_due(
        &self,
        now: Instant,
    ) -> bool {
        self.state != SubscriptionState::Closed && self.timer.is_expired(now)
    }

    pub fn has_sent_first_message(&self) -> bool {
        self.first_message_sent
    }

    /// Publishing intervals left before the lifetime expires.
    pub fn remaining_lifetime(&self) -> u32 {
        self.params.lifetime_count.saturating_sub(self.lifetime_counter)
    }

    /// Whether an arriving publish request can be answered right away.
    pub fn is_ready_to_publish(&self) -> bool {
        self.state == SubscriptionState::Late || !self.backlog.is_empty()
    }

    pub fn has_pending_notifications(&self) -> bool {
        !self.backlog.is_empty() || (self.publishing_enabled && self.items.values().any(MonitoredItem::has_notifications))
    }

    // ---------------------------------------------------------------------
    // Monitored items

    pub fn insert_item(
        &mut self,
        item: MonitoredItem,
    ) {
        self.items.insert(item.id(), item);
    }

    pub fn remove_item(
        &mut self,
        id: MonitoredItemId,
    ) -> Option<MonitoredItem> {
        self.items.remove(&id)
    }

    pub fn item(
        &self,
        id: MonitoredItemId,
    ) -> Option<&MonitoredItem> {
        self.items.get(&id)
    }

    pub fn item_mut(
        &mut self,
        id: MonitoredItemId,
    ) -> Option<&mut MonitoredItem> {
        self.items.get_mut(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &MonitoredItem> {
        self.items.values()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    // ---------------------------------------------------------------------
    // Parameters

    pub fn modify(
        &mut self,
        params: RevisedParameters,
        priority: u8,
        now: Instant,
    ) {
        self.params = params;
        self.priority = priority;
        self.timer.set_interval(params.publishing_duration(), now);
        self.lifetime_counter = 0;
        self.counters.modify_count += 1;
        debug!(
            subscription_id = self.id,
            publishing_interval = params.publishing_interval,
            lifetime_count = params.lifetime_count,
            max_keep_alive_count = params.max_keep_alive_count,
            "subscription modified"
        );
    }

    pub fn set_publishing_enabled(
        &mut self,
        enabled: bool,
    ) {
        if enabled != self.publishing_enabled {
            if enabled {
                self.counters.enable_count += 1;
            } else {
                self.counters.disable_count += 1;
            }
        }
        self.publishing_enabled = enabled;
        self.lifetime_counter = 0;
    }

    /// Binds the subscription to a session, or detaches it when `None`.
    pub(crate) fn set_session(
        &mut self,
        session_id: Option<SessionId>,
    ) {
        self.session_id = session_id;
    }

    pub(crate) fn transfer_to(
        &mut self,
        session_id: SessionId,
    ) {
        if self.session_id.is_some() {
            self.counters.transferred_to_alt_client_count += 1;
        }
        self.counters.transfer_request_count += 1;
        self.session_id = Some(session_id);
        self.lifetime_counter = 0;
    }

    pub(crate) fn count_publish_request(&mut self) {
        self.counters.publish_request_count += 1;
    }

    // ---------------------------------------------------------------------
    // Publishing

    /// Runs one publishing interval.
    ///
    /// `request_available` tells whether the owning engine holds a publish
    /// request that a produced message can be paired with immediately.
    pub fn on_publishing_timer(
        &mut self,
        now: Instant,
        request_available: bool,
    ) -> TickOutcome {
        if self.state == SubscriptionState::Closed {
            return TickOutcome::Idle;
        }
        self.timer.advance(now);

        if self.has_pending_notifications() {
            if request_available {
                return TickOutcome::Published(self.assemble());
            }
            self.mark_late();
            return self.count_lifetime(TickOutcome::Late);
        }

        self.keep_alive_counter += 1;
        if self.keep_alive_due || self.keep_alive_counter >= self.params.max_keep_alive_count {
            if request_available {
                return TickOutcome::Published(self.keep_alive());
            }
            self.keep_alive_due = true;
            self.mark_late();
            return self.count_lifetime(TickOutcome::Late);
        }

        if self.state == SubscriptionState::Creating {
            self.state = SubscriptionState::Normal;
        }
        if request_available {
            self.lifetime_counter = 0;
            TickOutcome::Idle
        } else {
            self.count_lifetime(TickOutcome::Idle)
        }
    }

    /// Answers a publish request that arrived while the subscription owes a
    /// message. Closed subscriptions use this to drain their final data.
    pub fn publish_on_request(&mut self) -> Option<PublishedMessage> {
        if self.has_pending_notifications() {
            return Some(self.assemble());
        }
        if self.keep_alive_due && self.state != SubscriptionState::Closed {
            return Some(self.keep_alive());
        }
        if self.state == SubscriptionState::Late {
            self.state = SubscriptionState::Normal;
        }
        None
    }

    fn mark_late(&mut self) {
        if self.state != SubscriptionState::Late {
            trace!(subscription_id = self.id, "subscription is late");
            self.counters.late_publish_request_count += 1;
            LATE_PUBLISH_CYCLES.inc();
        }
        self.state = SubscriptionState::Late;
    }

    fn count_lifetime(
        &mut self,
        outcome: TickOutcome,
    ) -> TickOutcome {
        self.lifetime_counter += 1;
        if self.lifetime_counter >= self.params.lifetime_count {
            debug!(
                subscription_id = self.id,
                lifetime_count = self.params.lifetime_count,
                "subscription lifetime expired"
            );
            return TickOutcome::Expired;
        }
        outcome
    }

    fn reset_counters(&mut self) {
        self.keep_alive_counter = 0;
        self.lifetime_counter = 0;
        self.keep_alive_due = false;
        self.first_message_sent = true;
    }

    fn allocate_sequence_number(&mut self) -> u32 {
        let sequence_number = self.next_sequence_number;
        self.next_sequence_number = match sequence_number {
            u32::MAX => INITIAL_SEQUENCE_NUMBER,
            n => n + 1,
        };
        sequence_number
    }

    fn assemble(&mut self) -> PublishedMessage {
        let mut notifications: Vec<Notification> = self.backlog.drain(..).collect();
        if self.publishing_enabled {
            for item in self.items.values_mut() {
                notifications.extend(item.extract_notifications());
            }
        }

        let cap = self.params.max_notifications_per_publish as usize;
        if cap > 0 && notifications.len() > cap {
            self.backlog.extend(notifications.split_off(cap));
        }

        let data_changes = notifications
            .iter()
            .filter(|n| matches!(n, Notification::DataChange(_)))
            .count() as u32;
        let events = notifications.len() as u32 - data_changes;
        self.counters.data_change_notifications_count += data_changes;
        self.counters.event_notifications_count += events;
        self.counters.notifications_count += data_changes + events;
        NOTIFICATIONS_PUBLISHED.inc_by(u64::from(data_changes + events));

        let sequence_number = self.allocate_sequence_number();
        let message = NotificationMessage::assemble(sequence_number, SystemTime::now(), notifications, None);
        self.retain(message.clone());

        self.reset_counters();
        if self.state != SubscriptionState::Closed {
            self.state = SubscriptionState::Normal;
        }
        let more_notifications = !self.backlog.is_empty();
        trace!(
            subscription_id = self.id,
            sequence_number,
            more_notifications,
            "notification message assembled"
        );
        PublishedMessage {
            message,
            more_notifications,
        }
    }

    fn keep_alive(&mut self) -> PublishedMessage {
        let message = NotificationMessage::keep_alive(self.next_sequence_number, SystemTime::now());
        self.reset_counters();
        self.state = SubscriptionState::KeepAlive;
        self.counters.keep_alive_message_count += 1;
        KEEP_ALIVE_MESSAGES.inc();
        trace!(subscription_id = self.id, "keep-alive");
        PublishedMessage {
            message,
            more_notifications: false,
        }
    }

    /// A standalone status change message. Consumes a sequence number but is
    /// not retained for republishing.
    pub fn status_change_message(
        &mut self,
        status: StatusCode,
    ) -> PublishedMessage {
        let sequence_number = self.allocate_sequence_number();
        PublishedMessage {
            message: NotificationMessage::status_change(sequence_number, SystemTime::now(), status),
            more_notifications: false,
        }
    }

    fn retain(
        &mut self,
        message: NotificationMessage,
    ) {
        if self.retransmission.len() >= self.retransmission_limit {
            self.retransmission.pop_front();
            self.counters.discarded_message_count += 1;
        }
        self.retransmission.push_back(message);
    }

    // ---------------------------------------------------------------------
    // Acknowledgement and retransmission

    pub fn acknowledge(
        &mut self,
        sequence_number: u32,
    ) -> StatusCode {
        match self
            .retransmission
            .iter()
            .position(|message| message.sequence_number == sequence_number)
        {
            Some(index) => {
                self.retransmission.remove(index);
                StatusCode::GOOD
            }
            None => StatusCode::BAD_SEQUENCE_NUMBER_UNKNOWN,
        }
    }

    /// Sequence numbers of sent, unacknowledged messages, oldest first.
    pub fn available_sequence_numbers(&self) -> Vec<u32> {
        self.retransmission.iter().map(|message| message.sequence_number).collect()
    }

    /// Returns an identical copy of a retained message.
    pub fn republish(
        &mut self,
        sequence_number: u32,
    ) -> ServiceResult<NotificationMessage> {
        self.counters.republish_request_count += 1;
        self.lifetime_counter = 0;
        let message = self
            .retransmission
            .iter()
            .find(|message| message.sequence_number == sequence_number)
            .cloned()
            .ok_or(StatusCode::BAD_MESSAGE_NOT_AVAILABLE)?;
        self.counters.republish_message_count += 1;
        Ok(message)
    }

    /// Every Reporting item re-queues its cached value.
    pub fn resend_initial_values(&mut self) -> usize {
        self.items
            .values_mut()
            .map(MonitoredItem::resend_cached_value)
            .filter(|resent| *resent)
            .count()
    }

    // ---------------------------------------------------------------------
    // Termination

    /// Closes the subscription, keeping harvested notifications for a final
    /// publish. Returns the released items.
    pub fn terminate(&mut self) -> Vec<MonitoredItem> {
        if self.publishing_enabled {
            for item in self.items.values_mut() {
                self.backlog.extend(item.extract_notifications());
            }
        }
        self.state = SubscriptionState::Closed;
        std::mem::take(&mut self.items).into_values().collect()
    }

    /// Closes the subscription after lifetime expiry, dropping undelivered data.
    pub fn expire(&mut self) -> Vec<MonitoredItem> {
        self.backlog.clear();
        self.state = SubscriptionState::Closed;
        std::mem::take(&mut self.items).into_values().collect()
    }

    pub fn diagnostics(&self) -> SubscriptionDiagnostics {
        let disabled = self
            .items
            .values()
            .filter(|item| item.monitoring_mode() == MonitoringMode::Disabled)
            .count();
        SubscriptionDiagnostics {
            subscription_id: self.id,
            session_id: self.session_id,
            priority: self.priority,
            publishing_interval: self.params.publishing_interval,
            max_keep_alive_count: self.params.max_keep_alive_count,
            max_lifetime_count: self.params.lifetime_count,
            max_notifications_per_publish: self.params.max_notifications_per_publish,
            publishing_enabled: self.publishing_enabled,
            current_keep_alive_count: self.keep_alive_counter,
            current_lifetime_count: self.lifetime_counter,
            unacknowledged_message_count: self.retransmission.len() as u32,
            monitored_item_count: self.items.len() as u32,
            disabled_monitored_item_count: disabled as u32,
            next_sequence_number: self.next_sequence_number,
            ..self.counters.clone()
        }
    }
}
