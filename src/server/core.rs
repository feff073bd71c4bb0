use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::address_space::AddressSpace;
use crate::config::ServerConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::metrics::{REPUBLISH_REQUESTS, SAMPLING_FAILURES, SUBSCRIPTIONS_ORPHANED, SUBSCRIPTIONS_TRANSFERRED};
use crate::monitored_item::{MonitoredItem, MonitoredItemHandle};
use crate::publish_engine::{PublishEngine, PublishResponder, SubscriptionArena};
use crate::sampling::{SampleRequest, SamplerRegistry};
use crate::subscription::{RevisedParameters, Subscription};
use crate::types::{
    AttributeId, CreateMonitoredItemsRequest, CreateSubscriptionRequest, CreateSubscriptionResponse, DataValue,
    DeleteMonitoredItemsRequest, Event, ModifyMonitoredItemsRequest, ModifySubscriptionRequest,
    ModifySubscriptionResponse, MonitoredItemCreateResult, MonitoredItemModifyResult, NodeId, NotificationMessage,
    PublishRequest, RepublishRequest, ServiceResult, SessionId, SetMonitoringModeRequest, SetPublishingModeRequest,
    StatusCode, SubscriptionId, TransferResult, TransferSubscriptionsRequest,
};
use crate::utils::IdAllocator;

/// Synchronous heart of the server: every subscription service, session
/// binding and sampling decision. Owned by exactly one task.
pub struct SubscriptionCore {
    config: ServerConfig,
    address_space: Arc<dyn AddressSpace>,
    diagnostics: Arc<dyn DiagnosticsSink>,

    subscriptions: SubscriptionArena,
    sessions: HashMap<SessionId, PublishEngine>,
    orphans: PublishEngine,

    samplers: SamplerRegistry,
    pending_samples: Vec<SampleRequest>,

    subscription_ids: IdAllocator,
    monitored_item_ids: IdAllocator,
}

impl SubscriptionCore {
    pub fn new(
        config: ServerConfig,
        address_space: Arc<dyn AddressSpace>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        SubscriptionCore {
            config,
            address_space,
            diagnostics,
            subscriptions: SubscriptionArena::new(),
            sessions: HashMap::new(),
            orphans: PublishEngine::orphans(),
            samplers: SamplerRegistry::new(),
            pending_samples: Vec::new(),
            subscription_ids: IdAllocator::new(),
            monitored_item_ids: IdAllocator::new(),
        }
    }

    pub fn subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Option<&Subscription> {
        self.subscriptions.get(&subscription_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.subscription_count()
    }

    pub fn samplers(&self) -> &SamplerRegistry {
        &self.samplers
    }

    // =====================================================================
    // Session binding

    pub fn open_session(
        &mut self,
        session_id: SessionId,
    ) -> ServiceResult<()> {
        if self.sessions.contains_key(&session_id) {
            return Err(StatusCode::BAD_SESSION_ID_INVALID);
        }
        let engine = PublishEngine::new(session_id, self.config.publish.max_publish_requests_in_queue);
        self.sessions.insert(session_id, engine);
        self.expose_session(session_id);
        debug!(session_id, "session opened");
        Ok(())
    }

    /// Closes a session. Its subscriptions are deleted, or moved to the
    /// orphan engine where they live on until transferred or expired.
    pub fn close_session(
        &mut self,
        session_id: SessionId,
        delete_subscriptions: bool,
    ) -> ServiceResult<()> {
        let mut engine = self
            .sessions
            .remove(&session_id)
            .ok_or(StatusCode::BAD_SESSION_ID_INVALID)?;
        engine.cancel_pending_requests(StatusCode::BAD_SESSION_CLOSED);
        engine.clear();
        self.diagnostics.withdraw_session(session_id);

        for id in engine.take_subscriptions() {
            self.diagnostics.withdraw(id);
            if delete_subscriptions {
                if let Some(mut sub) = self.subscriptions.remove(&id) {
                    release_items(&mut self.samplers, id, sub.terminate());
                }
                debug!(session_id, subscription_id = id, "subscription deleted with its session");
            } else {
                if let Some(sub) = self.subscriptions.get_mut(&id) {
                    sub.set_session(None);
                }
                self.orphans.add_subscription(id);
                SUBSCRIPTIONS_ORPHANED.inc();
                info!(session_id, subscription_id = id, "subscription orphaned");
            }
        }
        info!(session_id, delete_subscriptions, "session closed");
        Ok(())
    }

    /// The session watchdog fired; subscriptions survive as orphans.
    pub fn session_timed_out(
        &mut self,
        session_id: SessionId,
    ) -> ServiceResult<()> {
        warn!(session_id, "session timed out");
        self.close_session(session_id, false)
    }

    /// The secure channel under the session was replaced; queued publish
    /// requests can no longer be answered on it.
    pub fn channel_replaced(
        &mut self,
        session_id: SessionId,
    ) -> ServiceResult<usize> {
        let engine = self
            .sessions
            .get_mut(&session_id)
            .ok_or(StatusCode::BAD_SESSION_ID_INVALID)?;
        let cancelled = engine.cancel_pending_requests(StatusCode::BAD_SECURE_CHANNEL_CLOSED);
        self.expose_session(session_id);
        Ok(cancelled)
    }

    // =====================================================================
    // Subscription services

    pub fn create_subscription(
        &mut self,
        session_id: SessionId,
        request: CreateSubscriptionRequest,
        now: Instant,
    ) -> ServiceResult<CreateSubscriptionResponse> {
        let engine = self
            .sessions
            .get_mut(&session_id)
            .ok_or(StatusCode::BAD_SESSION_ID_INVALID)?;
        let cap = self.config.subscription.max_subscriptions_per_session;
        if cap > 0 && engine.subscription_count() >= cap {
            return Err(StatusCode::BAD_TOO_MANY_SUBSCRIPTIONS);
        }

        let params = RevisedParameters::revise(
            request.requested_publishing_interval,
            request.requested_lifetime_count,
            request.requested_max_keep_alive_count,
            request.max_notifications_per_publish,
            &self.config.subscription,
        );
        let subscriptions = &self.subscriptions;
        let id = self.subscription_ids.next_free(|id| subscriptions.contains_key(&id));
        let sub = Subscription::new(
            id,
            Some(session_id),
            params,
            request.priority,
            request.publishing_enabled,
            self.config.subscription.max_retransmission_queue_size,
            now,
        );
        self.diagnostics.expose(&sub.diagnostics());
        self.subscriptions.insert(id, sub);
        engine.add_subscription(id);
        self.expose_session(session_id);

        info!(
            session_id,
            subscription_id = id,
            publishing_interval = params.publishing_interval,
            "subscription created"
        );
        Ok(CreateSubscriptionResponse {
            subscription_id: id,
            revised_publishing_interval: params.publishing_interval,
            revised_lifetime_count: params.lifetime_count,
            revised_max_keep_alive_count: params.max_keep_alive_count,
        })
    }

    pub fn modify_subscription(
        &mut self,
        session_id: SessionId,
        request: ModifySubscriptionRequest,
        now: Instant,
    ) -> ServiceResult<ModifySubscriptionResponse> {
        let params = RevisedParameters::revise(
            request.requested_publishing_interval,
            request.requested_lifetime_count,
            request.requested_max_keep_alive_count,
            request.max_notifications_per_publish,
            &self.config.subscription,
        );
        self.check_session(session_id)?;
        let sub = owned(&mut self.subscriptions, session_id, request.subscription_id)?;
        sub.modify(params, request.priority, now);
        self.diagnostics.expose(&sub.diagnostics());
        Ok(ModifySubscriptionResponse {
            revised_publishing_interval: params.publishing_interval,
            revised_lifetime_count: params.lifetime_count,
            revised_max_keep_alive_count: params.max_keep_alive_count,
        })
    }

    pub fn set_publishing_mode(
        &mut self,
        session_id: SessionId,
        request: SetPublishingModeRequest,
    ) -> ServiceResult<Vec<StatusCode>> {
        self.check_batch(session_id, request.subscription_ids.len())?;
        let mut results = Vec::with_capacity(request.subscription_ids.len());
        for &id in &request.subscription_ids {
            match owned(&mut self.subscriptions, session_id, id) {
                Ok(sub) => {
                    sub.set_publishing_enabled(request.publishing_enabled);
                    self.diagnostics.expose(&sub.diagnostics());
                    results.push(StatusCode::GOOD);
                }
                Err(status) => results.push(status),
            }
        }
        Ok(results)
    }

    pub fn delete_subscriptions(
        &mut self,
        session_id: SessionId,
        subscription_ids: &[SubscriptionId],
        now: Instant,
    ) -> ServiceResult<Vec<StatusCode>> {
        self.check_batch(session_id, subscription_ids.len())?;
        let engine = self
            .sessions
            .get_mut(&session_id)
            .ok_or(StatusCode::BAD_SESSION_ID_INVALID)?;

        let mut results = Vec::with_capacity(subscription_ids.len());
        for &id in subscription_ids {
            let owned = self
                .subscriptions
                .get(&id)
                .is_some_and(|sub| sub.session_id() == Some(session_id));
            let Some(mut sub) = owned.then(|| self.subscriptions.remove(&id)).flatten() else {
                results.push(StatusCode::BAD_SUBSCRIPTION_ID_INVALID);
                continue;
            };
            release_items(&mut self.samplers, id, sub.terminate());
            self.diagnostics.withdraw(id);
            engine.remove_subscription(id);
            engine.add_closed(sub);
            debug!(session_id, subscription_id = id, "subscription deleted");
            results.push(StatusCode::GOOD);
        }
        engine.on_subscriptions_changed(now, &mut self.subscriptions);
        self.expose_session(session_id);
        Ok(results)
    }

    pub fn transfer_subscriptions(
        &mut self,
        session_id: SessionId,
        request: TransferSubscriptionsRequest,
        now: Instant,
    ) -> ServiceResult<Vec<TransferResult>> {
        self.check_batch(session_id, request.subscription_ids.len())?;
        let cap = self.config.subscription.max_subscriptions_per_session;

        let mut results = Vec::with_capacity(request.subscription_ids.len());
        let mut previous_owners = Vec::new();
        for &id in &request.subscription_ids {
            let Some(sub) = self.subscriptions.get_mut(&id) else {
                results.push(TransferResult {
                    status_code: StatusCode::BAD_SUBSCRIPTION_ID_INVALID,
                    available_sequence_numbers: Vec::new(),
                });
                continue;
            };

            let previous = sub.session_id();
            if previous != Some(session_id) {
                let target_len = self.sessions.get(&session_id).map_or(0, PublishEngine::subscription_count);
                if cap > 0 && target_len >= cap {
                    results.push(TransferResult {
                        status_code: StatusCode::BAD_TOO_MANY_SUBSCRIPTIONS,
                        available_sequence_numbers: Vec::new(),
                    });
                    continue;
                }

                match previous.and_then(|prev| self.sessions.get_mut(&prev)) {
                    Some(old_engine) => {
                        old_engine.remove_subscription(id);
                        let notice = sub.status_change_message(StatusCode::GOOD_SUBSCRIPTION_TRANSFERRED);
                        old_engine.deliver(id, notice, Vec::new(), false, now);
                        previous_owners.extend(previous);
                    }
                    None => {
                        self.orphans.remove_subscription(id);
                    }
                }
                sub.transfer_to(session_id);
                if let Some(engine) = self.sessions.get_mut(&session_id) {
                    engine.add_subscription(id);
                }
                SUBSCRIPTIONS_TRANSFERRED.inc();
                info!(
                    from = ?previous,
                    to = session_id,
                    subscription_id = id,
                    "subscription transferred"
                );
            }

            if request.send_initial_values {
                sub.resend_initial_values();
            }
            self.diagnostics.expose(&sub.diagnostics());
            results.push(TransferResult {
                status_code: StatusCode::GOOD,
                available_sequence_numbers: sub.available_sequence_numbers(),
            });
        }

        // A previous owner left without live subscriptions fails its extra requests now.
        previous_owners.push(session_id);
        previous_owners.sort_unstable();
        previous_owners.dedup();
        for owner in previous_owners {
            if let Some(engine) = self.sessions.get_mut(&owner) {
                engine.on_subscriptions_changed(now, &mut self.subscriptions);
            }
            self.expose_session(owner);
        }
        Ok(results)
    }

    // =====================================================================
    // Monitored item services

    pub fn create_monitored_items(
        &mut self,
        session_id: SessionId,
        request: CreateMonitoredItemsRequest,
        now: Instant,
    ) -> ServiceResult<Vec<MonitoredItemCreateResult>> {
        self.check_item_batch(session_id, request.items_to_create.len())?;
        let subscription_id = request.subscription_id;
        let sub = owned(&mut self.subscriptions, session_id, subscription_id)?;
        let publishing_interval = sub.params().publishing_interval;
        let cap = self.config.monitored_item.max_monitored_items_per_subscription;

        let mut results = Vec::with_capacity(request.items_to_create.len());
        for item_request in &request.items_to_create {
            if cap > 0 && sub.item_count() >= cap {
                results.push(MonitoredItemCreateResult {
                    status_code: StatusCode::BAD_TOO_MANY_MONITORED_ITEMS,
                    ..Default::default()
                });
                continue;
            }
            let id = self.monitored_item_ids.next_free(|id| sub.item(id).is_some());
            let created = MonitoredItem::new(
                id,
                item_request,
                request.timestamps_to_return,
                publishing_interval,
                &self.config.monitored_item,
                self.address_space.as_ref(),
            );
            match created {
                Ok((mut item, filter_result)) => {
                    let handle = MonitoredItemHandle {
                        subscription_id,
                        monitored_item_id: id,
                    };
                    if item.is_active() {
                        self.samplers.register(handle, &item.sampler_key(), now);
                        queue_initial_sample(&mut self.pending_samples, handle, &mut item);
                    }
                    trace!(subscription_id, monitored_item_id = id, node_id = %item.item_to_monitor().node_id, "monitored item created");
                    results.push(MonitoredItemCreateResult {
                        status_code: StatusCode::GOOD,
                        monitored_item_id: id,
                        revised_sampling_interval: item.sampling_interval(),
                        revised_queue_size: item.queue_size(),
                        filter_result,
                    });
                    sub.insert_item(item);
                }
                Err(status) => results.push(MonitoredItemCreateResult {
                    status_code: status,
                    ..Default::default()
                }),
            }
        }
        self.diagnostics.expose(&sub.diagnostics());
        Ok(results)
    }

    pub fn modify_monitored_items(
        &mut self,
        session_id: SessionId,
        request: ModifyMonitoredItemsRequest,
        now: Instant,
    ) -> ServiceResult<Vec<MonitoredItemModifyResult>> {
        self.check_item_batch(session_id, request.items_to_modify.len())?;
        let subscription_id = request.subscription_id;
        let sub = owned(&mut self.subscriptions, session_id, subscription_id)?;
        let publishing_interval = sub.params().publishing_interval;

        let mut results = Vec::with_capacity(request.items_to_modify.len());
        for modify_request in &request.items_to_modify {
            let Some(item) = sub.item_mut(modify_request.monitored_item_id) else {
                results.push(MonitoredItemModifyResult {
                    status_code: StatusCode::BAD_MONITORED_ITEM_ID_INVALID,
                    ..Default::default()
                });
                continue;
            };
            let before = item.sampler_key();
            let modified = item.modify(
                modify_request,
                request.timestamps_to_return,
                publishing_interval,
                &self.config.monitored_item,
                self.address_space.as_ref(),
            );
            match modified {
                Ok(filter_result) => {
                    let after = item.sampler_key();
                    if item.is_active() && before != after {
                        let handle = MonitoredItemHandle {
                            subscription_id,
                            monitored_item_id: item.id(),
                        };
                        self.samplers.unregister(handle, &before);
                        self.samplers.register(handle, &after, now);
                    }
                    results.push(MonitoredItemModifyResult {
                        status_code: StatusCode::GOOD,
                        revised_sampling_interval: item.sampling_interval(),
                        revised_queue_size: item.queue_size(),
                        filter_result,
                    });
                }
                Err(status) => results.push(MonitoredItemModifyResult {
                    status_code: status,
                    ..Default::default()
                }),
            }
        }
        Ok(results)
    }

    pub fn set_monitoring_mode(
        &mut self,
        session_id: SessionId,
        request: SetMonitoringModeRequest,
        now: Instant,
    ) -> ServiceResult<Vec<StatusCode>> {
        self.check_item_batch(session_id, request.monitored_item_ids.len())?;
        let subscription_id = request.subscription_id;
        let sub = owned(&mut self.subscriptions, session_id, subscription_id)?;

        let mut results = Vec::with_capacity(request.monitored_item_ids.len());
        for &monitored_item_id in &request.monitored_item_ids {
            let Some(item) = sub.item_mut(monitored_item_id) else {
                results.push(StatusCode::BAD_MONITORED_ITEM_ID_INVALID);
                continue;
            };
            let handle = MonitoredItemHandle {
                subscription_id,
                monitored_item_id,
            };
            let key = item.sampler_key();
            let transition = item.set_monitoring_mode(request.monitoring_mode);
            if transition.deactivated() {
                self.samplers.unregister(handle, &key);
            }
            if transition.activated() {
                self.samplers.register(handle, &key, now);
                queue_initial_sample(&mut self.pending_samples, handle, item);
            }
            results.push(StatusCode::GOOD);
        }
        self.diagnostics.expose(&sub.diagnostics());
        Ok(results)
    }

    pub fn delete_monitored_items(
        &mut self,
        session_id: SessionId,
        request: DeleteMonitoredItemsRequest,
    ) -> ServiceResult<Vec<StatusCode>> {
        self.check_item_batch(session_id, request.monitored_item_ids.len())?;
        let subscription_id = request.subscription_id;
        let sub = owned(&mut self.subscriptions, session_id, subscription_id)?;

        let results = request
            .monitored_item_ids
            .iter()
            .map(|&monitored_item_id| match sub.remove_item(monitored_item_id) {
                Some(item) => {
                    release_items(&mut self.samplers, subscription_id, vec![item]);
                    StatusCode::GOOD
                }
                None => StatusCode::BAD_MONITORED_ITEM_ID_INVALID,
            })
            .collect();
        self.diagnostics.expose(&sub.diagnostics());
        Ok(results)
    }

    // =====================================================================
    // Publish exchange

    pub fn publish(
        &mut self,
        session_id: SessionId,
        request: PublishRequest,
        responder: PublishResponder,
        now: Instant,
    ) {
        match self.sessions.get_mut(&session_id) {
            Some(engine) => engine.handle_publish_request(request, responder, now, &mut self.subscriptions),
            None => {
                let _ = responder.send(Err(StatusCode::BAD_SESSION_ID_INVALID));
                return;
            }
        }
        self.expose_session(session_id);
    }

    pub fn republish(
        &mut self,
        session_id: SessionId,
        request: RepublishRequest,
    ) -> ServiceResult<NotificationMessage> {
        self.check_session(session_id)?;
        let sub = owned(&mut self.subscriptions, session_id, request.subscription_id)?;
        let result = sub.republish(request.retransmit_sequence_number);
        let label = if result.is_ok() { "ok" } else { "not_available" };
        REPUBLISH_REQUESTS.with_label_values(&[label]).inc();
        if let Some(engine) = self.sessions.get_mut(&session_id) {
            engine.count_republish(result.is_ok());
        }
        self.expose_session(session_id);
        result
    }

    // =====================================================================
    // Node layer pushes and sampling

    pub fn notify_data_change(
        &mut self,
        node_id: &NodeId,
        attribute_id: AttributeId,
        value: DataValue,
    ) {
        let semantic_version = self.address_space.semantic_version(node_id);
        for handle in self.samplers.change_watchers(node_id, attribute_id) {
            if let Some(item) = item_mut(&mut self.subscriptions, handle) {
                item.record_value(value.clone(), semantic_version);
            }
        }
    }

    pub fn notify_event(
        &mut self,
        notifier: &NodeId,
        event: &Event,
    ) {
        for handle in self.samplers.event_watchers(notifier) {
            if let Some(item) = item_mut(&mut self.subscriptions, handle) {
                item.record_event(event);
            }
        }
    }

    /// Feeds the outcome of a sampling read back into its item. Failures
    /// count as "no update this tick". A completion older than one already
    /// applied is dropped.
    pub fn record_sample(
        &mut self,
        handle: MonitoredItemHandle,
        generation: u64,
        result: ServiceResult<DataValue>,
    ) {
        let Some(item) = item_mut(&mut self.subscriptions, handle) else {
            trace!(?handle, "sample for a removed item dropped");
            return;
        };
        if !item.accepts_sample(generation) {
            trace!(?handle, generation, "stale sample dropped");
            return;
        }
        match result {
            Ok(value) => {
                let semantic_version = self.address_space.semantic_version(&item.item_to_monitor().node_id);
                item.record_sample(value, semantic_version);
            }
            Err(status) => {
                SAMPLING_FAILURES.inc();
                warn!(?handle, %status, "sampling read failed");
            }
        }
    }

    /// Reads owed since the last call: initial samples and fired timers.
    pub fn take_sample_requests(&mut self) -> Vec<SampleRequest> {
        std::mem::take(&mut self.pending_samples)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.sessions
            .values()
            .chain(std::iter::once(&self.orphans))
            .filter_map(|engine| engine.next_deadline(&self.subscriptions))
            .chain(self.samplers.next_deadline())
            .min()
    }

    /// Fires every due sampling timer and publishing interval.
    pub fn tick(
        &mut self,
        now: Instant,
    ) {
        for handle in self.samplers.poll_expired(now) {
            if let Some(item) = item_mut(&mut self.subscriptions, handle).filter(|item| item.is_active()) {
                self.pending_samples.push(sample_request(handle, item));
            }
        }

        let mut expired = Vec::new();
        let mut touched = Vec::new();
        for engine in self.sessions.values_mut().chain(std::iter::once(&mut self.orphans)) {
            let report = engine.tick(now, &mut self.subscriptions);
            expired.extend(report.expired);
            touched.extend(report.touched);
        }

        for (id, items) in expired {
            release_items(&mut self.samplers, id, items);
            self.diagnostics.withdraw(id);
            info!(subscription_id = id, "subscription expired");
        }
        for id in touched {
            if let Some(sub) = self.subscriptions.get(&id).filter(|sub| sub.session_id().is_some()) {
                self.diagnostics.expose(&sub.diagnostics());
            }
        }
        for session in self.sessions.values().filter_map(PublishEngine::diagnostics) {
            self.diagnostics.expose_session(&session);
        }
    }

    /// Fails every queued publish request; the server is going away.
    pub fn shutdown(&mut self) {
        for engine in self.sessions.values_mut() {
            engine.cancel_pending_requests(StatusCode::BAD_SHUTDOWN);
        }
        info!(
            sessions = self.sessions.len(),
            subscriptions = self.subscriptions.len(),
            "subscription core shut down"
        );
    }

    // =====================================================================
    // Helpers

    fn expose_session(
        &self,
        session_id: SessionId,
    ) {
        if let Some(diagnostics) = self.sessions.get(&session_id).and_then(PublishEngine::diagnostics) {
            self.diagnostics.expose_session(&diagnostics);
        }
    }

    fn check_session(
        &self,
        session_id: SessionId,
    ) -> ServiceResult<()> {
        if self.sessions.contains_key(&session_id) {
            Ok(())
        } else {
            Err(StatusCode::BAD_SESSION_ID_INVALID)
        }
    }

    fn check_batch(
        &self,
        session_id: SessionId,
        len: usize,
    ) -> ServiceResult<()> {
        self.check_limit(session_id, len, self.config.limits.max_operations_per_call)
    }

    fn check_item_batch(
        &self,
        session_id: SessionId,
        len: usize,
    ) -> ServiceResult<()> {
        self.check_limit(session_id, len, self.config.limits.max_monitored_items_per_call)
    }

    fn check_limit(
        &self,
        session_id: SessionId,
        len: usize,
        limit: usize,
    ) -> ServiceResult<()> {
        self.check_session(session_id)?;
        if len == 0 {
            return Err(StatusCode::BAD_NOTHING_TO_DO);
        }
        if limit > 0 && len > limit {
            return Err(StatusCode::BAD_TOO_MANY_OPERATIONS);
        }
        Ok(())
    }
}

fn owned(
    subscriptions: &mut SubscriptionArena,
    session_id: SessionId,
    subscription_id: SubscriptionId,
) -> ServiceResult<&mut Subscription> {
    subscriptions
        .get_mut(&subscription_id)
        .filter(|sub| sub.session_id() == Some(session_id))
        .ok_or(StatusCode::BAD_SUBSCRIPTION_ID_INVALID)
}

fn item_mut(
    subscriptions: &mut SubscriptionArena,
    handle: MonitoredItemHandle,
) -> Option<&mut MonitoredItem> {
    subscriptions
        .get_mut(&handle.subscription_id)
        .and_then(|sub| sub.item_mut(handle.monitored_item_id))
}

fn release_items(
    samplers: &mut SamplerRegistry,
    subscription_id: SubscriptionId,
    items: Vec<MonitoredItem>,
) {
    for item in items {
        let handle = MonitoredItemHandle {
            subscription_id,
            monitored_item_id: item.id(),
        };
        samplers.unregister(handle, &item.sampler_key());
    }
}

fn queue_initial_sample(
    pending: &mut Vec<SampleRequest>,
    handle: MonitoredItemHandle,
    item: &mut MonitoredItem,
) {
    if item.take_initial_sample() {
        pending.push(sample_request(handle, item));
    }
}

fn sample_request(
    handle: MonitoredItemHandle,
    item: &mut MonitoredItem,
) -> SampleRequest {
    SampleRequest {
        handle,
        node_id: item.item_to_monitor().node_id.clone(),
        attribute_id: item.item_to_monitor().attribute_id,
        index_range: item.index_range(),
        generation: item.next_sample_generation(),
    }
}
