use std::time::Duration;

use tracing::trace;

use super::{ItemFilter, NotificationQueue, QueueSize};
use crate::address_space::AddressSpace;
use crate::config::MonitoredItemConfig;
use crate::constants::DEFAULT_BINARY_ENCODING;
use crate::metrics::QUEUE_OVERFLOWS;
use crate::types::{
    AttributeId, DataValue, Event, EventFieldList, EventFilterResult, MonitoredItemCreateRequest, MonitoredItemId,
    MonitoredItemModifyRequest, MonitoredItemNotification, MonitoringMode, NodeId, Notification, NumericRange,
    ReadValueId, ServiceResult, StatusCode, SubscriptionId, TimestampsToReturn, Variant,
};
use crate::utils::time::millis_to_duration;

/// Server-wide address of a monitored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitoredItemHandle {
    pub subscription_id: SubscriptionId,
    pub monitored_item_id: MonitoredItemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingSource {
    /// Event stream of an EventNotifier
    Events,
    /// Exception based, driven by change pushes
    OnChange,
    /// Shared timer of the given interval
    Periodic(Duration),
}

/// Everything needed to register an item with, or remove it from, a sampling source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerKey {
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
    pub source: SamplingSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: MonitoringMode,
    pub to: MonitoringMode,
}

impl ModeTransition {
    pub fn activated(&self) -> bool {
        self.from == MonitoringMode::Disabled && self.to != MonitoringMode::Disabled
    }

    pub fn deactivated(&self) -> bool {
        self.from != MonitoringMode::Disabled && self.to == MonitoringMode::Disabled
    }
}

/// One observed (node, attribute) pair with its filter and notification queue.
#[derive(Debug, Clone)]
pub struct MonitoredItem {
    id: MonitoredItemId,
    client_handle: u32,
    item_to_monitor: ReadValueId,
    index_range: Option<NumericRange>,
    monitoring_mode: MonitoringMode,
    sampling_interval: f64,
    filter: ItemFilter,
    timestamps_to_return: TimestampsToReturn,
    queue: NotificationQueue,
    last_value: Option<DataValue>,
    semantic_version: u32,
    initial_sample_pending: bool,
    /// Generation of the newest sampling read handed out
    issued_sample: u64,
    /// Generation of the newest sampling read applied
    applied_sample: u64,
}

impl MonitoredItem {
    /// Validates a create request and builds the item in the requested mode.
    ///
    /// Returns the event filter result for event items.
    pub fn new(
        id: MonitoredItemId,
        request: &MonitoredItemCreateRequest,
        timestamps_to_return: TimestampsToReturn,
        publishing_interval: f64,
        config: &MonitoredItemConfig,
        address_space: &dyn AddressSpace,
    ) -> ServiceResult<(Self, Option<EventFilterResult>)> {
        let target = &request.item_to_monitor;
        if !address_space.exists(&target.node_id) {
            return Err(StatusCode::BAD_NODE_ID_UNKNOWN);
        }
        validate_data_encoding(target)?;
        let index_range = target
            .index_range
            .as_deref()
            .map(|range| range.parse::<NumericRange>())
            .transpose()?;

        let params = &request.requested_parameters;
        let (filter, filter_result) =
            ItemFilter::validate(&params.filter, &target.node_id, target.attribute_id, address_space)?;
        let sampling_interval = revise_sampling_interval(
            params.sampling_interval,
            target.attribute_id,
            publishing_interval,
            None,
            config,
        );
        let queue = NotificationQueue::new(
            QueueSize::revise(params.queue_size, config.max_queue_size),
            params.discard_oldest,
        );

        let mut item = MonitoredItem {
            id,
            client_handle: params.client_handle,
            item_to_monitor: target.clone(),
            index_range,
            monitoring_mode: MonitoringMode::Disabled,
            sampling_interval,
            filter,
            timestamps_to_return,
            queue,
            last_value: None,
            semantic_version: address_space.semantic_version(&target.node_id),
            initial_sample_pending: false,
            issued_sample: 0,
            applied_sample: 0,
        };
        item.set_monitoring_mode(request.monitoring_mode);
        Ok((item, filter_result))
    }

    pub fn id(&self) -> MonitoredItemId {
        self.id
    }

    pub fn client_handle(&self) -> u32 {
        self.client_handle
    }

    pub fn item_to_monitor(&self) -> &ReadValueId {
        &self.item_to_monitor
    }

    pub fn index_range(&self) -> Option<NumericRange> {
        self.index_range
    }

    pub fn monitoring_mode(&self) -> MonitoringMode {
        self.monitoring_mode
    }

    pub fn sampling_interval(&self) -> f64 {
        self.sampling_interval
    }

    pub fn queue_size(&self) -> u32 {
        self.queue.capacity().get() as u32
    }

    pub fn discard_oldest(&self) -> bool {
        self.queue.discard_oldest()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn has_overflowed(&self) -> bool {
        self.queue.has_overflowed()
    }

    pub fn queued(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn last_value(&self) -> Option<&DataValue> {
        self.last_value.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.monitoring_mode != MonitoringMode::Disabled
    }

    pub fn is_event_item(&self) -> bool {
        self.item_to_monitor.attribute_id == AttributeId::EventNotifier
    }

    pub fn sampling_source(&self) -> SamplingSource {
        if self.is_event_item() {
            SamplingSource::Events
        } else if self.item_to_monitor.attribute_id != AttributeId::Value || self.sampling_interval <= 0.0 {
            SamplingSource::OnChange
        } else {
            SamplingSource::Periodic(millis_to_duration(self.sampling_interval))
        }
    }

    pub fn sampler_key(&self) -> SamplerKey {
        SamplerKey {
            node_id: self.item_to_monitor.node_id.clone(),
            attribute_id: self.item_to_monitor.attribute_id,
            source: self.sampling_source(),
        }
    }

    /// Switches the monitoring mode.
    ///
    /// Disabling clears the queue and the cached value; activating schedules
    /// an immediate first sample, collected with [`Self::take_initial_sample`].
    pub fn set_monitoring_mode(
        &mut self,
        mode: MonitoringMode,
    ) -> ModeTransition {
        let transition = ModeTransition {
            from: self.monitoring_mode,
            to: mode,
        };
        self.monitoring_mode = mode;

        if transition.deactivated() {
            self.queue.clear();
            self.last_value = None;
            self.initial_sample_pending = false;
        }
        if transition.activated() {
            self.initial_sample_pending = !self.is_event_item();
        }
        transition
    }

    /// Whether a first sample is owed since the last activation. Resets the flag.
    pub fn take_initial_sample(&mut self) -> bool {
        std::mem::take(&mut self.initial_sample_pending)
    }

    /// Stamps a new sampling read. Completions carry the stamp back.
    pub fn next_sample_generation(&mut self) -> u64 {
        self.issued_sample += 1;
        self.issued_sample
    }

    /// Accepts a completion unless a newer read already completed.
    pub fn accepts_sample(
        &mut self,
        generation: u64,
    ) -> bool {
        if generation <= self.applied_sample {
            return false;
        }
        self.applied_sample = generation;
        true
    }

    /// Records a value pushed by the node layer, extracting the index range.
    pub fn record_value(
        &mut self,
        value: DataValue,
        semantic_version: u32,
    ) -> bool {
        let value = match &self.index_range {
            Some(range) => match range.apply(&value.value) {
                Ok(extracted) => DataValue {
                    value: extracted,
                    ..value
                },
                Err(status) => DataValue {
                    value: Variant::Empty,
                    status,
                    ..value
                },
            },
            None => value,
        };
        self.ingest(value, semantic_version)
    }

    /// Records a value read through the address space, where the index
    /// range has already been applied.
    pub fn record_sample(
        &mut self,
        value: DataValue,
        semantic_version: u32,
    ) -> bool {
        self.ingest(value, semantic_version)
    }

    fn ingest(
        &mut self,
        value: DataValue,
        semantic_version: u32,
    ) -> bool {
        if !self.is_active() || self.is_event_item() {
            return false;
        }
        let semantics_advanced = semantic_version != self.semantic_version;
        self.semantic_version = semantic_version;

        if let Some(previous) = &self.last_value {
            if !self.filter.detects_change(previous, &value) {
                if !semantics_advanced {
                    return false;
                }
                let mut cached = previous.clone();
                cached.status = cached.status.with_semantics_changed();
                self.enqueue_value(cached);
                return true;
            }
            if !semantics_advanced && !self.filter.passes_deadband(previous, &value) {
                return false;
            }
        }

        let mut reported = value.clone();
        if semantics_advanced && self.last_value.is_some() {
            reported.status = reported.status.with_semantics_changed();
        }
        self.last_value = Some(value);
        self.enqueue_value(reported);
        true
    }

    /// Queues one notification per event, projected through the select clauses.
    pub fn record_event(
        &mut self,
        event: &Event,
    ) -> bool {
        if !self.is_active() || !self.is_event_item() {
            return false;
        }
        let event_fields = self.filter.project_event(event);
        let overflowed = self.queue.push(Notification::Event(EventFieldList {
            client_handle: self.client_handle,
            event_fields,
        }));
        if overflowed {
            QUEUE_OVERFLOWS.inc();
        }
        true
    }

    fn enqueue_value(
        &mut self,
        value: DataValue,
    ) {
        let value = self.timestamps_to_return.apply(value);
        let overflowed = self.queue.push(Notification::DataChange(MonitoredItemNotification {
            client_handle: self.client_handle,
            value,
        }));
        if overflowed {
            trace!(monitored_item_id = self.id, "notification queue overflow");
            QUEUE_OVERFLOWS.inc();
        }
    }

    pub fn has_notifications(&self) -> bool {
        self.monitoring_mode == MonitoringMode::Reporting && !self.queue.is_empty()
    }

    /// Drains the queue of a Reporting item; other modes keep their queue.
    pub fn extract_notifications(&mut self) -> Vec<Notification> {
        if self.monitoring_mode != MonitoringMode::Reporting {
            return Vec::new();
        }
        self.queue.drain()
    }

    /// Re-queues the cached value so a new owner sees the current state.
    pub fn resend_cached_value(&mut self) -> bool {
        if self.monitoring_mode != MonitoringMode::Reporting {
            return false;
        }
        match self.last_value.clone() {
            Some(value) => {
                self.enqueue_value(value);
                true
            }
            None => false,
        }
    }

    /// Applies new parameters. On a filter error nothing is changed.
    pub fn modify(
        &mut self,
        request: &MonitoredItemModifyRequest,
        timestamps_to_return: TimestampsToReturn,
        publishing_interval: f64,
        config: &MonitoredItemConfig,
        address_space: &dyn AddressSpace,
    ) -> ServiceResult<Option<EventFilterResult>> {
        let params = &request.requested_parameters;
        let (filter, filter_result) = ItemFilter::validate(
            &params.filter,
            &self.item_to_monitor.node_id,
            self.item_to_monitor.attribute_id,
            address_space,
        )?;

        self.filter = filter;
        self.sampling_interval = revise_sampling_interval(
            params.sampling_interval,
            self.item_to_monitor.attribute_id,
            publishing_interval,
            Some(self.sampling_interval),
            config,
        );
        self.queue.resize(
            QueueSize::revise(params.queue_size, config.max_queue_size),
            params.discard_oldest,
        );
        self.client_handle = params.client_handle;
        self.timestamps_to_return = timestamps_to_return;
        Ok(filter_result)
    }
}

fn validate_data_encoding(target: &ReadValueId) -> ServiceResult<()> {
    match target.data_encoding.as_deref() {
        None | Some("") => Ok(()),
        Some(DEFAULT_BINARY_ENCODING) if target.attribute_id == AttributeId::Value => Ok(()),
        Some(_) => Err(StatusCode::BAD_DATA_ENCODING_INVALID),
    }
}

/// Revised sampling interval in milliseconds; 0 means exception based.
pub(crate) fn revise_sampling_interval(
    requested: f64,
    attribute_id: AttributeId,
    publishing_interval: f64,
    previous: Option<f64>,
    config: &MonitoredItemConfig,
) -> f64 {
    if attribute_id != AttributeId::Value {
        return 0.0;
    }
    let requested = if requested.is_nan() || requested < 0.0 {
        publishing_interval
    } else {
        requested
    };
    if requested == 0.0 {
        return match previous {
            Some(previous) if previous > 0.0 => config.min_sampling_interval_ms,
            _ => 0.0,
        };
    }
    requested.clamp(config.min_sampling_interval_ms, config.max_sampling_interval_ms)
}
