//! Request and response payloads of the subscription service set.

use std::time::{Duration, SystemTime};

use super::{
    AttributeId, DataValue, EventFilterResult, MonitoredItemId, MonitoringFilter, NodeId, NotificationMessage,
    StatusCode, SubscriptionId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitoringMode {
    Disabled,
    Sampling,
    #[default]
    Reporting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampsToReturn {
    Source,
    Server,
    #[default]
    Both,
    Neither,
}

impl TimestampsToReturn {
    /// Strips the timestamps the client did not ask for. The server timestamp
    /// is filled in when requested but missing.
    pub(crate) fn apply(
        &self,
        mut value: DataValue,
    ) -> DataValue {
        let (source, server) = match self {
            TimestampsToReturn::Source => (true, false),
            TimestampsToReturn::Server => (false, true),
            TimestampsToReturn::Both => (true, true),
            TimestampsToReturn::Neither => (false, false),
        };
        if !source {
            value.source_timestamp = None;
        }
        if server {
            value.server_timestamp.get_or_insert_with(SystemTime::now);
        } else {
            value.server_timestamp = None;
        }
        value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadValueId {
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
    pub index_range: Option<String>,
    pub data_encoding: Option<String>,
}

impl ReadValueId {
    pub fn new(
        node_id: NodeId,
        attribute_id: AttributeId,
    ) -> Self {
        ReadValueId {
            node_id,
            attribute_id,
            index_range: None,
            data_encoding: None,
        }
    }

    pub fn value(node_id: NodeId) -> Self {
        Self::new(node_id, AttributeId::Value)
    }

    pub fn with_index_range(
        mut self,
        range: &str,
    ) -> Self {
        self.index_range = Some(range.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringParameters {
    pub client_handle: u32,
    /// Milliseconds. Negative means "use the publishing interval", 0 means exception based.
    pub sampling_interval: f64,
    pub filter: MonitoringFilter,
    pub queue_size: u32,
    pub discard_oldest: bool,
}

impl Default for MonitoringParameters {
    fn default() -> Self {
        MonitoringParameters {
            client_handle: 0,
            sampling_interval: -1.0,
            filter: MonitoringFilter::None,
            queue_size: 1,
            discard_oldest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemCreateRequest {
    pub item_to_monitor: ReadValueId,
    pub monitoring_mode: MonitoringMode,
    pub requested_parameters: MonitoringParameters,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoredItemCreateResult {
    pub status_code: StatusCode,
    pub monitored_item_id: MonitoredItemId,
    pub revised_sampling_interval: f64,
    pub revised_queue_size: u32,
    pub filter_result: Option<EventFilterResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateMonitoredItemsRequest {
    pub subscription_id: SubscriptionId,
    pub timestamps_to_return: TimestampsToReturn,
    pub items_to_create: Vec<MonitoredItemCreateRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemModifyRequest {
    pub monitored_item_id: MonitoredItemId,
    pub requested_parameters: MonitoringParameters,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoredItemModifyResult {
    pub status_code: StatusCode,
    pub revised_sampling_interval: f64,
    pub revised_queue_size: u32,
    pub filter_result: Option<EventFilterResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifyMonitoredItemsRequest {
    pub subscription_id: SubscriptionId,
    pub timestamps_to_return: TimestampsToReturn,
    pub items_to_modify: Vec<MonitoredItemModifyRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetMonitoringModeRequest {
    pub subscription_id: SubscriptionId,
    pub monitoring_mode: MonitoringMode,
    pub monitored_item_ids: Vec<MonitoredItemId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteMonitoredItemsRequest {
    pub subscription_id: SubscriptionId,
    pub monitored_item_ids: Vec<MonitoredItemId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSubscriptionRequest {
    /// Milliseconds.
    pub requested_publishing_interval: f64,
    pub requested_lifetime_count: u32,
    pub requested_max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub publishing_enabled: bool,
    pub priority: u8,
}

impl Default for CreateSubscriptionRequest {
    fn default() -> Self {
        CreateSubscriptionRequest {
            requested_publishing_interval: 1000.0,
            requested_lifetime_count: 60,
            requested_max_keep_alive_count: 10,
            max_notifications_per_publish: 0,
            publishing_enabled: true,
            priority: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSubscriptionResponse {
    pub subscription_id: SubscriptionId,
    pub revised_publishing_interval: f64,
    pub revised_lifetime_count: u32,
    pub revised_max_keep_alive_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifySubscriptionRequest {
    pub subscription_id: SubscriptionId,
    pub requested_publishing_interval: f64,
    pub requested_lifetime_count: u32,
    pub requested_max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifySubscriptionResponse {
    pub revised_publishing_interval: f64,
    pub revised_lifetime_count: u32,
    pub revised_max_keep_alive_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetPublishingModeRequest {
    pub publishing_enabled: bool,
    pub subscription_ids: Vec<SubscriptionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferSubscriptionsRequest {
    pub subscription_ids: Vec<SubscriptionId>,
    pub send_initial_values: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferResult {
    pub status_code: StatusCode,
    pub available_sequence_numbers: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionAcknowledgement {
    pub subscription_id: SubscriptionId,
    pub sequence_number: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublishRequest {
    pub subscription_acknowledgements: Vec<SubscriptionAcknowledgement>,
    /// Zero disables the per-request deadline.
    pub timeout_hint: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishResponse {
    pub subscription_id: SubscriptionId,
    pub available_sequence_numbers: Vec<u32>,
    pub more_notifications: bool,
    pub notification_message: NotificationMessage,
    /// Acknowledgement results, in request order.
    pub results: Vec<StatusCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepublishRequest {
    pub subscription_id: SubscriptionId,
    pub retransmit_sequence_number: u32,
}
