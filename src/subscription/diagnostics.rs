use crate::types::{SessionId, SubscriptionId};

/// Snapshot of the per-subscription diagnostics counters.
///
/// Exported write-only through a [`crate::DiagnosticsSink`]; the engine never
/// reads it back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionDiagnostics {
    pub subscription_id: SubscriptionId,
    pub session_id: Option<SessionId>,
    pub priority: u8,
    pub publishing_interval: f64,
    pub max_keep_alive_count: u32,
    pub max_lifetime_count: u32,
    pub max_notifications_per_publish: u32,
    pub publishing_enabled: bool,
    pub modify_count: u32,
    pub enable_count: u32,
    pub disable_count: u32,
    pub republish_request_count: u32,
    pub republish_message_count: u32,
    pub transfer_request_count: u32,
    pub transferred_to_alt_client_count: u32,
    pub publish_request_count: u32,
    pub data_change_notifications_count: u32,
    pub event_notifications_count: u32,
    pub notifications_count: u32,
    pub late_publish_request_count: u32,
    pub keep_alive_message_count: u32,
    pub current_keep_alive_count: u32,
    pub current_lifetime_count: u32,
    pub unacknowledged_message_count: u32,
    pub discarded_message_count: u32,
    pub monitored_item_count: u32,
    pub disabled_monitored_item_count: u32,
    pub next_sequence_number: u32,
}
