use crate::types::SessionId;

/// Snapshot of the per-session publish counters, exported the same
/// write-only way as [`crate::SubscriptionDiagnostics`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionDiagnostics {
    pub session_id: SessionId,
    pub subscription_count: u32,
    pub publish_request_count: u32,
    pub queued_publish_request_count: u32,
    pub evicted_publish_request_count: u32,
    pub timed_out_publish_request_count: u32,
    pub republish_request_count: u32,
    pub republish_message_count: u32,
}
