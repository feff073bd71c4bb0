//! Write-only export of subscription diagnostics.

use std::collections::HashMap;
use std::collections::HashSet;

#[cfg(test)]
use mockall::automock;
use parking_lot::Mutex;

use crate::metrics::{
    SESSION_PUBLISH_REQUESTS, SESSION_PUBLISH_REQUESTS_DROPPED, SESSION_QUEUED_PUBLISH_REQUESTS,
    SESSION_REPUBLISH_REQUESTS, SESSION_SUBSCRIPTIONS, SUBSCRIPTION_LIFETIME_COUNT, SUBSCRIPTION_MONITORED_ITEMS,
    SUBSCRIPTION_NOTIFICATIONS, SUBSCRIPTION_UNACKNOWLEDGED_MESSAGES,
};
use crate::publish_engine::SessionDiagnostics;
use crate::subscription::SubscriptionDiagnostics;
use crate::types::{SessionId, SubscriptionId};

/// Receives diagnostics snapshots. The engine never reads anything back.
#[cfg_attr(test, automock)]
pub trait DiagnosticsSink: Send + Sync + 'static {
    fn expose(
        &self,
        diagnostics: &SubscriptionDiagnostics,
    );

    /// The subscription was deleted, expired or orphaned.
    fn withdraw(
        &self,
        subscription_id: SubscriptionId,
    );

    fn expose_session(
        &self,
        diagnostics: &SessionDiagnostics,
    );

    /// The session was closed or timed out.
    fn withdraw_session(
        &self,
        session_id: SessionId,
    );
}

#[derive(Debug, Default)]
pub struct NoopDiagnostics;

impl DiagnosticsSink for NoopDiagnostics {
    fn expose(
        &self,
        _diagnostics: &SubscriptionDiagnostics,
    ) {
    }

    fn withdraw(
        &self,
        _subscription_id: SubscriptionId,
    ) {
    }

    fn expose_session(
        &self,
        _diagnostics: &SessionDiagnostics,
    ) {
    }

    fn withdraw_session(
        &self,
        _session_id: SessionId,
    ) {
    }
}

/// Mirrors snapshots into per-subscription and per-session prometheus gauges.
#[derive(Debug, Default)]
pub struct PrometheusDiagnostics {
    exposed: Mutex<HashMap<SubscriptionId, [String; 2]>>,
    sessions: Mutex<HashSet<SessionId>>,
}

impl PrometheusDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exposed_count(&self) -> usize {
        self.exposed.lock().len()
    }

    pub fn exposed_session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    fn remove_series(labels: &[String; 2]) {
        let labels = [labels[0].as_str(), labels[1].as_str()];
        let _ = SUBSCRIPTION_MONITORED_ITEMS.remove_label_values(&labels);
        let _ = SUBSCRIPTION_UNACKNOWLEDGED_MESSAGES.remove_label_values(&labels);
        let _ = SUBSCRIPTION_NOTIFICATIONS.remove_label_values(&labels);
        let _ = SUBSCRIPTION_LIFETIME_COUNT.remove_label_values(&labels);
    }

    fn remove_session_series(session: &str) {
        let _ = SESSION_SUBSCRIPTIONS.remove_label_values(&[session]);
        let _ = SESSION_PUBLISH_REQUESTS.remove_label_values(&[session]);
        let _ = SESSION_QUEUED_PUBLISH_REQUESTS.remove_label_values(&[session]);
        for reason in ["too_many", "timeout"] {
            let _ = SESSION_PUBLISH_REQUESTS_DROPPED.remove_label_values(&[session, reason]);
        }
        for result in ["ok", "not_available"] {
            let _ = SESSION_REPUBLISH_REQUESTS.remove_label_values(&[session, result]);
        }
    }
}

impl DiagnosticsSink for PrometheusDiagnostics {
    fn expose(
        &self,
        diagnostics: &SubscriptionDiagnostics,
    ) {
        let labels = [
            diagnostics
                .session_id
                .map_or_else(|| "none".to_string(), |id| id.to_string()),
            diagnostics.subscription_id.to_string(),
        ];

        let mut exposed = self.exposed.lock();
        if let Some(previous) = exposed.insert(diagnostics.subscription_id, labels.clone()) {
            if previous != labels {
                Self::remove_series(&previous);
            }
        }

        let values = [labels[0].as_str(), labels[1].as_str()];
        SUBSCRIPTION_MONITORED_ITEMS
            .with_label_values(&values)
            .set(i64::from(diagnostics.monitored_item_count));
        SUBSCRIPTION_UNACKNOWLEDGED_MESSAGES
            .with_label_values(&values)
            .set(i64::from(diagnostics.unacknowledged_message_count));
        SUBSCRIPTION_NOTIFICATIONS
            .with_label_values(&values)
            .set(i64::from(diagnostics.notifications_count));
        SUBSCRIPTION_LIFETIME_COUNT
            .with_label_values(&values)
            .set(i64::from(diagnostics.current_lifetime_count));
    }

    fn withdraw(
        &self,
        subscription_id: SubscriptionId,
    ) {
        if let Some(labels) = self.exposed.lock().remove(&subscription_id) {
            Self::remove_series(&labels);
        }
    }

    fn expose_session(
        &self,
        diagnostics: &SessionDiagnostics,
    ) {
        self.sessions.lock().insert(diagnostics.session_id);
        let session = diagnostics.session_id.to_string();
        let session = session.as_str();
        SESSION_SUBSCRIPTIONS
            .with_label_values(&[session])
            .set(i64::from(diagnostics.subscription_count));
        SESSION_PUBLISH_REQUESTS
            .with_label_values(&[session])
            .set(i64::from(diagnostics.publish_request_count));
        SESSION_QUEUED_PUBLISH_REQUESTS
            .with_label_values(&[session])
            .set(i64::from(diagnostics.queued_publish_request_count));
        SESSION_PUBLISH_REQUESTS_DROPPED
            .with_label_values(&[session, "too_many"])
            .set(i64::from(diagnostics.evicted_publish_request_count));
        SESSION_PUBLISH_REQUESTS_DROPPED
            .with_label_values(&[session, "timeout"])
            .set(i64::from(diagnostics.timed_out_publish_request_count));
        SESSION_REPUBLISH_REQUESTS
            .with_label_values(&[session, "ok"])
            .set(i64::from(diagnostics.republish_message_count));
        SESSION_REPUBLISH_REQUESTS
            .with_label_values(&[session, "not_available"])
            .set(i64::from(
                diagnostics
                    .republish_request_count
                    .saturating_sub(diagnostics.republish_message_count),
            ));
    }

    fn withdraw_session(
        &self,
        session_id: SessionId,
    ) {
        if self.sessions.lock().remove(&session_id) {
            Self::remove_session_series(&session_id.to_string());
        }
    }
}
