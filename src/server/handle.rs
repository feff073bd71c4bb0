use tokio::sync::mpsc;
use tokio::sync::oneshot;

use super::{Responder, ServerEvent};
use crate::types::{
    AttributeId, CreateMonitoredItemsRequest, CreateSubscriptionRequest, CreateSubscriptionResponse, DataValue,
    DeleteMonitoredItemsRequest, Event, ModifyMonitoredItemsRequest, ModifySubscriptionRequest,
    ModifySubscriptionResponse, MonitoredItemCreateResult, MonitoredItemModifyResult, NodeId, NotificationMessage,
    PublishRequest, PublishResponse, RepublishRequest, SessionId, SetMonitoringModeRequest, SetPublishingModeRequest,
    StatusCode, SubscriptionId, TransferResult, TransferSubscriptionsRequest,
};
use crate::{Error, Result, SystemError};

/// Cloneable entry point to a running [`super::SubscriptionServer`].
///
/// A service fault comes back as [`Error::ServiceFault`]; per-element
/// statuses stay inside the returned vectors.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    event_tx: mpsc::Sender<ServerEvent>,
}

impl ServerHandle {
    pub(crate) fn new(event_tx: mpsc::Sender<ServerEvent>) -> Self {
        ServerHandle { event_tx }
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        event: impl FnOnce(Responder<T>) -> ServerEvent,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.event_tx
            .send(event(tx))
            .await
            .map_err(|_| SystemError::ServerUnavailable)?;
        let result = rx.await.map_err(|_| SystemError::ResponderDropped { operation })?;
        result.map_err(Error::ServiceFault)
    }

    async fn push(
        &self,
        event: ServerEvent,
    ) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| SystemError::ServerUnavailable.into())
    }

    // ---------------------------------------------------------------------
    // Session layer

    pub async fn open_session(
        &self,
        session_id: SessionId,
    ) -> Result<()> {
        self.call("open_session", |tx| ServerEvent::OpenSession(session_id, tx))
            .await
    }

    pub async fn close_session(
        &self,
        session_id: SessionId,
        delete_subscriptions: bool,
    ) -> Result<()> {
        self.call("close_session", |responder| ServerEvent::CloseSession {
            session_id,
            delete_subscriptions,
            responder,
        })
        .await
    }

    pub async fn session_timed_out(
        &self,
        session_id: SessionId,
    ) -> Result<()> {
        self.call("session_timed_out", |tx| ServerEvent::SessionTimedOut(session_id, tx))
            .await
    }

    /// Returns how many queued publish requests were cancelled.
    pub async fn channel_replaced(
        &self,
        session_id: SessionId,
    ) -> Result<usize> {
        self.call("channel_replaced", |tx| ServerEvent::ChannelReplaced(session_id, tx))
            .await
    }

    // ---------------------------------------------------------------------
    // Subscription services

    pub async fn create_subscription(
        &self,
        session_id: SessionId,
        request: CreateSubscriptionRequest,
    ) -> Result<CreateSubscriptionResponse> {
        self.call("create_subscription", |tx| {
            ServerEvent::CreateSubscription(session_id, request, tx)
        })
        .await
    }

    pub async fn modify_subscription(
        &self,
        session_id: SessionId,
        request: ModifySubscriptionRequest,
    ) -> Result<ModifySubscriptionResponse> {
        self.call("modify_subscription", |tx| {
            ServerEvent::ModifySubscription(session_id, request, tx)
        })
        .await
    }

    pub async fn delete_subscriptions(
        &self,
        session_id: SessionId,
        subscription_ids: Vec<SubscriptionId>,
    ) -> Result<Vec<StatusCode>> {
        self.call("delete_subscriptions", |tx| {
            ServerEvent::DeleteSubscriptions(session_id, subscription_ids, tx)
        })
        .await
    }

    pub async fn set_publishing_mode(
        &self,
        session_id: SessionId,
        request: SetPublishingModeRequest,
    ) -> Result<Vec<StatusCode>> {
        self.call("set_publishing_mode", |tx| {
            ServerEvent::SetPublishingMode(session_id, request, tx)
        })
        .await
    }

    pub async fn transfer_subscriptions(
        &self,
        session_id: SessionId,
        request: TransferSubscriptionsRequest,
    ) -> Result<Vec<TransferResult>> {
        self.call("transfer_subscriptions", |tx| {
            ServerEvent::TransferSubscriptions(session_id, request, tx)
        })
        .await
    }

    // ---------------------------------------------------------------------
    // Monitored item services

    pub async fn create_monitored_items(
        &self,
        session_id: SessionId,
        request: CreateMonitoredItemsRequest,
    ) -> Result<Vec<MonitoredItemCreateResult>> {
        self.call("create_monitored_items", |tx| {
            ServerEvent::CreateMonitoredItems(session_id, request, tx)
        })
        .await
    }

    pub async fn modify_monitored_items(
        &self,
        session_id: SessionId,
        request: ModifyMonitoredItemsRequest,
    ) -> Result<Vec<MonitoredItemModifyResult>> {
        self.call("modify_monitored_items", |tx| {
            ServerEvent::ModifyMonitoredItems(session_id, request, tx)
        })
        .await
    }

    pub async fn set_monitoring_mode(
        &self,
        session_id: SessionId,
        request: SetMonitoringModeRequest,
    ) -> Result<Vec<StatusCode>> {
        self.call("set_monitoring_mode", |tx| {
            ServerEvent::SetMonitoringMode(session_id, request, tx)
        })
        .await
    }

    pub async fn delete_monitored_items(
        &self,
        session_id: SessionId,
        request: DeleteMonitoredItemsRequest,
    ) -> Result<Vec<StatusCode>> {
        self.call("delete_monitored_items", |tx| {
            ServerEvent::DeleteMonitoredItems(session_id, request, tx)
        })
        .await
    }

    // ---------------------------------------------------------------------
    // Publish exchange

    /// Resolves once the server pairs the request with a message, or fails it.
    pub async fn publish(
        &self,
        session_id: SessionId,
        request: PublishRequest,
    ) -> Result<PublishResponse> {
        self.call("publish", |tx| ServerEvent::Publish(session_id, request, tx))
            .await
    }

    pub async fn republish(
        &self,
        session_id: SessionId,
        request: RepublishRequest,
    ) -> Result<NotificationMessage> {
        self.call("republish", |tx| ServerEvent::Republish(session_id, request, tx))
            .await
    }

    // ---------------------------------------------------------------------
    // Node layer pushes

    pub async fn notify_data_change(
        &self,
        node_id: NodeId,
        attribute_id: AttributeId,
        value: DataValue,
    ) -> Result<()> {
        self.push(ServerEvent::DataChange {
            node_id,
            attribute_id,
            value,
        })
        .await
    }

    pub async fn notify_event(
        &self,
        notifier: NodeId,
        event: Event,
    ) -> Result<()> {
        self.push(ServerEvent::RaiseEvent { notifier, event }).await
    }
}
