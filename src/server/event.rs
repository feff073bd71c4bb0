use tokio::sync::oneshot;

use crate::types::{
    AttributeId, CreateMonitoredItemsRequest, CreateSubscriptionRequest, CreateSubscriptionResponse, DataValue,
    DeleteMonitoredItemsRequest, Event, ModifyMonitoredItemsRequest, ModifySubscriptionRequest,
    ModifySubscriptionResponse, MonitoredItemCreateResult, MonitoredItemModifyResult, NodeId, NotificationMessage,
    PublishRequest, PublishResponse, RepublishRequest, ServiceResult, SessionId, SetMonitoringModeRequest,
    SetPublishingModeRequest, StatusCode, SubscriptionId, TransferResult, TransferSubscriptionsRequest,
};

pub type Responder<T> = oneshot::Sender<ServiceResult<T>>;

/// Everything the server actor reacts to, besides timers and sampling reads.
#[derive(Debug)]
pub enum ServerEvent {
    OpenSession(SessionId, Responder<()>),
    CloseSession {
        session_id: SessionId,
        delete_subscriptions: bool,
        responder: Responder<()>,
    },
    SessionTimedOut(SessionId, Responder<()>),
    ChannelReplaced(SessionId, Responder<usize>),

    CreateSubscription(SessionId, CreateSubscriptionRequest, Responder<CreateSubscriptionResponse>),
    ModifySubscription(SessionId, ModifySubscriptionRequest, Responder<ModifySubscriptionResponse>),
    DeleteSubscriptions(SessionId, Vec<SubscriptionId>, Responder<Vec<StatusCode>>),
    SetPublishingMode(SessionId, SetPublishingModeRequest, Responder<Vec<StatusCode>>),
    TransferSubscriptions(SessionId, TransferSubscriptionsRequest, Responder<Vec<TransferResult>>),

    CreateMonitoredItems(
        SessionId,
        CreateMonitoredItemsRequest,
        Responder<Vec<MonitoredItemCreateResult>>,
    ),
    ModifyMonitoredItems(
        SessionId,
        ModifyMonitoredItemsRequest,
        Responder<Vec<MonitoredItemModifyResult>>,
    ),
    SetMonitoringMode(SessionId, SetMonitoringModeRequest, Responder<Vec<StatusCode>>),
    DeleteMonitoredItems(SessionId, DeleteMonitoredItemsRequest, Responder<Vec<StatusCode>>),

    Publish(SessionId, PublishRequest, Responder<PublishResponse>),
    Republish(SessionId, RepublishRequest, Responder<NotificationMessage>),

    // Node layer pushes
    DataChange {
        node_id: NodeId,
        attribute_id: AttributeId,
        value: DataValue,
    },
    RaiseEvent {
        notifier: NodeId,
        event: Event,
    },
}
