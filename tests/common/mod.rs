use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use ua_subscription_engine::types::{
    CreateMonitoredItemsRequest, CreateSubscriptionRequest, DataValue, MonitoredItemCreateRequest, MonitoredItemId,
    MonitoringFilter, MonitoringMode, MonitoringParameters, NodeId, PublishRequest, PublishResponse, ReadValueId,
    SessionId, SubscriptionAcknowledgement, SubscriptionId, TimestampsToReturn,
};
use ua_subscription_engine::{MemoryAddressSpace, NoopDiagnostics, Result, ServerConfig, ServerHandle, SubscriptionServer};

pub const PUBLISHING_INTERVAL_MS: f64 = 100.0;
pub const MAX_KEEP_ALIVE_COUNT: u32 = 3;
pub const LIFETIME_COUNT: u32 = 30;

pub fn enable_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn temperature() -> NodeId {
    NodeId::string(2, "Boiler.Temperature")
}

pub struct TestContext {
    pub handle: ServerHandle,
    pub address_space: Arc<MemoryAddressSpace>,
    // Dropping the sender stops the server.
    _shutdown: watch::Sender<()>,
}

/// Spawns a server over an address space holding [`temperature`] at 20.0.
pub fn start_server(config: ServerConfig) -> TestContext {
    enable_logger();
    let address_space = Arc::new(MemoryAddressSpace::new());
    address_space.add_variable(temperature(), DataValue::new(20.0));

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let (server, handle) = SubscriptionServer::new(
        config,
        address_space.clone(),
        Arc::new(NoopDiagnostics),
        shutdown_rx,
    );
    tokio::spawn(server.run());
    TestContext {
        handle,
        address_space,
        _shutdown: shutdown_tx,
    }
}

pub async fn subscribe(
    handle: &ServerHandle,
    session_id: SessionId,
) -> Result<SubscriptionId> {
    let response = handle
        .create_subscription(
            session_id,
            CreateSubscriptionRequest {
                requested_publishing_interval: PUBLISHING_INTERVAL_MS,
                requested_lifetime_count: LIFETIME_COUNT,
                requested_max_keep_alive_count: MAX_KEEP_ALIVE_COUNT,
                ..Default::default()
            },
        )
        .await?;
    Ok(response.subscription_id)
}

/// Monitors the value of `node_id` on change, reporting with client handle 1.
pub async fn monitor_value(
    handle: &ServerHandle,
    session_id: SessionId,
    subscription_id: SubscriptionId,
    node_id: NodeId,
    filter: MonitoringFilter,
) -> Result<MonitoredItemId> {
    let results = handle
        .create_monitored_items(
            session_id,
            CreateMonitoredItemsRequest {
                subscription_id,
                timestamps_to_return: TimestampsToReturn::Neither,
                items_to_create: vec![MonitoredItemCreateRequest {
                    item_to_monitor: ReadValueId::value(node_id),
                    monitoring_mode: MonitoringMode::Reporting,
                    requested_parameters: MonitoringParameters {
                        client_handle: 1,
                        sampling_interval: 0.0,
                        filter,
                        queue_size: 10,
                        ..Default::default()
                    },
                }],
            },
        )
        .await?;
    assert!(results[0].status_code.is_good(), "item rejected: {:?}", results[0]);
    Ok(results[0].monitored_item_id)
}

pub async fn publish(
    handle: &ServerHandle,
    session_id: SessionId,
) -> Result<PublishResponse> {
    handle.publish(session_id, PublishRequest::default()).await
}

pub async fn publish_with_acks(
    handle: &ServerHandle,
    session_id: SessionId,
    acks: &[(SubscriptionId, u32)],
) -> Result<PublishResponse> {
    let request = PublishRequest {
        subscription_acknowledgements: acks
            .iter()
            .map(|&(subscription_id, sequence_number)| SubscriptionAcknowledgement {
                subscription_id,
                sequence_number,
            })
            .collect(),
        ..Default::default()
    };
    handle.publish(session_id, request).await
}

/// Values reported in a publish response, in order.
pub fn reported_values(response: &PublishResponse) -> Vec<DataValue> {
    response
        .notification_message
        .data_changes()
        .map(|change| change.value.clone())
        .collect()
}
