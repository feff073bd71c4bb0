use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use ua_subscription_engine::types::{
    AttributeId, CreateMonitoredItemsRequest, CreateSubscriptionRequest, DataValue, MonitoredItemCreateRequest,
    MonitoringMode, MonitoringParameters, NodeId, PublishRequest, ReadValueId, SubscriptionAcknowledgement,
    TimestampsToReturn,
};
use ua_subscription_engine::{
    gather, register_custom_metrics, Error, MemoryAddressSpace, PrometheusDiagnostics, Result, ServerConfig,
    ServerHandle, SubscriptionServer, REGISTRY,
};

const DEMO_SESSION: u32 = 1;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = ServerConfig::new()?.validate()?;

    // Initializing Logs
    let log_dir = std::env::var("UA_LOG_DIR").map_or_else(|_| PathBuf::from("./logs"), PathBuf::from);
    let _guard = init_observability(&log_dir)?;
    register_custom_metrics(&REGISTRY);

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    // Demo node layer
    let address_space = Arc::new(MemoryAddressSpace::new());
    let temperature = NodeId::string(2, "Boiler.Temperature");
    address_space.add_variable(temperature.clone(), DataValue::now(20.0));

    let (server, handle) = SubscriptionServer::new(
        settings,
        address_space.clone(),
        Arc::new(PrometheusDiagnostics::new()),
        graceful_rx.clone(),
    );
    let server_task = tokio::spawn(server.run());

    tokio::spawn(simulate_node(address_space, handle.clone(), temperature.clone(), graceful_rx.clone()));
    tokio::spawn(async move {
        if let Err(e) = demo_client(handle, temperature).await {
            warn!("demo client stopped: {}", e);
        }
    });

    info!("Application started. Waiting for CTRL+C signal...");
    // Listen on Shutdown Signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    if let Err(e) = server_task.await? {
        error!("server stops: {:?}", e);
    }

    match gather() {
        Ok(text) => debug!("final metrics:\n{}", text),
        Err(e) => warn!("metrics unavailable: {}", e),
    }
    println!("Exiting program.");
    Ok(())
}

/// Writes a new temperature every second and pushes the change.
async fn simulate_node(
    address_space: Arc<MemoryAddressSpace>,
    handle: ServerHandle,
    node_id: NodeId,
    mut shutdown: watch::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut reading = 20.0_f64;
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = ticker.tick() => {}
        }
        reading += 0.5;
        let value = DataValue::now(reading);
        if let Err(status) = address_space.write_value(&node_id, value.clone()) {
            warn!(%status, "simulated write failed");
            continue;
        }
        if handle
            .notify_data_change(node_id.clone(), AttributeId::Value, value)
            .await
            .is_err()
        {
            return;
        }
    }
}

/// Subscribes to one node and keeps a publish request outstanding.
async fn demo_client(
    handle: ServerHandle,
    node_id: NodeId,
) -> Result<()> {
    handle.open_session(DEMO_SESSION).await?;
    let subscription = handle
        .create_subscription(
            DEMO_SESSION,
            CreateSubscriptionRequest {
                requested_publishing_interval: 1000.0,
                requested_max_keep_alive_count: 5,
                requested_lifetime_count: 30,
                ..Default::default()
            },
        )
        .await?;
    let results = handle
        .create_monitored_items(
            DEMO_SESSION,
            CreateMonitoredItemsRequest {
                subscription_id: subscription.subscription_id,
                timestamps_to_return: TimestampsToReturn::Both,
                items_to_create: vec![MonitoredItemCreateRequest {
                    item_to_monitor: ReadValueId::value(node_id),
                    monitoring_mode: MonitoringMode::Reporting,
                    requested_parameters: MonitoringParameters {
                        client_handle: 1,
                        sampling_interval: 0.0,
                        queue_size: 5,
                        ..Default::default()
                    },
                }],
            },
        )
        .await?;
    info!(subscription_id = subscription.subscription_id, items = ?results, "demo subscription ready");

    let mut acknowledgements = Vec::new();
    loop {
        let response = handle
            .publish(
                DEMO_SESSION,
                PublishRequest {
                    subscription_acknowledgements: std::mem::take(&mut acknowledgements),
                    ..Default::default()
                },
            )
            .await?;
        let message = &response.notification_message;
        if message.is_keep_alive() {
            info!(subscription_id = response.subscription_id, "keep-alive");
            continue;
        }
        for change in message.data_changes() {
            info!(
                sequence_number = message.sequence_number,
                client_handle = change.client_handle,
                value = ?change.value.value,
                "data change"
            );
        }
        acknowledgements.push(SubscriptionAcknowledgement {
            subscription_id: response.subscription_id,
            sequence_number: message.sequence_number,
        });
    }
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::Fatal(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown completed");
    Ok(())
}

pub fn init_observability(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let log_file = tracing_appender::rolling::never(log_dir, "ua-subscription.log");

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
