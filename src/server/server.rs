use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::sleep_until;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::{ServerEvent, ServerHandle, SubscriptionCore};
use crate::address_space::AddressSpace;
use crate::config::ServerConfig;
use crate::constants::IDLE_WAKEUP_INTERVAL;
use crate::diagnostics::DiagnosticsSink;
use crate::monitored_item::MonitoredItemHandle;
use crate::types::{DataValue, ServiceResult};
use crate::Result;

type SampleCompletion = (MonitoredItemHandle, u64, ServiceResult<DataValue>);

/// Event loop owning the [`SubscriptionCore`].
///
/// Every mutation happens on this task: service calls arrive over the event
/// channel, timers fire from the core's next deadline, and address space
/// reads run on spawned tasks whose completions re-enter through a channel.
pub struct SubscriptionServer {
    core: SubscriptionCore,
    address_space: Arc<dyn AddressSpace>,

    event_rx: mpsc::Receiver<ServerEvent>,
    sample_tx: mpsc::UnboundedSender<SampleCompletion>,
    sample_rx: mpsc::UnboundedReceiver<SampleCompletion>,

    shutdown_signal: watch::Receiver<()>,
}

impl SubscriptionServer {
    pub fn new(
        config: ServerConfig,
        address_space: Arc<dyn AddressSpace>,
        diagnostics: Arc<dyn DiagnosticsSink>,
        shutdown_signal: watch::Receiver<()>,
    ) -> (Self, ServerHandle) {
        let (event_tx, event_rx) = mpsc::channel(config.publish.event_channel_capacity);
        let (sample_tx, sample_rx) = mpsc::unbounded_channel();
        let server = SubscriptionServer {
            core: SubscriptionCore::new(config, address_space.clone(), diagnostics),
            address_space,
            event_rx,
            sample_tx,
            sample_rx,
            shutdown_signal,
        };
        (server, ServerHandle::new(event_tx))
    }

    pub async fn run(mut self) -> Result<()> {
        info!("subscription server started");
        loop {
            let deadline = self
                .core
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + IDLE_WAKEUP_INTERVAL);

            tokio::select! {
                // Use biased to ensure branch order
                biased;
                // P0: shutdown received
                _ = self.shutdown_signal.changed() => {
                    warn!("shutdown signal received.");
                    self.core.shutdown();
                    return Ok(());
                }
                // P1: publishing intervals, sampling timers and request deadlines
                _ = sleep_until(deadline) => {
                    trace!("receive tick");
                    self.core.tick(Instant::now());
                }
                // P2: completed sampling reads, bounded by the reads dispatched
                Some((handle, generation, result)) = self.sample_rx.recv() => {
                    self.core.record_sample(handle, generation, result);
                }
                // P3: service calls and node layer pushes
                event = self.event_rx.recv() => {
                    let Some(event) = event else {
                        info!("every server handle dropped, stopping");
                        self.core.shutdown();
                        return Ok(());
                    };
                    self.handle_event(event, Instant::now());
                }
            }

            self.dispatch_samples();
        }
    }

    fn handle_event(
        &mut self,
        event: ServerEvent,
        now: Instant,
    ) {
        let core = &mut self.core;
        match event {
            ServerEvent::OpenSession(session_id, responder) => {
                let _ = responder.send(core.open_session(session_id));
            }
            ServerEvent::CloseSession {
                session_id,
                delete_subscriptions,
                responder,
            } => {
                let _ = responder.send(core.close_session(session_id, delete_subscriptions));
            }
            ServerEvent::SessionTimedOut(session_id, responder) => {
                let _ = responder.send(core.session_timed_out(session_id));
            }
            ServerEvent::ChannelReplaced(session_id, responder) => {
                let _ = responder.send(core.channel_replaced(session_id));
            }
            ServerEvent::CreateSubscription(session_id, request, responder) => {
                let _ = responder.send(core.create_subscription(session_id, request, now));
            }
            ServerEvent::ModifySubscription(session_id, request, responder) => {
                let _ = responder.send(core.modify_subscription(session_id, request, now));
            }
            ServerEvent::DeleteSubscriptions(session_id, ids, responder) => {
                let _ = responder.send(core.delete_subscriptions(session_id, &ids, now));
            }
            ServerEvent::SetPublishingMode(session_id, request, responder) => {
                let _ = responder.send(core.set_publishing_mode(session_id, request));
            }
            ServerEvent::TransferSubscriptions(session_id, request, responder) => {
                let _ = responder.send(core.transfer_subscriptions(session_id, request, now));
            }
            ServerEvent::CreateMonitoredItems(session_id, request, responder) => {
                let _ = responder.send(core.create_monitored_items(session_id, request, now));
            }
            ServerEvent::ModifyMonitoredItems(session_id, request, responder) => {
                let _ = responder.send(core.modify_monitored_items(session_id, request, now));
            }
            ServerEvent::SetMonitoringMode(session_id, request, responder) => {
                let _ = responder.send(core.set_monitoring_mode(session_id, request, now));
            }
            ServerEvent::DeleteMonitoredItems(session_id, request, responder) => {
                let _ = responder.send(core.delete_monitored_items(session_id, request));
            }
            ServerEvent::Publish(session_id, request, responder) => {
                core.publish(session_id, request, responder, now);
            }
            ServerEvent::Republish(session_id, request, responder) => {
                let _ = responder.send(core.republish(session_id, request));
            }
            ServerEvent::DataChange {
                node_id,
                attribute_id,
                value,
            } => core.notify_data_change(&node_id, attribute_id, value),
            ServerEvent::RaiseEvent { notifier, event } => core.notify_event(&notifier, &event),
        }
    }

    /// Runs owed reads off the loop; results come back as sample completions.
    fn dispatch_samples(&mut self) {
        let requests = self.core.take_sample_requests();
        if requests.is_empty() {
            return;
        }
        debug!(count = requests.len(), "dispatch sampling reads");

        let address_space = self.address_space.clone();
        let sample_tx = self.sample_tx.clone();
        tokio::spawn(async move {
            let reads = requests.into_iter().map(|request| {
                let address_space = address_space.clone();
                async move {
                    let result = address_space
                        .read_attribute(&request.node_id, request.attribute_id, request.index_range)
                        .await;
                    (request.handle, request.generation, result)
                }
            });
            for completion in join_all(reads).await {
                if sample_tx.send(completion).is_err() {
                    break;
                }
            }
        });
    }
}
