use std::collections::BTreeSet;
use std::collections::HashMap;

use tokio::time::Instant;
use tracing::trace;

use crate::monitored_item::{MonitoredItemHandle, SamplerKey, SamplingSource};
use crate::timer::SamplingTimerRegistry;
use crate::types::{AttributeId, NodeId, NumericRange};

/// A read the server actor must perform for a periodically sampled item.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    pub handle: MonitoredItemHandle,
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
    pub index_range: Option<NumericRange>,
    /// Read order per item; older completions are dropped
    pub generation: u64,
}

/// Routes sampling sources to the active monitored items that consume them:
/// shared interval timers, change pushes per (node, attribute) and event
/// streams per notifier.
#[derive(Debug, Default)]
pub struct SamplerRegistry {
    timers: SamplingTimerRegistry,
    change_watchers: HashMap<(NodeId, AttributeId), BTreeSet<MonitoredItemHandle>>,
    event_watchers: HashMap<NodeId, BTreeSet<MonitoredItemHandle>>,
}

impl SamplerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        handle: MonitoredItemHandle,
        key: &SamplerKey,
        now: Instant,
    ) {
        trace!(?handle, ?key.source, node_id = %key.node_id, "register sampler");
        match key.source {
            SamplingSource::Periodic(interval) => self.timers.register(interval, handle, now),
            SamplingSource::OnChange => {
                self.change_watchers
                    .entry((key.node_id.clone(), key.attribute_id))
                    .or_default()
                    .insert(handle);
            }
            SamplingSource::Events => {
                self.event_watchers.entry(key.node_id.clone()).or_default().insert(handle);
            }
        }
    }

    pub fn unregister(
        &mut self,
        handle: MonitoredItemHandle,
        key: &SamplerKey,
    ) -> bool {
        match key.source {
            SamplingSource::Periodic(interval) => self.timers.unregister(interval, &handle),
            SamplingSource::OnChange => {
                let watch_key = (key.node_id.clone(), key.attribute_id);
                remove_watcher(&mut self.change_watchers, &watch_key, &handle)
            }
            SamplingSource::Events => remove_watcher(&mut self.event_watchers, &key.node_id, &handle),
        }
    }

    pub fn change_watchers(
        &self,
        node_id: &NodeId,
        attribute_id: AttributeId,
    ) -> Vec<MonitoredItemHandle> {
        self.change_watchers
            .get(&(node_id.clone(), attribute_id))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn event_watchers(
        &self,
        notifier: &NodeId,
    ) -> Vec<MonitoredItemHandle> {
        self.event_watchers
            .get(notifier)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Items whose sampling timer fired by `now`.
    pub fn poll_expired(
        &mut self,
        now: Instant,
    ) -> Vec<MonitoredItemHandle> {
        self.timers.poll_expired(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.timer_count()
    }
}

fn remove_watcher<K: std::hash::Hash + Eq>(
    watchers: &mut HashMap<K, BTreeSet<MonitoredItemHandle>>,
    key: &K,
    handle: &MonitoredItemHandle,
) -> bool {
    let Some(set) = watchers.get_mut(key) else {
        return false;
    };
    let removed = set.remove(handle);
    if set.is_empty() {
        watchers.remove(key);
    }
    removed
}
