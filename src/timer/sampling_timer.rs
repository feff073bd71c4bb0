use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tokio::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::monitored_item::MonitoredItemHandle;

#[derive(Debug)]
struct IntervalTimer {
    next_deadline: Instant,
    members: BTreeSet<MonitoredItemHandle>,
}

/// Shared sampling timers, one per distinct interval.
///
/// Every item registered under an interval is sampled on the same tick, so
/// thousands of items at 100ms cost one timer rather than thousands.
#[derive(Debug, Default)]
pub struct SamplingTimerRegistry {
    timers: BTreeMap<Duration, IntervalTimer>,
}

impl SamplingTimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item to the timer of `interval`, starting that timer if needed.
    pub fn register(
        &mut self,
        interval: Duration,
        handle: MonitoredItemHandle,
        now: Instant,
    ) {
        let timer = self.timers.entry(interval).or_insert_with(|| {
            trace!(?interval, "start shared sampling timer");
            IntervalTimer {
                next_deadline: now + interval,
                members: BTreeSet::new(),
            }
        });
        timer.members.insert(handle);
    }

    /// Removes an item; the timer stops with its last member.
    pub fn unregister(
        &mut self,
        interval: Duration,
        handle: &MonitoredItemHandle,
    ) -> bool {
        let Some(timer) = self.timers.get_mut(&interval) else {
            return false;
        };
        let removed = timer.members.remove(handle);
        if timer.members.is_empty() {
            trace!(?interval, "stop shared sampling timer");
            self.timers.remove(&interval);
        }
        removed
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|timer| timer.next_deadline).min()
    }

    /// Collects the members of every expired timer and re-arms those timers.
    pub fn poll_expired(
        &mut self,
        now: Instant,
    ) -> Vec<MonitoredItemHandle> {
        let mut due = Vec::new();
        for (interval, timer) in self.timers.iter_mut() {
            if timer.next_deadline > now {
                continue;
            }
            due.extend(timer.members.iter().copied());
            while timer.next_deadline <= now {
                timer.next_deadline += *interval;
            }
        }
        due
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn member_count(
        &self,
        interval: Duration,
    ) -> usize {
        self.timers.get(&interval).map_or(0, |timer| timer.members.len())
    }
}
