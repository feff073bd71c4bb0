//! Monitored items: sampling strategy, change filtering and bounded queues.
//!
//! An item never samples by itself. The server registers it with the
//! sampling source named by [`MonitoredItem::sampler_key`] and feeds it
//! values or events; the owning subscription harvests its queue.

mod filter;
#[allow(clippy::module_inception)]
mod monitored_item;
mod queue;

pub use filter::*;
pub use monitored_item::*;
pub use queue::*;

#[cfg(test)]
mod filter_test;
