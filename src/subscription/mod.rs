//! Subscriptions: publishing cadence, keep-alive and lifetime accounting,
//! sequence numbering and the retransmission history.

mod diagnostics;
#[allow(clippy::module_inception)]
mod subscription;

pub use diagnostics::*;
pub use subscription::*;

#[cfg(test)]
mod subscription_test;
