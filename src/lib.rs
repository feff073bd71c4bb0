//! Server-side OPC UA subscription engine.
//!
//! Clients create subscriptions on a session, attach monitored items that
//! sample or watch nodes, and drain notifications through the Publish
//! exchange. Everything runs on one [`SubscriptionServer`] task, driven
//! through a cloneable [`ServerHandle`].
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());
//! let (server, handle) = SubscriptionServer::new(
//!     ServerConfig::new()?.validate()?,
//!     Arc::new(MemoryAddressSpace::new()),
//!     Arc::new(NoopDiagnostics),
//!     shutdown_rx,
//! );
//! tokio::spawn(server.run());
//! handle.open_session(1).await?;
//! ```

mod address_space;
mod config;
mod constants;
mod diagnostics;
mod errors;
mod metrics;
mod monitored_item;
mod publish_engine;
mod sampling;
mod server;
mod subscription;
mod timer;
pub mod types;
mod utils;

pub use address_space::*;
pub use config::*;
pub use diagnostics::*;
pub use errors::*;
pub use metrics::*;
pub use monitored_item::*;
pub use publish_engine::*;
pub use sampling::*;
pub use server::*;
pub use subscription::*;

#[cfg(test)]
mod diagnostics_test;
