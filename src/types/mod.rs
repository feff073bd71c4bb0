//! Protocol data types shared by every layer of the engine.
//!
//! These mirror the OPC UA information model closely enough for the
//! subscription services; wire encoding lives outside this crate.

mod filter;
mod node;
mod notification;
mod service;
mod status;
mod variant;

pub use filter::*;
pub use node::*;
pub use notification::*;
pub use service::*;
pub use status::*;
pub use variant::*;


pub type SessionId = u32;
pub type SubscriptionId = u32;
pub type MonitoredItemId = u32;

/// Outcome of a service or of one element of a batch.
pub type ServiceResult<T> = std::result::Result<T, StatusCode>;
