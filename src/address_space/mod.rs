//! Narrow view of the node store used by monitored items.
//!
//! The engine never browses or writes; it validates targets at creation,
//! reads values when a sampling timer fires, and otherwise relies on
//! change and event pushes delivered through the server handle.

mod memory;
pub use memory::*;


#[cfg(test)]
use mockall::automock;
use async_trait::async_trait;

use crate::types::{AttributeId, DataValue, EuRange, NodeId, NumericRange, ServiceResult};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AddressSpace: Send + Sync + 'static {
    /// Whether the node is known to the server.
    fn exists(
        &self,
        node_id: &NodeId,
    ) -> bool;

    /// Whether the node's value is numeric (scalar or array), which is
    /// required for deadband filtering.
    fn is_numeric(
        &self,
        node_id: &NodeId,
    ) -> bool;

    /// Engineering unit range of analog nodes, needed by percent deadbands.
    fn engineering_range(
        &self,
        node_id: &NodeId,
    ) -> Option<EuRange>;

    /// Counter advanced whenever the node's value semantics (unit, range,
    /// enumeration strings) change.
    fn semantic_version(
        &self,
        node_id: &NodeId,
    ) -> u32;

    /// Reads one attribute, extracting `index_range` when given.
    ///
    /// An index range with no data yields a value carrying
    /// `BadIndexRangeNoData` rather than an error.
    async fn read_attribute(
        &self,
        node_id: &NodeId,
        attribute_id: AttributeId,
        index_range: Option<NumericRange>,
    ) -> ServiceResult<DataValue>;
}
