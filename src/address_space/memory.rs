use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::AddressSpace;
use crate::types::{AttributeId, DataValue, EuRange, NodeId, NumericRange, ServiceResult, StatusCode, Variant};

#[derive(Debug, Clone, Default)]
struct MemoryNode {
    attributes: HashMap<AttributeId, DataValue>,
    eu_range: Option<EuRange>,
    semantic_version: u32,
}

/// In-process address space backing the demo server and tests.
///
/// Writers update nodes directly; pushing the change into the engine is the
/// caller's job (see `ServerHandle::notify_data_change`).
#[derive(Debug, Default)]
pub struct MemoryAddressSpace {
    nodes: DashMap<NodeId, MemoryNode>,
}

impl MemoryAddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(
        &self,
        node_id: NodeId,
        value: DataValue,
    ) {
        let mut node = MemoryNode::default();
        node.attributes
            .insert(AttributeId::DisplayName, DataValue::new(node_id.to_string()));
        node.attributes.insert(AttributeId::Value, value);
        self.nodes.insert(node_id, node);
    }

    pub fn add_analog_variable(
        &self,
        node_id: NodeId,
        value: DataValue,
        eu_range: EuRange,
    ) {
        self.add_variable(node_id.clone(), value);
        if let Some(mut node) = self.nodes.get_mut(&node_id) {
            node.eu_range = Some(eu_range);
        }
    }

    /// Adds a node that raises events.
    pub fn add_object(
        &self,
        node_id: NodeId,
    ) {
        let mut node = MemoryNode::default();
        node.attributes
            .insert(AttributeId::DisplayName, DataValue::new(node_id.to_string()));
        node.attributes.insert(AttributeId::EventNotifier, DataValue::new(1u8));
        self.nodes.insert(node_id, node);
    }

    pub fn write_attribute(
        &self,
        node_id: &NodeId,
        attribute_id: AttributeId,
        value: DataValue,
    ) -> ServiceResult<()> {
        let mut node = self.nodes.get_mut(node_id).ok_or(StatusCode::BAD_NODE_ID_UNKNOWN)?;
        trace!(%node_id, ?attribute_id, "write attribute");
        node.attributes.insert(attribute_id, value);
        Ok(())
    }

    pub fn write_value(
        &self,
        node_id: &NodeId,
        value: DataValue,
    ) -> ServiceResult<()> {
        self.write_attribute(node_id, AttributeId::Value, value)
    }

    pub fn value(
        &self,
        node_id: &NodeId,
    ) -> Option<DataValue> {
        self.nodes
            .get(node_id)
            .and_then(|node| node.attributes.get(&AttributeId::Value).cloned())
    }

    /// Advances the semantic version, returning the new one.
    pub fn bump_semantic_version(
        &self,
        node_id: &NodeId,
    ) -> ServiceResult<u32> {
        let mut node = self.nodes.get_mut(node_id).ok_or(StatusCode::BAD_NODE_ID_UNKNOWN)?;
        node.semantic_version = node.semantic_version.wrapping_add(1);
        Ok(node.semantic_version)
    }
}

fn is_numeric_variant(value: &Variant) -> bool {
    match value {
        Variant::Array(items) => !items.is_empty() && items.iter().all(Variant::is_numeric),
        other => other.is_numeric(),
    }
}

#[async_trait]
impl AddressSpace for MemoryAddressSpace {
    fn exists(
        &self,
        node_id: &NodeId,
    ) -> bool {
        self.nodes.contains_key(node_id)
    }

    fn is_numeric(
        &self,
        node_id: &NodeId,
    ) -> bool {
        self.value(node_id).is_some_and(|value| is_numeric_variant(&value.value))
    }

    fn engineering_range(
        &self,
        node_id: &NodeId,
    ) -> Option<EuRange> {
        self.nodes.get(node_id).and_then(|node| node.eu_range)
    }

    fn semantic_version(
        &self,
        node_id: &NodeId,
    ) -> u32 {
        self.nodes.get(node_id).map_or(0, |node| node.semantic_version)
    }

    async fn read_attribute(
        &self,
        node_id: &NodeId,
        attribute_id: AttributeId,
        index_range: Option<NumericRange>,
    ) -> ServiceResult<DataValue> {
        let value = {
            let node = self.nodes.get(node_id).ok_or(StatusCode::BAD_NODE_ID_UNKNOWN)?;
            node.attributes
                .get(&attribute_id)
                .cloned()
                .ok_or(StatusCode::BAD_ATTRIBUTE_ID_INVALID)?
        };

        let Some(range) = index_range else {
            return Ok(value);
        };
        Ok(match range.apply(&value.value) {
            Ok(extracted) => DataValue {
                value: extracted,
                ..value
            },
            Err(status) => DataValue {
                value: Variant::Empty,
                status,
                ..value
            },
        })
    }
}
