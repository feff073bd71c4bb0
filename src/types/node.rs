use std::fmt;

use super::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    Numeric(u32),
    String(String),
}

/// Address of a node in the server address space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub namespace: u16,
    pub identifier: Identifier,
}

impl NodeId {
    pub fn numeric(
        namespace: u16,
        id: u32,
    ) -> Self {
        NodeId {
            namespace,
            identifier: Identifier::Numeric(id),
        }
    }

    pub fn string(
        namespace: u16,
        id: impl Into<String>,
    ) -> Self {
        NodeId {
            namespace,
            identifier: Identifier::String(id.into()),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.identifier {
            Identifier::Numeric(id) => write!(f, "ns={};i={}", self.namespace, id),
            Identifier::String(id) => write!(f, "ns={};s={}", self.namespace, id),
        }
    }
}

/// Node attributes as numbered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum AttributeId {
    NodeId = 1,
    NodeClass = 2,
    BrowseName = 3,
    DisplayName = 4,
    Description = 5,
    WriteMask = 6,
    UserWriteMask = 7,
    IsAbstract = 8,
    Symmetric = 9,
    InverseName = 10,
    ContainsNoLoops = 11,
    EventNotifier = 12,
    Value = 13,
    DataType = 14,
    ValueRank = 15,
    ArrayDimensions = 16,
    AccessLevel = 17,
    UserAccessLevel = 18,
    MinimumSamplingInterval = 19,
    Historizing = 20,
    Executable = 21,
    UserExecutable = 22,
}

impl TryFrom<u32> for AttributeId {
    type Error = StatusCode;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use AttributeId::*;
        let attribute = match value {
            1 => NodeId,
            2 => NodeClass,
            3 => BrowseName,
            4 => DisplayName,
            5 => Description,
            6 => WriteMask,
            7 => UserWriteMask,
            8 => IsAbstract,
            9 => Symmetric,
            10 => InverseName,
            11 => ContainsNoLoops,
            12 => EventNotifier,
            13 => Value,
            14 => DataType,
            15 => ValueRank,
            16 => ArrayDimensions,
            17 => AccessLevel,
            18 => UserAccessLevel,
            19 => MinimumSamplingInterval,
            20 => Historizing,
            21 => Executable,
            22 => UserExecutable,
            _ => return Err(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
        };
        Ok(attribute)
    }
}
