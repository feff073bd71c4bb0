use std::collections::HashMap;

use super::{StatusCode, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataChangeTrigger {
    Status,
    #[default]
    StatusValue,
    StatusValueTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeadbandType {
    #[default]
    None,
    Absolute,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataChangeFilter {
    pub trigger: DataChangeTrigger,
    pub deadband_type: DeadbandType,
    pub deadband_value: f64,
}

/// Event field selector. The browse path is relative to the event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleAttributeOperand {
    pub browse_path: Vec<String>,
}

impl SimpleAttributeOperand {
    pub fn new(path: &[&str]) -> Self {
        SimpleAttributeOperand {
            browse_path: path.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Key under which [`Event`] stores the selected field.
    pub fn field_name(&self) -> String {
        self.browse_path.join("/")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventFilter {
    pub select_clauses: Vec<SimpleAttributeOperand>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum MonitoringFilter {
    #[default]
    None,
    DataChange(DataChangeFilter),
    Event(EventFilter),
}

/// Per select-clause validation statuses returned for an accepted event filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventFilterResult {
    pub select_clause_results: Vec<StatusCode>,
}

/// Engineering unit range of an analog node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EuRange {
    pub low: f64,
    pub high: f64,
}

impl EuRange {
    pub fn new(
        low: f64,
        high: f64,
    ) -> Self {
        EuRange { low, high }
    }

    pub fn is_valid(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.high > self.low
    }

    pub fn span(&self) -> f64 {
        self.high - self.low
    }
}

/// An event raised by a node, with fields keyed by "/"-joined browse path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    fields: HashMap<String, Variant>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(
        mut self,
        path: &str,
        value: impl Into<Variant>,
    ) -> Self {
        self.fields.insert(path.to_string(), value.into());
        self
    }

    pub fn field(
        &self,
        path: &str,
    ) -> Option<&Variant> {
        self.fields.get(path)
    }
}
