use crate::address_space::AddressSpace;
use crate::types::{
    AttributeId, DataChangeFilter, DataChangeTrigger, DataValue, DeadbandType, Event, EventFilter,
    EventFilterResult, MonitoringFilter, NodeId, ServiceResult, StatusCode, Variant,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deadband {
    None,
    Absolute(f64),
    /// Percent of the engineering range, resolved to an absolute threshold
    /// when the filter is validated.
    Percent { percent: f64, threshold: f64 },
}

/// Validated filter of a monitored item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemFilter {
    None,
    DataChange {
        trigger: DataChangeTrigger,
        deadband: Deadband,
    },
    Event(EventFilter),
}

impl ItemFilter {
    /// Validates a requested filter against the monitored target.
    pub fn validate(
        requested: &MonitoringFilter,
        node_id: &NodeId,
        attribute_id: AttributeId,
        address_space: &dyn AddressSpace,
    ) -> ServiceResult<(ItemFilter, Option<EventFilterResult>)> {
        match requested {
            MonitoringFilter::None if attribute_id == AttributeId::EventNotifier => {
                Err(StatusCode::BAD_MONITORED_ITEM_FILTER_INVALID)
            }
            MonitoringFilter::None => Ok((ItemFilter::None, None)),
            MonitoringFilter::DataChange(filter) => {
                if attribute_id != AttributeId::Value || !address_space.is_numeric(node_id) {
                    return Err(StatusCode::BAD_FILTER_NOT_ALLOWED);
                }
                let deadband = validate_deadband(filter, node_id, address_space)?;
                Ok((
                    ItemFilter::DataChange {
                        trigger: filter.trigger,
                        deadband,
                    },
                    None,
                ))
            }
            MonitoringFilter::Event(filter) => {
                if attribute_id != AttributeId::EventNotifier {
                    return Err(StatusCode::BAD_FILTER_NOT_ALLOWED);
                }
                let result = validate_event_filter(filter)?;
                Ok((ItemFilter::Event(filter.clone()), Some(result)))
            }
        }
    }

    fn trigger(&self) -> DataChangeTrigger {
        match self {
            ItemFilter::DataChange { trigger, .. } => *trigger,
            _ => DataChangeTrigger::StatusValue,
        }
    }

    /// Whether `current` differs from `previous` in anything the trigger watches.
    pub fn detects_change(
        &self,
        previous: &DataValue,
        current: &DataValue,
    ) -> bool {
        let status_changed = previous.status.code() != current.status.code();
        match self.trigger() {
            DataChangeTrigger::Status => status_changed,
            DataChangeTrigger::StatusValue => status_changed || previous.value != current.value,
            DataChangeTrigger::StatusValueTimestamp => {
                status_changed
                    || previous.value != current.value
                    || previous.source_timestamp != current.source_timestamp
            }
        }
    }

    /// Whether a detected change is significant enough to report.
    pub fn passes_deadband(
        &self,
        previous: &DataValue,
        current: &DataValue,
    ) -> bool {
        let ItemFilter::DataChange { trigger, deadband } = self else {
            return true;
        };
        if previous.status.code() != current.status.code() {
            return true;
        }
        if *trigger == DataChangeTrigger::StatusValueTimestamp
            && previous.source_timestamp != current.source_timestamp
        {
            return true;
        }
        match *deadband {
            Deadband::None => true,
            Deadband::Absolute(threshold) | Deadband::Percent { threshold, .. } => {
                exceeds_deadband(&previous.value, &current.value, threshold)
            }
        }
    }

    /// Projects an event through the select clauses; missing fields are empty.
    pub fn project_event(
        &self,
        event: &Event,
    ) -> Vec<Variant> {
        match self {
            ItemFilter::Event(filter) => filter
                .select_clauses
                .iter()
                .map(|clause| event.field(&clause.field_name()).cloned().unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn validate_deadband(
    filter: &DataChangeFilter,
    node_id: &NodeId,
    address_space: &dyn AddressSpace,
) -> ServiceResult<Deadband> {
    if filter.deadband_type == DeadbandType::None {
        return Ok(Deadband::None);
    }
    let value = filter.deadband_value;
    if !value.is_finite() || value < 0.0 {
        return Err(StatusCode::BAD_DEADBAND_FILTER_INVALID);
    }

    match filter.deadband_type {
        DeadbandType::None => Ok(Deadband::None),
        DeadbandType::Absolute => Ok(Deadband::Absolute(value)),
        DeadbandType::Percent => {
            if value > 100.0 {
                return Err(StatusCode::BAD_DEADBAND_FILTER_INVALID);
            }
            let range = address_space
                .engineering_range(node_id)
                .filter(|range| range.is_valid())
                .ok_or(StatusCode::BAD_DEADBAND_FILTER_INVALID)?;
            Ok(Deadband::Percent {
                percent: value,
                threshold: value / 100.0 * range.span(),
            })
        }
    }
}

fn validate_event_filter(filter: &EventFilter) -> ServiceResult<EventFilterResult> {
    if filter.select_clauses.is_empty() {
        return Err(StatusCode::BAD_EVENT_FILTER_INVALID);
    }
    let select_clause_results: Vec<StatusCode> = filter
        .select_clauses
        .iter()
        .map(|clause| {
            if clause.browse_path.is_empty() || clause.browse_path.iter().any(|name| name.is_empty()) {
                StatusCode::BAD_BROWSE_NAME_INVALID
            } else {
                StatusCode::GOOD
            }
        })
        .collect();

    if select_clause_results.iter().all(StatusCode::is_bad) {
        return Err(StatusCode::BAD_EVENT_FILTER_INVALID);
    }
    Ok(EventFilterResult { select_clause_results })
}

/// Element-wise deadband comparison; non-numeric values fall back to inequality.
fn exceeds_deadband(
    previous: &Variant,
    current: &Variant,
    threshold: f64,
) -> bool {
    match (previous, current) {
        (Variant::Array(old), Variant::Array(new)) => {
            old.len() != new.len()
                || old
                    .iter()
                    .zip(new)
                    .any(|(old, new)| exceeds_deadband(old, new, threshold))
        }
        _ => match (previous.as_f64(), current.as_f64()) {
            (Some(old), Some(new)) => (new - old).abs() > threshold,
            _ => previous != current,
        },
    }
}
