use super::*;
use crate::address_space::{MemoryAddressSpace, MockAddressSpace};
use crate::types::{
    AttributeId, DataChangeFilter, DataChangeTrigger, DataValue, DeadbandType, EuRange, Event, EventFilter,
    MonitoringFilter, NodeId, SimpleAttributeOperand, StatusCode, Variant,
};

fn address_space(
    numeric: bool,
    eu_range: Option<EuRange>,
) -> MockAddressSpace {
    let mut space = MockAddressSpace::new();
    space.expect_is_numeric().returning(move |_| numeric);
    space.expect_engineering_range().returning(move |_| eu_range);
    space
}

fn deadband(
    deadband_type: DeadbandType,
    deadband_value: f64,
) -> MonitoringFilter {
    MonitoringFilter::DataChange(DataChangeFilter {
        trigger: DataChangeTrigger::StatusValue,
        deadband_type,
        deadband_value,
    })
}

fn validate(
    filter: &MonitoringFilter,
    attribute_id: AttributeId,
    space: &MockAddressSpace,
) -> Result<ItemFilter, StatusCode> {
    ItemFilter::validate(filter, &NodeId::numeric(2, 1), attribute_id, space).map(|(filter, _)| filter)
}

#[test]
fn test_data_change_filter_requires_value_attribute() {
    let space = address_space(true, None);

    assert_eq!(
        validate(&deadband(DeadbandType::None, 0.0), AttributeId::DisplayName, &space),
        Err(StatusCode::BAD_FILTER_NOT_ALLOWED)
    );
    assert!(validate(&deadband(DeadbandType::None, 0.0), AttributeId::Value, &space).is_ok());
}

#[test]
fn test_data_change_filter_requires_numeric_node() {
    let space = address_space(false, None);

    assert_eq!(
        validate(&deadband(DeadbandType::Absolute, 1.0), AttributeId::Value, &space),
        Err(StatusCode::BAD_FILTER_NOT_ALLOWED)
    );
    assert_eq!(
        validate(&deadband(DeadbandType::None, 0.0), AttributeId::Value, &space),
        Err(StatusCode::BAD_FILTER_NOT_ALLOWED)
    );
}

#[test]
fn test_status_trigger_on_string_variable_is_not_allowed() {
    let space = MemoryAddressSpace::new();
    let node_id = NodeId::numeric(2, 7);
    space.add_variable(node_id.clone(), DataValue::new("idle"));
    let status_only = MonitoringFilter::DataChange(DataChangeFilter {
        trigger: DataChangeTrigger::Status,
        ..Default::default()
    });

    assert_eq!(
        ItemFilter::validate(&status_only, &node_id, AttributeId::Value, &space).err(),
        Some(StatusCode::BAD_FILTER_NOT_ALLOWED)
    );
    assert!(ItemFilter::validate(&MonitoringFilter::None, &node_id, AttributeId::Value, &space).is_ok());
}

#[test]
fn test_percent_deadband_needs_valid_range_and_bounded_value() {
    let no_range = address_space(true, None);
    assert_eq!(
        validate(&deadband(DeadbandType::Percent, 10.0), AttributeId::Value, &no_range),
        Err(StatusCode::BAD_DEADBAND_FILTER_INVALID)
    );

    let inverted = address_space(true, Some(EuRange::new(10.0, 0.0)));
    assert_eq!(
        validate(&deadband(DeadbandType::Percent, 10.0), AttributeId::Value, &inverted),
        Err(StatusCode::BAD_DEADBAND_FILTER_INVALID)
    );

    let space = address_space(true, Some(EuRange::new(-50.0, 150.0)));
    assert_eq!(
        validate(&deadband(DeadbandType::Percent, 101.0), AttributeId::Value, &space),
        Err(StatusCode::BAD_DEADBAND_FILTER_INVALID)
    );
    assert_eq!(
        validate(&deadband(DeadbandType::Percent, 10.0), AttributeId::Value, &space),
        Ok(ItemFilter::DataChange {
            trigger: DataChangeTrigger::StatusValue,
            deadband: Deadband::Percent {
                percent: 10.0,
                threshold: 20.0,
            },
        })
    );
}

#[test]
fn test_negative_deadband_is_invalid() {
    let space = address_space(true, None);
    assert_eq!(
        validate(&deadband(DeadbandType::Absolute, -1.0), AttributeId::Value, &space),
        Err(StatusCode::BAD_DEADBAND_FILTER_INVALID)
    );
}

#[test]
fn test_event_items_require_event_filter_with_select_clauses() {
    let space = address_space(false, None);

    assert_eq!(
        validate(&MonitoringFilter::None, AttributeId::EventNotifier, &space),
        Err(StatusCode::BAD_MONITORED_ITEM_FILTER_INVALID)
    );
    assert_eq!(
        validate(
            &MonitoringFilter::Event(EventFilter::default()),
            AttributeId::EventNotifier,
            &space
        ),
        Err(StatusCode::BAD_EVENT_FILTER_INVALID)
    );
    assert_eq!(
        validate(
            &MonitoringFilter::Event(EventFilter {
                select_clauses: vec![SimpleAttributeOperand::new(&["Message"])],
            }),
            AttributeId::Value,
            &space
        ),
        Err(StatusCode::BAD_FILTER_NOT_ALLOWED)
    );
}

#[test]
fn test_event_filter_reports_per_clause_results() {
    let space = address_space(false, None);
    let filter = MonitoringFilter::Event(EventFilter {
        select_clauses: vec![
            SimpleAttributeOperand::new(&["Message"]),
            SimpleAttributeOperand { browse_path: vec![] },
        ],
    });

    let (_, result) = ItemFilter::validate(&filter, &NodeId::numeric(2, 1), AttributeId::EventNotifier, &space)
        .expect("one valid clause is enough");

    assert_eq!(
        result.unwrap().select_clause_results,
        vec![StatusCode::GOOD, StatusCode::BAD_BROWSE_NAME_INVALID]
    );
}

#[test]
fn test_status_trigger_ignores_value_changes() {
    let filter = ItemFilter::DataChange {
        trigger: DataChangeTrigger::Status,
        deadband: Deadband::None,
    };
    let previous = DataValue::new(1.0);

    assert!(!filter.detects_change(&previous, &DataValue::new(2.0)));
    assert!(filter.detects_change(
        &previous,
        &DataValue::new(1.0).with_status(StatusCode::UNCERTAIN)
    ));
}

#[test]
fn test_timestamp_trigger_reports_source_timestamp_changes() {
    let filter = ItemFilter::DataChange {
        trigger: DataChangeTrigger::StatusValueTimestamp,
        deadband: Deadband::Absolute(10.0),
    };
    let previous = DataValue::new(1.0).with_source_timestamp(std::time::SystemTime::UNIX_EPOCH);
    let current = DataValue::new(1.5).with_source_timestamp(std::time::SystemTime::now());

    assert!(filter.detects_change(&previous, &current));
    assert!(filter.passes_deadband(&previous, &current));
}

#[test]
fn test_absolute_deadband_suppresses_small_changes() {
    let filter = ItemFilter::DataChange {
        trigger: DataChangeTrigger::StatusValue,
        deadband: Deadband::Absolute(0.5),
    };
    let previous = DataValue::new(10.0);

    assert!(!filter.passes_deadband(&previous, &DataValue::new(10.4)));
    assert!(!filter.passes_deadband(&previous, &DataValue::new(10.5)));
    assert!(filter.passes_deadband(&previous, &DataValue::new(10.6)));
    // Status changes bypass the deadband.
    assert!(filter.passes_deadband(
        &previous,
        &DataValue::new(10.1).with_status(StatusCode::BAD)
    ));
}

#[test]
fn test_deadband_applies_element_wise_to_arrays() {
    let filter = ItemFilter::DataChange {
        trigger: DataChangeTrigger::StatusValue,
        deadband: Deadband::Absolute(1.0),
    };
    let array = |values: &[f64]| DataValue::new(Variant::Array(values.iter().map(|v| Variant::Double(*v)).collect()));

    assert!(!filter.passes_deadband(&array(&[1.0, 2.0]), &array(&[1.5, 2.5])));
    assert!(filter.passes_deadband(&array(&[1.0, 2.0]), &array(&[1.5, 3.5])));
    assert!(filter.passes_deadband(&array(&[1.0, 2.0]), &array(&[1.0, 2.0, 3.0])));
}

#[test]
fn test_project_event_fills_missing_fields_with_empty() {
    let filter = ItemFilter::Event(EventFilter {
        select_clauses: vec![
            SimpleAttributeOperand::new(&["Message"]),
            SimpleAttributeOperand::new(&["Severity"]),
            SimpleAttributeOperand::new(&["SourceNode", "Name"]),
        ],
    });
    let event = Event::new()
        .with_field("Message", "overheat")
        .with_field("SourceNode/Name", "Boiler");

    assert_eq!(
        filter.project_event(&event),
        vec![Variant::from("overheat"), Variant::Empty, Variant::from("Boiler")]
    );
}
