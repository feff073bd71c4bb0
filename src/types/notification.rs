use std::time::SystemTime;

use super::{DataValue, StatusCode, Variant};

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemNotification {
    pub client_handle: u32,
    pub value: DataValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventFieldList {
    pub client_handle: u32,
    pub event_fields: Vec<Variant>,
}

/// A single entry of a monitored item queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DataChange(MonitoredItemNotification),
    Event(EventFieldList),
}

impl Notification {
    pub fn client_handle(&self) -> u32 {
        match self {
            Notification::DataChange(n) => n.client_handle,
            Notification::Event(e) => e.client_handle,
        }
    }

    /// Only data changes carry a status to hold the overflow bit.
    pub(crate) fn mark_overflow(&mut self) {
        if let Notification::DataChange(n) = self {
            n.value.status = n.value.status.with_overflow();
        }
    }

    pub(crate) fn clear_overflow(&mut self) {
        if let Notification::DataChange(n) = self {
            n.value.status = n.value.status.without_overflow();
        }
    }

    pub fn has_overflow(&self) -> bool {
        match self {
            Notification::DataChange(n) => n.value.status.has_overflow(),
            Notification::Event(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationData {
    DataChange(Vec<MonitoredItemNotification>),
    Events(Vec<EventFieldList>),
    StatusChange(StatusCode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub sequence_number: u32,
    pub publish_time: SystemTime,
    pub notification_data: Vec<NotificationData>,
}

impl NotificationMessage {
    pub fn keep_alive(
        sequence_number: u32,
        publish_time: SystemTime,
    ) -> Self {
        NotificationMessage {
            sequence_number,
            publish_time,
            notification_data: Vec::new(),
        }
    }

    pub fn status_change(
        sequence_number: u32,
        publish_time: SystemTime,
        status: StatusCode,
    ) -> Self {
        NotificationMessage {
            sequence_number,
            publish_time,
            notification_data: vec![NotificationData::StatusChange(status)],
        }
    }

    /// Groups queued notifications into one data change and one event block,
    /// preserving their relative order, followed by the optional status change.
    pub(crate) fn assemble(
        sequence_number: u32,
        publish_time: SystemTime,
        notifications: Vec<Notification>,
        status_change: Option<StatusCode>,
    ) -> Self {
        let mut data_changes = Vec::new();
        let mut events = Vec::new();
        for notification in notifications {
            match notification {
                Notification::DataChange(n) => data_changes.push(n),
                Notification::Event(e) => events.push(e),
            }
        }

        let mut notification_data = Vec::with_capacity(3);
        if !data_changes.is_empty() {
            notification_data.push(NotificationData::DataChange(data_changes));
        }
        if !events.is_empty() {
            notification_data.push(NotificationData::Events(events));
        }
        if let Some(status) = status_change {
            notification_data.push(NotificationData::StatusChange(status));
        }

        NotificationMessage {
            sequence_number,
            publish_time,
            notification_data,
        }
    }

    pub fn is_keep_alive(&self) -> bool {
        self.notification_data.is_empty()
    }

    pub fn data_changes(&self) -> impl Iterator<Item = &MonitoredItemNotification> {
        self.notification_data.iter().flat_map(|data| match data {
            NotificationData::DataChange(items) => items.as_slice(),
            _ => &[][..],
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &EventFieldList> {
        self.notification_data.iter().flat_map(|data| match data {
            NotificationData::Events(events) => events.as_slice(),
            _ => &[][..],
        })
    }

    pub fn status_change_code(&self) -> Option<StatusCode> {
        self.notification_data.iter().find_map(|data| match data {
            NotificationData::StatusChange(status) => Some(*status),
            _ => None,
        })
    }

    pub fn notification_count(&self) -> usize {
        self.notification_data
            .iter()
            .map(|data| match data {
                NotificationData::DataChange(items) => items.len(),
                NotificationData::Events(events) => events.len(),
                NotificationData::StatusChange(_) => 1,
            })
            .sum()
    }
}
