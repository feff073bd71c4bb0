use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::types::Notification;

/// Revised queue size; never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSize(NonZeroUsize);

impl QueueSize {
    /// Revises a requested size: 0 becomes 1, anything above `max` becomes `max`.
    pub fn revise(
        requested: u32,
        max: u32,
    ) -> Self {
        let size = requested.clamp(1, max.max(1)) as usize;
        QueueSize(NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN))
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

/// Bounded notification queue of one monitored item.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    entries: VecDeque<Notification>,
    capacity: QueueSize,
    discard_oldest: bool,
    overflowed: bool,
}

impl NotificationQueue {
    pub fn new(
        capacity: QueueSize,
        discard_oldest: bool,
    ) -> Self {
        NotificationQueue {
            entries: VecDeque::with_capacity(capacity.get().min(64)),
            capacity,
            discard_oldest,
            overflowed: false,
        }
    }

    /// Enqueues a notification, returning whether the overflow policy had to
    /// discard an entry.
    pub fn push(
        &mut self,
        notification: Notification,
    ) -> bool {
        if self.capacity.get() == 1 {
            // Single slot: latest value wins, no overflow reported.
            self.entries.clear();
            self.entries.push_back(notification);
            return false;
        }

        if self.entries.len() < self.capacity.get() {
            self.entries.push_back(notification);
            return false;
        }

        self.overflowed = true;
        if self.discard_oldest {
            self.entries.pop_front();
            self.entries.push_back(notification);
            if let Some(oldest) = self.entries.front_mut() {
                oldest.mark_overflow();
            }
        } else if let Some(last) = self.entries.back_mut() {
            *last = notification;
            last.mark_overflow();
        }
        true
    }

    /// Applies a new size and discard policy, discarding with the new policy
    /// until the queue fits.
    pub fn resize(
        &mut self,
        capacity: QueueSize,
        discard_oldest: bool,
    ) {
        self.capacity = capacity;
        self.discard_oldest = discard_oldest;

        let excess = self.entries.len().saturating_sub(capacity.get());
        if excess > 0 {
            if discard_oldest {
                self.entries.drain(..excess);
            } else {
                // Keep the oldest entries plus the newest one in the last slot.
                let newest = self.entries.pop_back();
                self.entries.truncate(capacity.get() - 1);
                self.entries.extend(newest);
            }
            self.overflowed = true;
        }

        if capacity.get() == 1 {
            self.overflowed = false;
            for entry in self.entries.iter_mut() {
                entry.clear_overflow();
            }
        } else if excess > 0 {
            let marked = if discard_oldest {
                self.entries.front_mut()
            } else {
                self.entries.back_mut()
            };
            if let Some(entry) = marked {
                entry.mark_overflow();
            }
        }
    }

    /// Empties the queue in FIFO order and clears the overflow flag.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.overflowed = false;
        self.entries.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.overflowed = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> QueueSize {
        self.capacity
    }

    pub fn discard_oldest(&self) -> bool {
        self.discard_oldest
    }

    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }
}
