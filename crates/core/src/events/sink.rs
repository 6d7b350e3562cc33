//! Where services publish their [`DomainEvent`]s.

use std::sync::{Arc, Mutex, MutexGuard};

use super::DomainEvent;

/// Receiver of domain events, called by services once a write has committed.
///
/// `emit` runs on the caller's path: it must not block or touch the database.
/// Delivery is best-effort and a lost event never fails the operation that
/// produced it, since the reconciler re-derives goal progress from the ledger.
pub trait DomainEventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);

    fn emit_batch(&self, events: Vec<DomainEvent>) {
        events.into_iter().for_each(|e| self.emit(e));
    }
}

/// Drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEventSink;

impl DomainEventSink for NullEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// Keeps every event in memory, in emission order. Clones share the buffer.
#[derive(Clone, Debug, Default)]
pub struct RecordingEventSink {
    recorded: Arc<Mutex<Vec<DomainEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<DomainEvent>> {
        // A panicking test thread must not hide what was recorded.
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.buffer().clone()
    }

    /// Returns the recorded events and empties the buffer.
    pub fn take(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.buffer())
    }

    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    /// Sum of the `PointsAwarded` amounts recorded for one member of a group.
    pub fn awarded_total(&self, user_id: &str, group_id: &str) -> i64 {
        self.buffer()
            .iter()
            .filter_map(|e| match e {
                DomainEvent::PointsAwarded {
                    user_id: u,
                    group_id: g,
                    amount,
                    ..
                } if u == user_id && g == group_id => Some(*amount),
                _ => None,
            })
            .sum()
    }
}

impl DomainEventSink for RecordingEventSink {
    fn emit(&self, event: DomainEvent) {
        self.buffer().push(event);
    }
}
