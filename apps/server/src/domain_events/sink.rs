//! Server-side domain event sink backed by an unbounded channel.

use std::sync::{Arc, Mutex};

use circlepoints_core::events::{DomainEvent, DomainEventSink};
use circlepoints_core::goals::GoalProgressServiceTrait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::queue_worker::event_queue_worker;

/// Queues domain events for the background worker.
///
/// Construction is two-phase: services get the sink first, and the worker is
/// started once the goal progress engine it drives exists. Events emitted in
/// between stay buffered in the channel.
pub struct ServerDomainEventSink {
    tx: mpsc::UnboundedSender<DomainEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<DomainEvent>>>,
}

impl ServerDomainEventSink {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Spawns the queue worker. Returns `None` if it was already started.
    pub fn start_worker(
        &self,
        progress_service: Arc<dyn GoalProgressServiceTrait>,
    ) -> Option<JoinHandle<()>> {
        let rx = match self.rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(rx) = rx else {
            tracing::warn!("Domain event worker already started");
            return None;
        };
        Some(tokio::spawn(event_queue_worker(rx, progress_service)))
    }
}

impl Default for ServerDomainEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainEventSink for ServerDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Domain event dropped: worker is gone");
        }
    }
}
