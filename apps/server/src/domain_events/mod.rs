//! Domain events runtime bridge for the server.
//!
//! Receives domain events via DomainEventSink, debounces them, and drives
//! incremental goal progress for every award in the batch. Anything the
//! worker misses is repaired by the periodic reconciler.

mod planner;
mod queue_worker;
mod sink;

pub use sink::ServerDomainEventSink;
