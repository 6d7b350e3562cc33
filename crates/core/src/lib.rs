//! Circle Points Core - Domain entities, services, and traits.
//!
//! This crate contains the business logic for group point tracking: the
//! points ledger, goal progress, rewards and leaderboards. It is
//! database-agnostic and defines traits that are implemented by the
//! `storage-sqlite` crate.

pub mod constants;
pub mod errors;
pub mod events;
pub mod goals;
pub mod groups;
pub mod leaderboard;
pub mod points;
pub mod reconciliation;
pub mod rewards;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
