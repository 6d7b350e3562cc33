//! SQLite storage implementation for CirclePoints.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `circlepoints-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The single writer actor every mutation goes through
//! - Repository implementations for the ledger, membership, goals and rewards
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//! The core crate is database-agnostic and works with traits.
//!
//! ```text
//!          core (domain, services)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```
//!
//! Every multi-row write (balance + ledger entry, goal completion + bonus,
//! redemption + spend) runs as one job on the writer actor, inside a single
//! immediate transaction.

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod goals;
pub mod groups;
pub mod points;
pub mod rewards;

// Re-export database utilities
pub use db::{
    create_pool, create_pool_with_size, get_connection, init, run_migrations, spawn_writer,
    spawn_writer_with_timeout, DbConnection, DbPool, WriteHandle,
};

pub use goals::GoalRepository;
pub use groups::MembershipRepository;
pub use points::LedgerRepository;
pub use rewards::RewardRepository;

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from circlepoints-core for convenience
pub use circlepoints_core::errors::{DatabaseError, Error, Result};

#[cfg(test)]
pub(crate) mod test_support;
