//! SQLite storage implementation for the points ledger.

mod model;
mod repository;

pub use model::{BalanceDB, PointEventDB};
pub use repository::LedgerRepository;

pub(crate) use repository::{append_event, balance_of, sum_points_on};

#[cfg(test)]
mod repository_tests;
