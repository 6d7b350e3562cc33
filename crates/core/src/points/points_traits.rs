//! Points ledger repository and service traits.
//!
//! Reading and writing the ledger are separate capabilities so that services
//! only receive what they use: the ledger service writes, the goal engine and
//! the leaderboard only read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::points_model::{Balance, NewPointEvent, PointEvent, PointEventKind, PointsWindow};
use crate::errors::Result;

/// Write side of the ledger.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Appends one event and applies its signed amount to the member's balance.
    ///
    /// Both writes happen in a single transaction; on any failure neither is
    /// persisted. The balance is changed with a relative increment, never a
    /// read-then-write.
    async fn append(&self, event: NewPointEvent) -> Result<PointEvent>;
}

/// Read side of the ledger.
pub trait LedgerReader: Send + Sync {
    /// Current balance, zero when the member has no ledger history.
    fn get_balance(&self, user_id: &str, group_id: &str) -> Result<i64>;

    /// Every materialized balance row in a group.
    fn list_balances(&self, group_id: &str) -> Result<Vec<Balance>>;

    /// Ledger history of one member, newest first.
    fn list_events(&self, user_id: &str, group_id: &str) -> Result<Vec<PointEvent>>;

    /// Sum of `kind` amounts for one member within `window`.
    fn sum_points(
        &self,
        user_id: &str,
        group_id: &str,
        kind: PointEventKind,
        window: &PointsWindow,
    ) -> Result<i64>;

    /// Grant sums per member of a group since `since` (inclusive).
    fn sum_grants_by_user(
        &self,
        group_id: &str,
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, i64>>;
}

/// Points ledger service operations.
#[async_trait]
pub trait PointsServiceTrait: Send + Sync {
    /// Grants `amount` points.
    async fn award(
        &self,
        user_id: &str,
        group_id: &str,
        amount: i64,
        actor_id: &str,
    ) -> Result<PointEvent>;

    /// Removes `amount` points.
    ///
    /// The balance is not re-validated here; flows that require a sufficient
    /// balance check it before calling. Corrections may take a balance negative.
    async fn deduct(
        &self,
        user_id: &str,
        group_id: &str,
        amount: i64,
        actor_id: &str,
    ) -> Result<PointEvent>;

    fn get_balance(&self, user_id: &str, group_id: &str) -> Result<i64>;

    fn list_history(&self, user_id: &str, group_id: &str) -> Result<Vec<PointEvent>>;
}
