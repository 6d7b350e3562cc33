use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::SqliteConnection;
use std::collections::HashMap;
use std::sync::Arc;

use circlepoints_core::points::{
    Balance, LedgerReader, LedgerWriter, NewPointEvent, PointEvent, PointEventKind,
    PointEventReason, PointsWindow,
};
use circlepoints_core::Result;

use super::model::{BalanceDB, PointEventDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{point_balances, point_events};

/// Appends one ledger entry and moves the materialized balance by its signed
/// amount. Callers run this inside a writer transaction; the pair commits or
/// rolls back together.
pub(crate) fn append_event(conn: &mut SqliteConnection, event: NewPointEvent) -> Result<PointEvent> {
    event.validate()?;
    let delta = event.signed_amount();
    let row = PointEventDB::from(event);

    diesel::insert_into(point_balances::table)
        .values(&BalanceDB {
            user_id: row.user_id.clone(),
            group_id: row.group_id.clone(),
            points: delta,
            updated_at: row.created_at,
        })
        .on_conflict((point_balances::user_id, point_balances::group_id))
        .do_update()
        .set((
            point_balances::points.eq(point_balances::points + delta),
            point_balances::updated_at.eq(row.created_at),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;

    let inserted = diesel::insert_into(point_events::table)
        .values(&row)
        .returning(PointEventDB::as_returning())
        .get_result(conn)
        .map_err(StorageError::from)?;

    PointEvent::try_from(inserted)
}

/// Current balance, 0 when the member has no ledger activity yet.
pub(crate) fn balance_of(conn: &mut SqliteConnection, user_id: &str, group_id: &str) -> Result<i64> {
    let points = point_balances::table
        .find((user_id, group_id))
        .select(point_balances::points)
        .first::<i64>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(points.unwrap_or(0))
}

/// Σ amount of one kind for a member, restricted to `window`. Runs on the
/// caller's connection so a writer job can read it inside its transaction.
pub(crate) fn sum_points_on(
    conn: &mut SqliteConnection,
    user_id: &str,
    group_id: &str,
    kind: PointEventKind,
    window: &PointsWindow,
) -> Result<i64> {
    let mut query = point_events::table
        .select(sql::<BigInt>("COALESCE(SUM(amount), 0)"))
        .filter(point_events::user_id.eq(user_id))
        .filter(point_events::group_id.eq(group_id))
        .filter(point_events::kind.eq(kind.as_str()))
        .into_boxed();

    if let Some(since) = window.since {
        query = query.filter(point_events::created_at.ge(since.naive_utc()));
    }
    if let Some(until) = window.until {
        query = query.filter(point_events::created_at.le(until.naive_utc()));
    }
    if let Some(goal_id) = window.exclude_bonus_of_goal.clone() {
        query = query.filter(
            point_events::reason
                .ne(PointEventReason::GoalBonus.as_str())
                .or(point_events::reference_id.ne(goal_id)),
        );
    }

    let total = query.get_result::<i64>(conn).map_err(StorageError::from)?;
    Ok(total)
}

pub struct LedgerRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LedgerRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl LedgerWriter for LedgerRepository {
    async fn append(&self, event: NewPointEvent) -> Result<PointEvent> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| append_event(conn, event))
            .await
    }
}

impl LedgerReader for LedgerRepository {
    fn get_balance(&self, user_id: &str, group_id: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        balance_of(&mut conn, user_id, group_id)
    }

    fn list_balances(&self, group_id: &str) -> Result<Vec<Balance>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = point_balances::table
            .filter(point_balances::group_id.eq(group_id))
            .order(point_balances::points.desc())
            .select(BalanceDB::as_select())
            .load::<BalanceDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Balance::from).collect())
    }

    fn list_events(&self, user_id: &str, group_id: &str) -> Result<Vec<PointEvent>> {
        let mut conn = get_connection(&self.pool)?;
        point_events::table
            .filter(point_events::user_id.eq(user_id))
            .filter(point_events::group_id.eq(group_id))
            .order(point_events::created_at.desc())
            .select(PointEventDB::as_select())
            .load::<PointEventDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(PointEvent::try_from)
            .collect()
    }

    fn sum_points(
        &self,
        user_id: &str,
        group_id: &str,
        kind: PointEventKind,
        window: &PointsWindow,
    ) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        sum_points_on(&mut conn, user_id, group_id, kind, window)
    }

    fn sum_grants_by_user(
        &self,
        group_id: &str,
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, i64>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = point_events::table
            .filter(point_events::group_id.eq(group_id))
            .filter(point_events::kind.eq(PointEventKind::Grant.as_str()))
            .filter(point_events::created_at.ge(since.naive_utc()))
            .select((point_events::user_id, point_events::amount))
            .load::<(String, i64)>(&mut conn)
            .map_err(StorageError::from)?;

        let mut sums = HashMap::new();
        for (user, amount) in rows {
            *sums.entry(user).or_insert(0) += amount;
        }
        Ok(sums)
    }
}
