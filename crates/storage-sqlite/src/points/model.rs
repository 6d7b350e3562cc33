//! Database models for ledger events and balances.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use circlepoints_core::points::{Balance, NewPointEvent, PointEvent};
use circlepoints_core::Error;

#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::point_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PointEventDB {
    pub id: String,
    pub user_id: String,
    pub group_id: String,
    pub amount: i64,
    pub kind: String,
    pub reason: String,
    pub reference_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub created_by: String,
}

#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::point_balances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BalanceDB {
    pub user_id: String,
    pub group_id: String,
    pub points: i64,
    pub updated_at: NaiveDateTime,
}

impl From<NewPointEvent> for PointEventDB {
    fn from(domain: NewPointEvent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: domain.user_id,
            group_id: domain.group_id,
            amount: domain.amount,
            kind: domain.kind.as_str().to_string(),
            reason: domain.reason.as_str().to_string(),
            reference_id: domain.reference_id,
            created_at: domain.created_at.naive_utc(),
            created_by: domain.created_by,
        }
    }
}

impl TryFrom<PointEventDB> for PointEvent {
    type Error = Error;

    fn try_from(db: PointEventDB) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: db.kind.parse()?,
            reason: db.reason.parse()?,
            id: db.id,
            user_id: db.user_id,
            group_id: db.group_id,
            amount: db.amount,
            reference_id: db.reference_id,
            created_at: db.created_at.and_utc(),
            created_by: db.created_by,
        })
    }
}

impl From<BalanceDB> for Balance {
    fn from(db: BalanceDB) -> Self {
        Self {
            user_id: db.user_id,
            group_id: db.group_id,
            points: db.points,
            updated_at: db.updated_at.and_utc(),
        }
    }
}
