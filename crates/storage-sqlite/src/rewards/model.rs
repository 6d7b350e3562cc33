//! Database models for rewards and redemptions.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use circlepoints_core::rewards::{NewRedemption, NewReward, Redemption, RedemptionStatus, Reward};
use circlepoints_core::Error;

#[derive(Queryable, Identifiable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::rewards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RewardDB {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub points_cost: i64,
    pub max_redeems: Option<i64>,
    pub times_redeemed: i64,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::redemptions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RedemptionDB {
    pub id: String,
    pub reward_id: String,
    pub user_id: String,
    pub group_id: String,
    pub points: i64,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RewardDB {
    pub fn from_new(domain: NewReward, now: NaiveDateTime) -> Self {
        let category = domain.category_or_default();
        Self {
            id: domain.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            group_id: domain.group_id,
            name: domain.name,
            description: domain.description,
            category,
            points_cost: domain.points_cost,
            max_redeems: domain.max_redeems,
            times_redeemed: 0,
            is_active: true,
            created_by: domain.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

impl RedemptionDB {
    pub fn pending(domain: &NewRedemption) -> Self {
        let at = domain.created_at.naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            reward_id: domain.reward_id.clone(),
            user_id: domain.user_id.clone(),
            group_id: domain.group_id.clone(),
            points: domain.points,
            status: RedemptionStatus::Pending.as_str().to_string(),
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }
}

impl From<RewardDB> for Reward {
    fn from(db: RewardDB) -> Self {
        Self {
            id: db.id,
            group_id: db.group_id,
            name: db.name,
            description: db.description,
            category: db.category,
            points_cost: db.points_cost,
            max_redeems: db.max_redeems,
            times_redeemed: db.times_redeemed,
            is_active: db.is_active,
            created_by: db.created_by,
            created_at: db.created_at.and_utc(),
            updated_at: db.updated_at.and_utc(),
        }
    }
}

impl TryFrom<RedemptionDB> for Redemption {
    type Error = Error;

    fn try_from(db: RedemptionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            status: db.status.parse()?,
            id: db.id,
            reward_id: db.reward_id,
            user_id: db.user_id,
            group_id: db.group_id,
            points: db.points,
            notes: db.notes,
            created_at: db.created_at.and_utc(),
            updated_at: db.updated_at.and_utc(),
        })
    }
}
