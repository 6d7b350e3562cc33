//! Database models for goals.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use circlepoints_core::goals::{Goal, GoalProgress, NewGoal};

/// Database model for goals
#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::goals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GoalDB {
    pub id: String,
    pub group_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub target_points: i64,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub reward_points: Option<i64>,
    pub completed_at: Option<NaiveDateTime>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for creating a new goal
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::goals)]
pub struct NewGoalDB {
    pub id: String,
    pub group_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub target_points: i64,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub reward_points: Option<i64>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One member's progress towards one goal
#[derive(Queryable, Selectable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::goal_progress)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GoalProgressDB {
    pub goal_id: String,
    pub user_id: String,
    pub group_id: String,
    pub current_points: i64,
    pub progress_percent: f64,
    pub completed_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

impl NewGoalDB {
    pub fn from_domain(domain: NewGoal, now: NaiveDateTime) -> Self {
        let category = domain.category_or_default();
        Self {
            id: domain.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            group_id: domain.group_id,
            user_id: domain.user_id,
            name: domain.name,
            description: domain.description,
            category,
            target_points: domain.target_points,
            start_date: domain.start_date.map(|d| d.naive_utc()),
            end_date: domain.end_date.map(|d| d.naive_utc()),
            reward_points: domain.reward_points,
            is_active: true,
            created_by: domain.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<GoalDB> for Goal {
    fn from(db: GoalDB) -> Self {
        Self {
            id: db.id,
            group_id: db.group_id,
            user_id: db.user_id,
            name: db.name,
            description: db.description,
            category: db.category,
            target_points: db.target_points,
            start_date: db.start_date.map(|d| d.and_utc()),
            end_date: db.end_date.map(|d| d.and_utc()),
            reward_points: db.reward_points,
            completed_at: db.completed_at.map(|d| d.and_utc()),
            is_active: db.is_active,
            created_by: db.created_by,
            created_at: db.created_at.and_utc(),
            updated_at: db.updated_at.and_utc(),
        }
    }
}

impl From<GoalProgressDB> for GoalProgress {
    fn from(db: GoalProgressDB) -> Self {
        Self {
            goal_id: db.goal_id,
            user_id: db.user_id,
            group_id: db.group_id,
            current_points: db.current_points,
            progress_percent: db.progress_percent,
            completed_at: db.completed_at.map(|d| d.and_utc()),
            updated_at: db.updated_at.and_utc(),
        }
    }
}
