use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use circlepoints_core::goals::{
    evaluate_progress, Goal, GoalProgress, GoalRepositoryTrait, GoalUpdate, NewGoal,
    ProgressEvaluation, ProgressOutcome, ProgressUpdate,
};
use circlepoints_core::points::{NewPointEvent, PointEventKind};
use circlepoints_core::{Error, Result};

use super::model::{GoalDB, GoalProgressDB, NewGoalDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::points::{append_event, sum_points_on};
use crate::schema::{goal_progress, goals};

pub struct GoalRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl GoalRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        GoalRepository { pool, writer }
    }
}

fn load_goal(conn: &mut SqliteConnection, goal_id: &str) -> Result<Goal> {
    goals::table
        .find(goal_id)
        .select(GoalDB::as_select())
        .first::<GoalDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .map(Goal::from)
        .ok_or_else(|| Error::not_found("Goal", goal_id))
}

fn load_progress(
    conn: &mut SqliteConnection,
    goal_id: &str,
    user_id: &str,
) -> Result<Option<GoalProgress>> {
    let row = goal_progress::table
        .find((goal_id, user_id))
        .select(GoalProgressDB::as_select())
        .first::<GoalProgressDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(row.map(GoalProgress::from))
}

#[async_trait]
impl GoalRepositoryTrait for GoalRepository {
    async fn insert_new_goal(&self, new_goal: NewGoal) -> Result<Goal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Goal> {
                let new_goal_db = NewGoalDB::from_domain(new_goal, Utc::now().naive_utc());
                let result_db = diesel::insert_into(goals::table)
                    .values(&new_goal_db)
                    .returning(GoalDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(Goal::from(result_db))
            })
            .await
    }

    async fn update_goal(&self, goal_update: GoalUpdate) -> Result<Goal> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Goal> {
                let goal_id = goal_update.id.as_str();
                let changed = diesel::update(goals::table.find(goal_id))
                    .set((
                        goals::name.eq(&goal_update.name),
                        goals::description.eq(&goal_update.description),
                        goals::target_points.eq(goal_update.target_points),
                        goals::start_date.eq(goal_update.start_date.map(|d| d.naive_utc())),
                        goals::end_date.eq(goal_update.end_date.map(|d| d.naive_utc())),
                        goals::reward_points.eq(goal_update.reward_points),
                        goals::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if changed == 0 {
                    return Err(Error::not_found("Goal", goal_id));
                }
                if let Some(category) = &goal_update.category {
                    diesel::update(goals::table.find(goal_id))
                        .set(goals::category.eq(category))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                load_goal(conn, goal_id)
            })
            .await
    }

    async fn deactivate_goal(&self, goal_id: &str) -> Result<usize> {
        let goal_id = goal_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::update(goals::table.find(goal_id))
                    .set((
                        goals::is_active.eq(false),
                        goals::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    fn get_goal(&self, goal_id: &str) -> Result<Goal> {
        let mut conn = get_connection(&self.pool)?;
        load_goal(&mut conn, goal_id)
    }

    /// Active goals visible to the member: group-wide ones plus their own,
    /// soonest deadline first and open-ended goals last.
    fn list_goals_for_user(&self, group_id: &str, user_id: &str) -> Result<Vec<Goal>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = goals::table
            .filter(goals::group_id.eq(group_id))
            .filter(goals::is_active.eq(true))
            .filter(goals::user_id.is_null().or(goals::user_id.eq(user_id)))
            .order((
                goals::end_date.is_null().asc(),
                goals::end_date.asc(),
                goals::target_points.asc(),
            ))
            .select(GoalDB::as_select())
            .load::<GoalDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Goal::from).collect())
    }

    fn list_active_goals(&self, group_id: &str) -> Result<Vec<Goal>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = goals::table
            .filter(goals::group_id.eq(group_id))
            .filter(goals::is_active.eq(true))
            .order(goals::created_at.asc())
            .select(GoalDB::as_select())
            .load::<GoalDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Goal::from).collect())
    }

    fn get_progress(&self, goal_id: &str, user_id: &str) -> Result<Option<GoalProgress>> {
        let mut conn = get_connection(&self.pool)?;
        load_progress(&mut conn, goal_id, user_id)
    }

    fn list_user_progress(&self, user_id: &str, group_id: &str) -> Result<Vec<GoalProgress>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = goal_progress::table
            .filter(goal_progress::user_id.eq(user_id))
            .filter(goal_progress::group_id.eq(group_id))
            .order(goal_progress::updated_at.desc())
            .select(GoalProgressDB::as_select())
            .load::<GoalProgressDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(GoalProgress::from).collect())
    }

    /// Writes one progress row, and on first completion the completion stamp,
    /// the goal's bonus grant and the goal's own completion date, all in one
    /// transaction. Completed rows are left untouched and yield `None`.
    async fn apply_progress(&self, update: ProgressUpdate) -> Result<Option<ProgressOutcome>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<ProgressOutcome>> {
                let goal_id = update.goal.id.as_str();
                let user_id = update.user_id.as_str();
                let previous = load_progress(conn, goal_id, user_id)?;

                let (current_points, progress_percent, reaches_target) =
                    match evaluate_progress(&update, previous.as_ref(), |goal, user_id| {
                        sum_points_on(
                            conn,
                            user_id,
                            &goal.group_id,
                            PointEventKind::Grant,
                            &goal.points_window(),
                        )
                    })? {
                        ProgressEvaluation::Frozen => return Ok(None),
                        ProgressEvaluation::Update {
                            current_points,
                            progress_percent,
                            reaches_target,
                        } => (current_points, progress_percent, reaches_target),
                    };

                let at = update.at.naive_utc();
                diesel::insert_into(goal_progress::table)
                    .values(&GoalProgressDB {
                        goal_id: goal_id.to_string(),
                        user_id: user_id.to_string(),
                        group_id: update.goal.group_id.clone(),
                        current_points,
                        progress_percent,
                        completed_at: None,
                        updated_at: at,
                    })
                    .on_conflict((goal_progress::goal_id, goal_progress::user_id))
                    .do_update()
                    .set((
                        goal_progress::current_points.eq(current_points),
                        goal_progress::progress_percent.eq(progress_percent),
                        goal_progress::updated_at.eq(at),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let mut newly_completed = false;
                let mut bonus_event = None;
                if reaches_target {
                    // Only the write that flips completed_at from NULL pays the bonus.
                    let claimed = diesel::update(
                        goal_progress::table
                            .find((goal_id, user_id))
                            .filter(goal_progress::completed_at.is_null()),
                    )
                    .set(goal_progress::completed_at.eq(Some(at)))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                    if claimed == 1 {
                        newly_completed = true;
                        let bonus = update.goal.bonus_points();
                        if bonus > 0 {
                            bonus_event = Some(append_event(
                                conn,
                                NewPointEvent::goal_bonus(
                                    goal_id,
                                    user_id,
                                    &update.goal.group_id,
                                    bonus,
                                    &update.actor_id,
                                    update.at,
                                ),
                            )?);
                        }
                        diesel::update(
                            goals::table
                                .find(goal_id)
                                .filter(goals::completed_at.is_null()),
                        )
                        .set(goals::completed_at.eq(Some(at)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                        debug!(
                            "Goal {} completed by {} (bonus {})",
                            goal_id, user_id, bonus
                        );
                    }
                }

                let progress = load_progress(conn, goal_id, user_id)?.ok_or_else(|| {
                    Error::Unexpected(format!(
                        "progress row for goal {} and user {} vanished",
                        goal_id, user_id
                    ))
                })?;
                Ok(Some(ProgressOutcome {
                    progress,
                    newly_completed,
                    bonus_event,
                }))
            })
            .await
    }
}
