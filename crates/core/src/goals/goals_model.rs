//! Goals domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CATEGORY;
use crate::errors::{Result, ValidationError};
use crate::points::{PointEvent, PointEventKind, PointsWindow};
use crate::utils::in_window;

/// Domain model representing a point goal.
///
/// A goal without `user_id` is group-wide and applies independently to every
/// active member of the group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub group_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub target_points: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub reward_points: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    pub fn is_group_wide(&self) -> bool {
        self.user_id.is_none()
    }

    /// Whether this goal tracks `user_id`.
    pub fn applies_to(&self, user_id: &str) -> bool {
        match &self.user_id {
            Some(owner) => owner == user_id,
            None => true,
        }
    }

    /// Whether `at` falls inside the goal's window (inclusive, open-ended when unset).
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        in_window(at, self.start_date, self.end_date)
    }

    /// Completion bonus, zero when none is configured.
    pub fn bonus_points(&self) -> i64 {
        self.reward_points.filter(|p| *p > 0).unwrap_or(0)
    }

    /// Ledger filter selecting the events that count toward this goal.
    pub fn points_window(&self) -> PointsWindow {
        PointsWindow {
            since: self.start_date,
            until: self.end_date,
            exclude_bonus_of_goal: Some(self.id.clone()),
        }
    }

    /// Authoritative progress of `user_id` computed from raw ledger history.
    pub fn sum_for_user<'a>(
        &self,
        user_id: &str,
        events: impl IntoIterator<Item = &'a PointEvent>,
    ) -> i64 {
        let window = self.points_window();
        events
            .into_iter()
            .filter(|e| e.user_id == user_id && e.group_id == self.group_id)
            .filter(|e| e.kind == PointEventKind::Grant)
            .filter(|e| window.matches(e))
            .map(|e| e.amount)
            .sum()
    }
}

/// Input model for creating a new goal
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub id: Option<String>,
    pub group_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_points: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub reward_points: Option<i64>,
    pub created_by: String,
}

impl NewGoal {
    pub fn validate(&self) -> Result<()> {
        if self.group_id.trim().is_empty() {
            return Err(ValidationError::MissingField("groupId".to_string()).into());
        }
        validate_goal_fields(
            &self.name,
            self.target_points,
            self.reward_points,
            self.start_date,
            self.end_date,
        )
    }

    pub fn category_or_default(&self) -> String {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string()
    }
}

/// Input model for editing an existing goal.
///
/// Ownership, group and completion state are not editable.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_points: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub reward_points: Option<i64>,
}

impl GoalUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("id".to_string()).into());
        }
        validate_goal_fields(
            &self.name,
            self.target_points,
            self.reward_points,
            self.start_date,
            self.end_date,
        )
    }
}

fn validate_goal_fields(
    name: &str,
    target_points: i64,
    reward_points: Option<i64>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField("name".to_string()).into());
    }
    if target_points <= 0 {
        return Err(ValidationError::NonPositive {
            field: "targetPoints",
            value: target_points,
        }
        .into());
    }
    if let Some(bonus) = reward_points {
        if bonus < 0 {
            return Err(ValidationError::InvalidInput(format!(
                "rewardPoints cannot be negative, got {}",
                bonus
            ))
            .into());
        }
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(ValidationError::InvalidWindow { start, end }.into());
        }
    }
    Ok(())
}

/// Progress of one member toward one goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal_id: String,
    pub user_id: String,
    pub group_id: String,
    pub current_points: i64,
    pub progress_percent: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl GoalProgress {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Percentage of `target` reached, clamped to [0, 100].
pub fn progress_percent(current_points: i64, target_points: i64) -> f64 {
    if target_points <= 0 {
        return 100.0;
    }
    if current_points >= target_points {
        return 100.0;
    }
    if current_points <= 0 {
        return 0.0;
    }
    (current_points as f64 * 100.0 / target_points as f64).min(100.0)
}

/// How a recomputation changes the stored point count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressChange {
    /// Add freshly granted points to the stored value (incremental path).
    Increment(i64),
    /// Overwrite with a known total.
    Replace(i64),
    /// Overwrite with the goal's windowed ledger sum, read by the store inside
    /// the same transaction as the write (reconciliation path).
    Recount,
}

/// A progress write requested by the engine.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub goal: Goal,
    pub user_id: String,
    pub change: ProgressChange,
    pub at: DateTime<Utc>,
    /// Actor recorded on a completion bonus, if one gets paid.
    pub actor_id: String,
}

/// What a progress write would do to the stored row.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvaluation {
    /// The row is already completed; nothing may change.
    Frozen,
    /// Store the new values. `reaches_target` asks for the completion transition.
    Update {
        current_points: i64,
        progress_percent: f64,
        reaches_target: bool,
    },
}

/// Decides the new row state for `update` given the stored row.
///
/// Shared by every storage backend so the completion rule lives in one place.
/// `recount` is only called for [`ProgressChange::Recount`] on a row that is
/// not frozen, and must read the ledger through the store's open transaction.
pub fn evaluate_progress(
    update: &ProgressUpdate,
    previous: Option<&GoalProgress>,
    recount: impl FnOnce(&Goal, &str) -> Result<i64>,
) -> Result<ProgressEvaluation> {
    if previous.map(GoalProgress::is_completed).unwrap_or(false) {
        return Ok(ProgressEvaluation::Frozen);
    }

    let current_points = match update.change {
        ProgressChange::Increment(delta) => previous
            .map(|p| p.current_points)
            .unwrap_or(0)
            .saturating_add(delta),
        ProgressChange::Replace(total) => total,
        ProgressChange::Recount => recount(&update.goal, &update.user_id)?,
    };

    Ok(ProgressEvaluation::Update {
        current_points,
        progress_percent: progress_percent(current_points, update.goal.target_points),
        reaches_target: current_points >= update.goal.target_points,
    })
}

/// Result of a progress write.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressOutcome {
    pub progress: GoalProgress,
    /// True only for the write that performed the completion transition.
    pub newly_completed: bool,
    /// Ledger entry of the completion bonus, when this write paid one.
    pub bonus_event: Option<PointEvent>,
}

impl ProgressOutcome {
    pub fn bonus_points(&self) -> i64 {
        self.bonus_event.as_ref().map(|e| e.amount).unwrap_or(0)
    }
}
