use crate::errors::Result;
use crate::goals::goals_model::{
    Goal, GoalProgress, GoalUpdate, NewGoal, ProgressOutcome, ProgressUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for goal repository operations
#[async_trait]
pub trait GoalRepositoryTrait: Send + Sync {
    async fn insert_new_goal(&self, new_goal: NewGoal) -> Result<Goal>;
    async fn update_goal(&self, goal_update: GoalUpdate) -> Result<Goal>;
    /// Soft delete. Returns the number of rows changed.
    async fn deactivate_goal(&self, goal_id: &str) -> Result<usize>;
    fn get_goal(&self, goal_id: &str) -> Result<Goal>;

    /// Active goals visible to `user_id`: group-wide ones plus the user's own,
    /// ordered by end date (open-ended last) then target.
    fn list_goals_for_user(&self, group_id: &str, user_id: &str) -> Result<Vec<Goal>>;

    /// Every active goal of a group.
    fn list_active_goals(&self, group_id: &str) -> Result<Vec<Goal>>;

    fn get_progress(&self, goal_id: &str, user_id: &str) -> Result<Option<GoalProgress>>;

    /// Progress rows of a member for the group's active goals.
    fn list_user_progress(&self, user_id: &str, group_id: &str) -> Result<Vec<GoalProgress>>;

    /// Applies a progress change in one serialized transaction.
    ///
    /// The implementation evaluates the change with
    /// [`evaluate_progress`](crate::goals::evaluate_progress) against the
    /// stored row, writes the row, and when the target is reached performs the
    /// completion transition: `completed_at` is flipped only if still null, and
    /// only that flip appends the bonus ledger entry (balance and event) in the
    /// same transaction.
    ///
    /// Returns `None` when the stored row is already completed and was left
    /// untouched.
    async fn apply_progress(&self, update: ProgressUpdate) -> Result<Option<ProgressOutcome>>;
}

/// Trait for goal catalogue operations
#[async_trait]
pub trait GoalServiceTrait: Send + Sync {
    async fn create_goal(&self, new_goal: NewGoal, is_admin: bool) -> Result<Goal>;
    async fn update_goal(&self, goal_update: GoalUpdate, is_admin: bool) -> Result<Goal>;
    async fn deactivate_goal(&self, goal_id: &str, is_admin: bool) -> Result<()>;
    fn get_goal(&self, goal_id: &str) -> Result<Goal>;
    fn list_goals(&self, group_id: &str, user_id: &str) -> Result<Vec<Goal>>;
}

/// Goal progress engine operations.
#[async_trait]
pub trait GoalProgressServiceTrait: Send + Sync {
    /// Incremental path, run after a successful award.
    ///
    /// Only goals whose window contains `awarded_at` (the ledger entry's
    /// timestamp) are touched. Returns one outcome per goal that was updated.
    async fn apply_points_awarded(
        &self,
        user_id: &str,
        group_id: &str,
        amount: i64,
        awarded_at: DateTime<Utc>,
    ) -> Result<Vec<ProgressOutcome>>;

    /// Authoritative recomputation of every active goal of a group.
    async fn recompute_group(&self, group_id: &str) -> Result<Vec<ProgressOutcome>>;

    /// Authoritative recomputation of one goal for every member it tracks.
    async fn recompute_goal(&self, goal: &Goal) -> Result<Vec<ProgressOutcome>>;

    /// Authoritative recomputation of one goal for one member.
    ///
    /// `None` when the member already completed the goal.
    async fn recompute_goal_for_user(
        &self,
        goal: &Goal,
        user_id: &str,
    ) -> Result<Option<ProgressOutcome>>;

    fn get_user_goal_progress(&self, user_id: &str, group_id: &str) -> Result<Vec<GoalProgress>>;
}
