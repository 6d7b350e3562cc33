use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use super::goals_model::{Goal, GoalUpdate, NewGoal};
use super::goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
use crate::errors::{PreconditionError, Result, ValidationError};

/// Goal catalogue: admin-managed definitions of point goals.
pub struct GoalService {
    goal_repo: Arc<dyn GoalRepositoryTrait>,
}

impl GoalService {
    pub fn new(goal_repo: Arc<dyn GoalRepositoryTrait>) -> Self {
        GoalService { goal_repo }
    }
}

#[async_trait]
impl GoalServiceTrait for GoalService {
    async fn create_goal(&self, new_goal: NewGoal, is_admin: bool) -> Result<Goal> {
        if !is_admin {
            return Err(PreconditionError::AdminRequired("create goals").into());
        }
        new_goal.validate()?;
        let goal = self.goal_repo.insert_new_goal(new_goal).await?;
        info!(
            "Created goal {} in group {} (target {})",
            goal.id, goal.group_id, goal.target_points
        );
        Ok(goal)
    }

    async fn update_goal(&self, goal_update: GoalUpdate, is_admin: bool) -> Result<Goal> {
        if !is_admin {
            return Err(PreconditionError::AdminRequired("edit goals").into());
        }
        goal_update.validate()?;
        self.goal_repo.update_goal(goal_update).await
    }

    async fn deactivate_goal(&self, goal_id: &str, is_admin: bool) -> Result<()> {
        if !is_admin {
            return Err(PreconditionError::AdminRequired("delete goals").into());
        }
        if goal_id.trim().is_empty() {
            return Err(ValidationError::MissingField("goalId".to_string()).into());
        }
        // Resolve first so an unknown id surfaces as NotFound rather than a no-op.
        self.goal_repo.get_goal(goal_id)?;
        self.goal_repo.deactivate_goal(goal_id).await?;
        Ok(())
    }

    fn get_goal(&self, goal_id: &str) -> Result<Goal> {
        self.goal_repo.get_goal(goal_id)
    }

    fn list_goals(&self, group_id: &str, user_id: &str) -> Result<Vec<Goal>> {
        self.goal_repo.list_goals_for_user(group_id, user_id)
    }
}
