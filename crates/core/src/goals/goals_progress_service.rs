use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, warn};
use std::sync::Arc;

use super::goals_model::{Goal, GoalProgress, ProgressChange, ProgressOutcome, ProgressUpdate};
use super::goals_traits::{GoalProgressServiceTrait, GoalRepositoryTrait};
use crate::constants::SYSTEM_ACTOR_ID;
use crate::errors::{Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::groups::MembershipRepositoryTrait;
use crate::utils::Clock;

/// Goal progress engine.
///
/// Two paths write progress rows. The incremental path adds freshly awarded
/// points to the stored value; the batch path overwrites it with the windowed
/// ledger sum, which the repository reads inside the write transaction. Both
/// hand the write to [`GoalRepositoryTrait::apply_progress`], which owns the
/// completion transition, so a bonus is paid at most once whichever path gets
/// there first.
pub struct GoalProgressService {
    goal_repo: Arc<dyn GoalRepositoryTrait>,
    membership: Arc<dyn MembershipRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    clock: Arc<dyn Clock>,
}

impl GoalProgressService {
    pub fn new(
        goal_repo: Arc<dyn GoalRepositoryTrait>,
        membership: Arc<dyn MembershipRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            goal_repo,
            membership,
            event_sink,
            clock,
        }
    }

    /// Incremental update for one grant stamped `awarded_at`. Boxed so that
    /// completion bonuses can feed back into the member's other goals.
    fn apply_increment<'a>(
        &'a self,
        user_id: &'a str,
        group_id: &'a str,
        amount: i64,
        awarded_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<Vec<ProgressOutcome>>> {
        async move {
            let now = self.clock.now();
            let goals: Vec<Goal> = self
                .goal_repo
                .list_goals_for_user(group_id, user_id)?
                .into_iter()
                .filter(|g| g.is_active && g.applies_to(user_id) && g.is_open_at(awarded_at))
                .collect();

            let mut outcomes = Vec::new();
            let mut bonuses = Vec::new();

            for goal in goals {
                let stored = self.goal_repo.get_progress(&goal.id, user_id)?;
                if stored.as_ref().map(GoalProgress::is_completed).unwrap_or(false) {
                    continue;
                }

                let goal_id = goal.id.clone();
                let update = ProgressUpdate {
                    goal,
                    user_id: user_id.to_string(),
                    change: ProgressChange::Increment(amount),
                    at: now,
                    actor_id: SYSTEM_ACTOR_ID.to_string(),
                };

                // The grant is already committed; a failed goal is left for
                // the reconciler instead of failing the others.
                match self.goal_repo.apply_progress(update).await {
                    Ok(Some(outcome)) => {
                        if outcome.newly_completed {
                            bonuses.extend(self.record_completion(&outcome));
                        }
                        outcomes.push(outcome);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(
                        "Failed to apply {} points to goal {} for {}: {}",
                        amount, goal_id, user_id, e
                    ),
                }
            }

            for (bonus, paid_at) in bonuses {
                outcomes.extend(self.apply_increment(user_id, group_id, bonus, paid_at).await?);
            }

            Ok(outcomes)
        }
        .boxed()
    }

    /// Logs and announces a completion. Returns the paid bonus and its ledger
    /// timestamp, if any.
    fn record_completion(&self, outcome: &ProgressOutcome) -> Option<(i64, DateTime<Utc>)> {
        let progress = &outcome.progress;
        let bonus = outcome.bonus_points();
        info!(
            "User {} completed goal {} in group {} (bonus {})",
            progress.user_id, progress.goal_id, progress.group_id, bonus
        );
        self.event_sink.emit(DomainEvent::goal_completed(
            &progress.goal_id,
            &progress.user_id,
            &progress.group_id,
            bonus,
        ));
        outcome
            .bonus_event
            .as_ref()
            .filter(|e| e.amount > 0)
            .map(|e| (e.amount, e.created_at))
    }

    fn tracked_users(&self, goal: &Goal) -> Result<Vec<String>> {
        match &goal.user_id {
            Some(owner) => Ok(vec![owner.clone()]),
            None => self.membership.list_active_member_ids(&goal.group_id),
        }
    }
}

#[async_trait]
impl GoalProgressServiceTrait for GoalProgressService {
    async fn apply_points_awarded(
        &self,
        user_id: &str,
        group_id: &str,
        amount: i64,
        awarded_at: DateTime<Utc>,
    ) -> Result<Vec<ProgressOutcome>> {
        if amount <= 0 {
            return Err(ValidationError::NonPositive {
                field: "amount",
                value: amount,
            }
            .into());
        }
        if user_id.trim().is_empty() || group_id.trim().is_empty() {
            return Err(ValidationError::MissingField("userId/groupId".to_string()).into());
        }
        self.apply_increment(user_id, group_id, amount, awarded_at)
            .await
    }

    async fn recompute_group(&self, group_id: &str) -> Result<Vec<ProgressOutcome>> {
        let mut outcomes = Vec::new();
        for goal in self.goal_repo.list_active_goals(group_id)? {
            outcomes.extend(self.recompute_goal(&goal).await?);
        }
        Ok(outcomes)
    }

    async fn recompute_goal(&self, goal: &Goal) -> Result<Vec<ProgressOutcome>> {
        if !goal.is_active {
            return Ok(Vec::new());
        }
        let mut outcomes = Vec::new();
        for user_id in self.tracked_users(goal)? {
            if let Some(outcome) = self.recompute_goal_for_user(goal, &user_id).await? {
                outcomes.push(outcome);
            }
        }
        debug!(
            "Recomputed goal {} for {} member(s)",
            goal.id,
            outcomes.len()
        );
        Ok(outcomes)
    }

    async fn recompute_goal_for_user(
        &self,
        goal: &Goal,
        user_id: &str,
    ) -> Result<Option<ProgressOutcome>> {
        let update = ProgressUpdate {
            goal: goal.clone(),
            user_id: user_id.to_string(),
            change: ProgressChange::Recount,
            at: self.clock.now(),
            actor_id: SYSTEM_ACTOR_ID.to_string(),
        };

        let Some(outcome) = self.goal_repo.apply_progress(update).await? else {
            return Ok(None);
        };

        if outcome.newly_completed {
            if let Some((bonus, paid_at)) = self.record_completion(&outcome) {
                self.apply_increment(user_id, &goal.group_id, bonus, paid_at)
                    .await?;
            }
        }
        Ok(Some(outcome))
    }

    fn get_user_goal_progress(&self, user_id: &str, group_id: &str) -> Result<Vec<GoalProgress>> {
        self.goal_repo.list_user_progress(user_id, group_id)
    }
}
