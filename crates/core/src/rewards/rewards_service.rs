use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;

use super::rewards_model::{
    NewRedemption, NewReward, Redemption, RedemptionStatus, RedemptionStatusUpdate, Reward,
    RewardUpdate,
};
use super::rewards_traits::{RewardRepositoryTrait, RewardServiceTrait};
use crate::errors::{PreconditionError, Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::points::LedgerReader;
use crate::utils::Clock;

/// Reward catalogue and redemption flow.
pub struct RewardService {
    reward_repo: Arc<dyn RewardRepositoryTrait>,
    ledger: Arc<dyn LedgerReader>,
    event_sink: Arc<dyn DomainEventSink>,
    clock: Arc<dyn Clock>,
}

impl RewardService {
    pub fn new(
        reward_repo: Arc<dyn RewardRepositoryTrait>,
        ledger: Arc<dyn LedgerReader>,
        event_sink: Arc<dyn DomainEventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reward_repo,
            ledger,
            event_sink,
            clock,
        }
    }

    /// Checks a redemption against the current reward and balance.
    ///
    /// The storage composite repeats the cap and balance checks inside its
    /// transaction; this pass only produces early, precise errors.
    fn check_redeemable(&self, reward: &Reward, user_id: &str, group_id: &str) -> Result<()> {
        if reward.group_id != group_id {
            return Err(PreconditionError::WrongGroup {
                reward_id: reward.id.clone(),
                group_id: group_id.to_string(),
            }
            .into());
        }
        if !reward.is_active {
            return Err(PreconditionError::RewardInactive(reward.id.clone()).into());
        }
        if let Some(max_redeems) = reward.max_redeems.filter(|_| reward.is_capped()) {
            return Err(PreconditionError::RedemptionCapReached {
                reward_id: reward.id.clone(),
                max_redeems,
            }
            .into());
        }
        let balance = self.ledger.get_balance(user_id, group_id)?;
        if !reward.is_affordable(balance) {
            return Err(PreconditionError::InsufficientBalance {
                required: reward.points_cost,
                available: balance,
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl RewardServiceTrait for RewardService {
    async fn create_reward(&self, new_reward: NewReward, is_admin: bool) -> Result<Reward> {
        if !is_admin {
            return Err(PreconditionError::AdminRequired("create rewards").into());
        }
        new_reward.validate()?;
        let reward = self.reward_repo.insert_new_reward(new_reward).await?;
        info!(
            "Created reward {} in group {} (cost {})",
            reward.id, reward.group_id, reward.points_cost
        );
        Ok(reward)
    }

    async fn update_reward(&self, reward_update: RewardUpdate, is_admin: bool) -> Result<Reward> {
        if !is_admin {
            return Err(PreconditionError::AdminRequired("edit rewards").into());
        }
        reward_update.validate()?;
        self.reward_repo.update_reward(reward_update).await
    }

    async fn deactivate_reward(&self, reward_id: &str, is_admin: bool) -> Result<()> {
        if !is_admin {
            return Err(PreconditionError::AdminRequired("delete rewards").into());
        }
        self.reward_repo.get_reward(reward_id)?;
        self.reward_repo.deactivate_reward(reward_id).await?;
        Ok(())
    }

    fn get_reward(&self, reward_id: &str) -> Result<Reward> {
        self.reward_repo.get_reward(reward_id)
    }

    fn list_rewards(&self, group_id: &str) -> Result<Vec<Reward>> {
        self.reward_repo.list_active_rewards(group_id)
    }

    fn get_available_rewards(&self, user_id: &str, group_id: &str) -> Result<Vec<Reward>> {
        let balance = self.ledger.get_balance(user_id, group_id)?;
        Ok(self
            .reward_repo
            .list_active_rewards(group_id)?
            .into_iter()
            .filter(|r| r.is_affordable(balance) && !r.is_capped())
            .collect())
    }

    async fn redeem_reward(
        &self,
        user_id: &str,
        group_id: &str,
        reward_id: &str,
    ) -> Result<Redemption> {
        if user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("userId".to_string()).into());
        }
        if group_id.trim().is_empty() {
            return Err(ValidationError::MissingField("groupId".to_string()).into());
        }

        let reward = self.reward_repo.get_reward(reward_id)?;
        self.check_redeemable(&reward, user_id, group_id)?;

        let redemption = self
            .reward_repo
            .create_redemption(NewRedemption {
                reward_id: reward.id.clone(),
                user_id: user_id.to_string(),
                group_id: group_id.to_string(),
                points: reward.points_cost,
                created_at: self.clock.now(),
            })
            .await?;

        info!(
            "User {} redeemed reward {} for {} points",
            user_id, reward.id, redemption.points
        );
        self.event_sink.emit(DomainEvent::reward_redeemed(
            &redemption.id,
            &reward.id,
            user_id,
            group_id,
            redemption.points,
        ));
        Ok(redemption)
    }

    async fn update_redemption_status(
        &self,
        redemption_id: &str,
        status: RedemptionStatus,
        notes: Option<String>,
        is_admin: bool,
    ) -> Result<Redemption> {
        if !is_admin {
            return Err(PreconditionError::AdminRequired("review redemptions").into());
        }

        let current = self.reward_repo.get_redemption(redemption_id)?;
        if !current.status.can_transition_to(status) {
            return Err(PreconditionError::InvalidStatusTransition {
                from: current.status.to_string(),
                to: status.to_string(),
            }
            .into());
        }

        // No ledger effect: a rejected redemption keeps its deduction.
        let updated = self
            .reward_repo
            .update_redemption_status(RedemptionStatusUpdate {
                redemption_id: redemption_id.to_string(),
                from: current.status,
                to: status,
                notes,
                updated_at: self.clock.now(),
            })
            .await?;

        debug!(
            "Redemption {} moved from {} to {}",
            redemption_id, current.status, status
        );
        self.event_sink
            .emit(DomainEvent::redemption_status_changed(redemption_id, status));
        Ok(updated)
    }

    fn list_user_redemptions(&self, user_id: &str, group_id: &str) -> Result<Vec<Redemption>> {
        self.reward_repo.list_user_redemptions(user_id, group_id)
    }

    fn list_group_redemptions(
        &self,
        group_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<Redemption>> {
        self.reward_repo.list_group_redemptions(group_id, status)
    }
}
