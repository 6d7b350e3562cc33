use async_trait::async_trait;

use super::rewards_model::{
    NewRedemption, NewReward, Redemption, RedemptionStatus, RedemptionStatusUpdate, Reward,
    RewardUpdate,
};
use crate::errors::Result;

/// Trait for reward and redemption repository operations
#[async_trait]
pub trait RewardRepositoryTrait: Send + Sync {
    async fn insert_new_reward(&self, new_reward: NewReward) -> Result<Reward>;
    async fn update_reward(&self, reward_update: RewardUpdate) -> Result<Reward>;
    /// Soft delete. Returns the number of rows changed.
    async fn deactivate_reward(&self, reward_id: &str) -> Result<usize>;
    fn get_reward(&self, reward_id: &str) -> Result<Reward>;

    /// Active rewards of a group, cheapest first.
    fn list_active_rewards(&self, group_id: &str) -> Result<Vec<Reward>>;

    /// Redemption composite write.
    ///
    /// In one transaction: re-checks that the reward is active and under its
    /// cap and that the balance covers the cost, inserts the redemption,
    /// increments the reward's counter, and appends the Spend ledger entry.
    /// Any failed check aborts the whole write.
    async fn create_redemption(&self, redemption: NewRedemption) -> Result<Redemption>;

    fn get_redemption(&self, redemption_id: &str) -> Result<Redemption>;

    /// Conditional status change; fails when the row no longer has `update.from`.
    async fn update_redemption_status(&self, update: RedemptionStatusUpdate)
        -> Result<Redemption>;

    /// Redemptions of one member, newest first.
    fn list_user_redemptions(&self, user_id: &str, group_id: &str) -> Result<Vec<Redemption>>;

    /// Redemptions of a group, newest first, optionally filtered by status.
    fn list_group_redemptions(
        &self,
        group_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<Redemption>>;
}

/// Trait for reward catalogue and redemption operations
#[async_trait]
pub trait RewardServiceTrait: Send + Sync {
    async fn create_reward(&self, new_reward: NewReward, is_admin: bool) -> Result<Reward>;
    async fn update_reward(&self, reward_update: RewardUpdate, is_admin: bool) -> Result<Reward>;
    async fn deactivate_reward(&self, reward_id: &str, is_admin: bool) -> Result<()>;
    fn get_reward(&self, reward_id: &str) -> Result<Reward>;
    fn list_rewards(&self, group_id: &str) -> Result<Vec<Reward>>;

    /// Active rewards the member can afford right now and that are under cap.
    fn get_available_rewards(&self, user_id: &str, group_id: &str) -> Result<Vec<Reward>>;

    async fn redeem_reward(
        &self,
        user_id: &str,
        group_id: &str,
        reward_id: &str,
    ) -> Result<Redemption>;

    async fn update_redemption_status(
        &self,
        redemption_id: &str,
        status: RedemptionStatus,
        notes: Option<String>,
        is_admin: bool,
    ) -> Result<Redemption>;

    fn list_user_redemptions(&self, user_id: &str, group_id: &str) -> Result<Vec<Redemption>>;

    fn list_group_redemptions(
        &self,
        group_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<Redemption>>;
}
