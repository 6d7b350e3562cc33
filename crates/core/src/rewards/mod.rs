//! Rewards module - reward catalogue, redemptions and their status machine.

mod rewards_model;
mod rewards_service;
mod rewards_traits;


pub use rewards_model::{
    NewRedemption, NewReward, Redemption, RedemptionStatus, RedemptionStatusUpdate, Reward,
    RewardUpdate,
};
pub use rewards_service::RewardService;
pub use rewards_traits::{RewardRepositoryTrait, RewardServiceTrait};
