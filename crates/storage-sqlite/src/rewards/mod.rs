//! SQLite storage implementation for rewards and their redemptions.

mod model;
mod repository;

pub use model::{RedemptionDB, RewardDB};
pub use repository::RewardRepository;
