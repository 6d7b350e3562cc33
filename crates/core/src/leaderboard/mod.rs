//! Leaderboard module - rankings and time-windowed point statistics.

mod leaderboard_model;
mod leaderboard_service;


pub use leaderboard_model::{clamp_limit, rank_entries, LeaderboardEntry, UserPointsStats};
pub use leaderboard_service::{LeaderboardService, LeaderboardServiceTrait};
