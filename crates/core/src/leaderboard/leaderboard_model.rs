use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT};

/// One row of a group leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub points: i64,
    /// 1-based position. Ties are broken by user id, so ranks never repeat.
    pub rank: usize,
    pub points_this_week: i64,
    pub points_this_month: i64,
}

/// Point statistics of one member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserPointsStats {
    pub user_id: String,
    pub group_id: String,
    pub current_points: i64,
    pub points_this_week: i64,
    pub points_this_month: i64,
    /// All points ever spent, redemptions and deductions alike.
    pub points_redeemed: i64,
}

/// Resolves a requested leaderboard size.
pub fn clamp_limit(limit: Option<i64>) -> usize {
    limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT) as usize
}

/// Sorts by points descending then user id ascending and assigns ranks 1..n.
pub fn rank_entries(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}
