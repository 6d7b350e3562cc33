use std::collections::HashMap;
use std::sync::Arc;

use super::leaderboard_model::{clamp_limit, rank_entries, LeaderboardEntry, UserPointsStats};
use crate::constants::{MONTH_WINDOW_DAYS, WEEK_WINDOW_DAYS};
use crate::errors::Result;
use crate::groups::MembershipRepositoryTrait;
use crate::points::{LedgerReader, PointEventKind, PointsWindow};
use crate::utils::{trailing_window_start, Clock};

/// Trait for leaderboard and stats queries
pub trait LeaderboardServiceTrait: Send + Sync {
    /// Top of the group ranking. `limit` defaults to 10 and is clamped to [1, 50].
    fn get_leaderboard(&self, group_id: &str, limit: Option<i64>) -> Result<Vec<LeaderboardEntry>>;

    fn get_user_stats(&self, user_id: &str, group_id: &str) -> Result<UserPointsStats>;

    /// Position of a member in the full ranking; one past the last member when
    /// the user is not an active member.
    fn get_user_rank(&self, user_id: &str, group_id: &str) -> Result<usize>;
}

/// Read-only aggregator over the ledger and membership.
pub struct LeaderboardService {
    membership: Arc<dyn MembershipRepositoryTrait>,
    ledger: Arc<dyn LedgerReader>,
    clock: Arc<dyn Clock>,
}

impl LeaderboardService {
    pub fn new(
        membership: Arc<dyn MembershipRepositoryTrait>,
        ledger: Arc<dyn LedgerReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            membership,
            ledger,
            clock,
        }
    }

    /// Every active member of the group, ranked.
    fn full_board(&self, group_id: &str) -> Result<Vec<LeaderboardEntry>> {
        let now = self.clock.now();
        let members = self.membership.list_active_member_ids(group_id)?;

        let balances: HashMap<String, i64> = self
            .ledger
            .list_balances(group_id)?
            .into_iter()
            .map(|b| (b.user_id, b.points))
            .collect();
        let week = self
            .ledger
            .sum_grants_by_user(group_id, trailing_window_start(now, WEEK_WINDOW_DAYS))?;
        let month = self
            .ledger
            .sum_grants_by_user(group_id, trailing_window_start(now, MONTH_WINDOW_DAYS))?;

        let entries = members
            .into_iter()
            .map(|user_id| LeaderboardEntry {
                points: balances.get(&user_id).copied().unwrap_or(0),
                points_this_week: week.get(&user_id).copied().unwrap_or(0),
                points_this_month: month.get(&user_id).copied().unwrap_or(0),
                rank: 0,
                user_id,
            })
            .collect();

        Ok(rank_entries(entries))
    }
}

impl LeaderboardServiceTrait for LeaderboardService {
    fn get_leaderboard(&self, group_id: &str, limit: Option<i64>) -> Result<Vec<LeaderboardEntry>> {
        let mut board = self.full_board(group_id)?;
        board.truncate(clamp_limit(limit));
        Ok(board)
    }

    fn get_user_stats(&self, user_id: &str, group_id: &str) -> Result<UserPointsStats> {
        let now = self.clock.now();
        let week = PointsWindow::since(trailing_window_start(now, WEEK_WINDOW_DAYS));
        let month = PointsWindow::since(trailing_window_start(now, MONTH_WINDOW_DAYS));

        Ok(UserPointsStats {
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
            current_points: self.ledger.get_balance(user_id, group_id)?,
            points_this_week: self
                .ledger
                .sum_points(user_id, group_id, PointEventKind::Grant, &week)?,
            points_this_month: self
                .ledger
                .sum_points(user_id, group_id, PointEventKind::Grant, &month)?,
            points_redeemed: self.ledger.sum_points(
                user_id,
                group_id,
                PointEventKind::Spend,
                &PointsWindow::all_time(),
            )?,
        })
    }

    fn get_user_rank(&self, user_id: &str, group_id: &str) -> Result<usize> {
        let board = self.full_board(group_id)?;
        Ok(board
            .iter()
            .find(|e| e.user_id == user_id)
            .map(|e| e.rank)
            .unwrap_or(board.len() + 1))
    }
}
