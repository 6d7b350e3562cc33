//! Domain event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rewards::RedemptionStatus;

/// Domain events emitted by core services after successful mutations.
///
/// These events represent facts about committed ledger and catalogue changes.
/// Runtime adapters translate them into follow-up work (incremental goal
/// progress, notifications).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Points were granted to a member through the ledger service.
    /// `awarded_at` is the ledger entry's timestamp, which decides the goal
    /// windows the grant counts toward.
    PointsAwarded {
        user_id: String,
        group_id: String,
        amount: i64,
        awarded_at: DateTime<Utc>,
    },

    /// Points were spent or removed through the ledger service.
    PointsDeducted {
        user_id: String,
        group_id: String,
        amount: i64,
    },

    /// A member completed a goal. `bonus_points` is zero when the goal pays no bonus.
    GoalCompleted {
        goal_id: String,
        user_id: String,
        group_id: String,
        bonus_points: i64,
    },

    /// A reward was redeemed and its cost deducted.
    RewardRedeemed {
        redemption_id: String,
        reward_id: String,
        user_id: String,
        group_id: String,
        points: i64,
    },

    /// An admin moved a redemption to a new status.
    RedemptionStatusChanged {
        redemption_id: String,
        status: RedemptionStatus,
    },
}

impl DomainEvent {
    /// Creates a PointsAwarded event.
    pub fn points_awarded(
        user_id: &str,
        group_id: &str,
        amount: i64,
        awarded_at: DateTime<Utc>,
    ) -> Self {
        Self::PointsAwarded {
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
            amount,
            awarded_at,
        }
    }

    /// Creates a PointsDeducted event.
    pub fn points_deducted(user_id: &str, group_id: &str, amount: i64) -> Self {
        Self::PointsDeducted {
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
            amount,
        }
    }

    /// Creates a GoalCompleted event.
    pub fn goal_completed(goal_id: &str, user_id: &str, group_id: &str, bonus_points: i64) -> Self {
        Self::GoalCompleted {
            goal_id: goal_id.to_string(),
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
            bonus_points,
        }
    }

    /// Creates a RewardRedeemed event.
    pub fn reward_redeemed(
        redemption_id: &str,
        reward_id: &str,
        user_id: &str,
        group_id: &str,
        points: i64,
    ) -> Self {
        Self::RewardRedeemed {
            redemption_id: redemption_id.to_string(),
            reward_id: reward_id.to_string(),
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
            points,
        }
    }

    /// Creates a RedemptionStatusChanged event.
    pub fn redemption_status_changed(redemption_id: &str, status: RedemptionStatus) -> Self {
        Self::RedemptionStatusChanged {
            redemption_id: redemption_id.to_string(),
            status,
        }
    }
}
