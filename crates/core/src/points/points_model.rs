//! Points ledger domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result, ValidationError};

/// Direction of a ledger entry. The amount itself is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointEventKind {
    Grant,
    Spend,
}

impl PointEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointEventKind::Grant => "GRANT",
            PointEventKind::Spend => "SPEND",
        }
    }

    /// Applies the direction to a positive amount.
    pub fn signed(&self, amount: i64) -> i64 {
        match self {
            PointEventKind::Grant => amount,
            PointEventKind::Spend => -amount,
        }
    }
}

impl fmt::Display for PointEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointEventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GRANT" => Ok(PointEventKind::Grant),
            "SPEND" => Ok(PointEventKind::Spend),
            other => Err(Error::Unexpected(format!(
                "Unknown point event kind '{}'",
                other
            ))),
        }
    }
}

/// Why a ledger entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointEventReason {
    /// Points earned through activity.
    Award,
    /// Manual or corrective removal of points.
    Deduction,
    /// One-time bonus for completing a goal. `reference_id` holds the goal id.
    GoalBonus,
    /// Cost of a reward redemption. `reference_id` holds the redemption id.
    Redemption,
}

impl PointEventReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointEventReason::Award => "AWARD",
            PointEventReason::Deduction => "DEDUCTION",
            PointEventReason::GoalBonus => "GOAL_BONUS",
            PointEventReason::Redemption => "REDEMPTION",
        }
    }
}

impl FromStr for PointEventReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AWARD" => Ok(PointEventReason::Award),
            "DEDUCTION" => Ok(PointEventReason::Deduction),
            "GOAL_BONUS" => Ok(PointEventReason::GoalBonus),
            "REDEMPTION" => Ok(PointEventReason::Redemption),
            other => Err(Error::Unexpected(format!(
                "Unknown point event reason '{}'",
                other
            ))),
        }
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointEvent {
    pub id: String,
    pub user_id: String,
    pub group_id: String,
    pub amount: i64,
    pub kind: PointEventKind,
    pub reason: PointEventReason,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl PointEvent {
    /// Contribution of this entry to the balance.
    pub fn signed_amount(&self) -> i64 {
        self.kind.signed(self.amount)
    }
}

/// Input for appending a ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPointEvent {
    pub user_id: String,
    pub group_id: String,
    pub amount: i64,
    pub kind: PointEventKind,
    pub reason: PointEventReason,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl NewPointEvent {
    pub fn award(
        user_id: &str,
        group_id: &str,
        amount: i64,
        actor_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
            amount,
            kind: PointEventKind::Grant,
            reason: PointEventReason::Award,
            reference_id: None,
            created_at: at,
            created_by: actor_id.to_string(),
        }
    }

    pub fn deduction(
        user_id: &str,
        group_id: &str,
        amount: i64,
        actor_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: PointEventKind::Spend,
            reason: PointEventReason::Deduction,
            ..Self::award(user_id, group_id, amount, actor_id, at)
        }
    }

    pub fn goal_bonus(
        goal_id: &str,
        user_id: &str,
        group_id: &str,
        amount: i64,
        actor_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            reason: PointEventReason::GoalBonus,
            reference_id: Some(goal_id.to_string()),
            ..Self::award(user_id, group_id, amount, actor_id, at)
        }
    }

    pub fn redemption(
        redemption_id: &str,
        user_id: &str,
        group_id: &str,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: PointEventKind::Spend,
            reason: PointEventReason::Redemption,
            reference_id: Some(redemption_id.to_string()),
            ..Self::award(user_id, group_id, amount, user_id, at)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("userId".to_string()).into());
        }
        if self.group_id.trim().is_empty() {
            return Err(ValidationError::MissingField("groupId".to_string()).into());
        }
        if self.created_by.trim().is_empty() {
            return Err(ValidationError::MissingField("createdBy".to_string()).into());
        }
        if self.amount <= 0 {
            return Err(ValidationError::NonPositive {
                field: "amount",
                value: self.amount,
            }
            .into());
        }
        Ok(())
    }

    pub fn signed_amount(&self) -> i64 {
        self.kind.signed(self.amount)
    }
}

/// Materialized running total for one member of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub user_id: String,
    pub group_id: String,
    pub points: i64,
    pub updated_at: DateTime<Utc>,
}

/// Filter for summing ledger entries of one kind.
///
/// Bounds are inclusive. `exclude_bonus_of_goal` drops the completion bonus a
/// goal paid out, so a goal never counts its own bonus toward its progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointsWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub exclude_bonus_of_goal: Option<String>,
}

impl PointsWindow {
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            since: Some(start),
            ..Self::default()
        }
    }

    /// Returns true when `event` would be counted by this window.
    pub fn matches(&self, event: &PointEvent) -> bool {
        if !crate::utils::in_window(event.created_at, self.since, self.until) {
            return false;
        }
        match &self.exclude_bonus_of_goal {
            Some(goal_id) => {
                !(event.reason == PointEventReason::GoalBonus
                    && event.reference_id.as_deref() == Some(goal_id.as_str()))
            }
            None => true,
        }
    }
}
