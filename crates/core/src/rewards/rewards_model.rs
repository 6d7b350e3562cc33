//! Rewards and redemptions domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::DEFAULT_CATEGORY;
use crate::errors::{Error, Result, ValidationError};

/// A reward members can spend points on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub points_cost: i64,
    /// Maximum number of redemptions across the group. `None` is unlimited.
    pub max_redeems: Option<i64>,
    pub times_redeemed: i64,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reward {
    pub fn is_capped(&self) -> bool {
        self.max_redeems
            .map(|max| self.times_redeemed >= max)
            .unwrap_or(false)
    }

    pub fn is_affordable(&self, balance: i64) -> bool {
        balance >= self.points_cost
    }
}

/// Input model for creating a new reward
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewReward {
    pub id: Option<String>,
    pub group_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub points_cost: i64,
    pub max_redeems: Option<i64>,
    pub created_by: String,
}

impl NewReward {
    pub fn validate(&self) -> Result<()> {
        if self.group_id.trim().is_empty() {
            return Err(ValidationError::MissingField("groupId".to_string()).into());
        }
        validate_reward_fields(&self.name, self.points_cost, self.max_redeems)
    }

    pub fn category_or_default(&self) -> String {
        category_or_default(self.category.as_deref())
    }
}

/// Input model for editing a reward. The redemption counter is not editable.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RewardUpdate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub points_cost: i64,
    pub max_redeems: Option<i64>,
}

impl RewardUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("id".to_string()).into());
        }
        validate_reward_fields(&self.name, self.points_cost, self.max_redeems)
    }

    pub fn category_or_default(&self) -> String {
        category_or_default(self.category.as_deref())
    }
}

fn category_or_default(category: Option<&str>) -> String {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string()
}

fn validate_reward_fields(name: &str, points_cost: i64, max_redeems: Option<i64>) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField("name".to_string()).into());
    }
    if points_cost <= 0 {
        return Err(ValidationError::NonPositive {
            field: "pointsCost",
            value: points_cost,
        }
        .into());
    }
    if let Some(max) = max_redeems {
        if max <= 0 {
            return Err(ValidationError::NonPositive {
                field: "maxRedeems",
                value: max,
            }
            .into());
        }
    }
    Ok(())
}

/// Lifecycle of a redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl RedemptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedemptionStatus::Pending => "PENDING",
            RedemptionStatus::Approved => "APPROVED",
            RedemptionStatus::Rejected => "REJECTED",
            RedemptionStatus::Completed => "COMPLETED",
        }
    }

    /// Allowed moves: Pending to Approved or Rejected, Approved to Completed.
    pub fn can_transition_to(&self, next: RedemptionStatus) -> bool {
        matches!(
            (self, next),
            (RedemptionStatus::Pending, RedemptionStatus::Approved)
                | (RedemptionStatus::Pending, RedemptionStatus::Rejected)
                | (RedemptionStatus::Approved, RedemptionStatus::Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RedemptionStatus::Rejected | RedemptionStatus::Completed)
    }
}

impl fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedemptionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(RedemptionStatus::Pending),
            "APPROVED" => Ok(RedemptionStatus::Approved),
            "REJECTED" => Ok(RedemptionStatus::Rejected),
            "COMPLETED" => Ok(RedemptionStatus::Completed),
            other => Err(Error::Unexpected(format!(
                "Unknown redemption status '{}'",
                other
            ))),
        }
    }
}

/// A reward claimed by a member. `points` is the cost at the time of the claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub id: String,
    pub reward_id: String,
    pub user_id: String,
    pub group_id: String,
    pub points: i64,
    pub status: RedemptionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for the redemption composite write.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRedemption {
    pub reward_id: String,
    pub user_id: String,
    pub group_id: String,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

/// A status change requested by an admin.
#[derive(Debug, Clone, PartialEq)]
pub struct RedemptionStatusUpdate {
    pub redemption_id: String,
    /// Status the row must still have for the change to apply.
    pub from: RedemptionStatus,
    pub to: RedemptionStatus,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}
