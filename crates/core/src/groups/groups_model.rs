//! Group membership models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};

/// A user's membership in a group, as resolved by the membership provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub user_id: String,
    pub group_id: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

/// Input model for adding or re-activating a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroupMember {
    pub user_id: String,
    pub group_id: String,
    pub is_admin: bool,
}

impl NewGroupMember {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("userId".to_string()).into());
        }
        if self.group_id.trim().is_empty() {
            return Err(ValidationError::MissingField("groupId".to_string()).into());
        }
        Ok(())
    }
}
