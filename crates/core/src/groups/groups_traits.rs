//! Membership provider contract.
//!
//! The points core trusts pre-validated `(user_id, group_id)` pairs; this trait
//! is only used to enumerate groups and members for batch work and rankings.

use async_trait::async_trait;

use super::groups_model::{GroupMember, NewGroupMember};
use crate::errors::Result;

#[async_trait]
pub trait MembershipRepositoryTrait: Send + Sync {
    /// Ids of every group that has at least one active member.
    fn list_active_group_ids(&self) -> Result<Vec<String>>;

    /// Ids of the active members of a group, in ascending order.
    fn list_active_member_ids(&self, group_id: &str) -> Result<Vec<String>>;

    fn get_member(&self, user_id: &str, group_id: &str) -> Result<Option<GroupMember>>;

    /// Adds a member, or re-activates and updates the role of an existing one.
    async fn upsert_member(&self, member: NewGroupMember) -> Result<GroupMember>;

    /// Marks a member inactive. Returns the number of rows changed.
    async fn deactivate_member(&self, user_id: &str, group_id: &str) -> Result<usize>;
}
