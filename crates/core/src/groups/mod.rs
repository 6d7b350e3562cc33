//! Groups module - membership models and the membership provider trait.

mod groups_model;
mod groups_traits;

pub use groups_model::{GroupMember, NewGroupMember};
pub use groups_traits::MembershipRepositoryTrait;
