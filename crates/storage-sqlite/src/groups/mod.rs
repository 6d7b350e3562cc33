//! SQLite storage implementation for group membership.

mod model;
mod repository;

pub use model::GroupMemberDB;
pub use repository::MembershipRepository;

#[cfg(test)]
mod repository_tests;
