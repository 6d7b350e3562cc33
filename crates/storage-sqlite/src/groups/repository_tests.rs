use std::sync::Arc;

use circlepoints_core::groups::{MembershipRepositoryTrait, NewGroupMember};

use super::MembershipRepository;
use crate::test_support::test_db;

fn member(user_id: &str, group_id: &str, is_admin: bool) -> NewGroupMember {
    NewGroupMember {
        user_id: user_id.to_string(),
        group_id: group_id.to_string(),
        is_admin,
    }
}

#[tokio::test]
async fn upsert_then_deactivate() {
    let db = test_db();
    let repo = MembershipRepository::new(Arc::clone(&db.pool), db.writer.clone());

    repo.upsert_member(member("u2", "g1", false)).await.unwrap();
    repo.upsert_member(member("u1", "g1", true)).await.unwrap();
    repo.upsert_member(member("u3", "g2", false)).await.unwrap();

    assert_eq!(repo.list_active_member_ids("g1").unwrap(), vec!["u1", "u2"]);
    assert_eq!(repo.list_active_group_ids().unwrap(), vec!["g1", "g2"]);
    assert!(repo.get_member("u1", "g1").unwrap().unwrap().is_admin);
    assert!(repo.get_member("u1", "g2").unwrap().is_none());

    assert_eq!(repo.deactivate_member("u3", "g2").await.unwrap(), 1);
    assert_eq!(repo.deactivate_member("u3", "g2").await.unwrap(), 0);
    assert_eq!(repo.list_active_group_ids().unwrap(), vec!["g1"]);
    assert!(!repo.get_member("u3", "g2").unwrap().unwrap().is_active);
}

#[tokio::test]
async fn rejoining_reactivates_and_keeps_join_date() {
    let db = test_db();
    let repo = MembershipRepository::new(Arc::clone(&db.pool), db.writer.clone());

    let first = repo.upsert_member(member("u1", "g1", false)).await.unwrap();
    repo.deactivate_member("u1", "g1").await.unwrap();

    let again = repo.upsert_member(member("u1", "g1", true)).await.unwrap();
    assert!(again.is_active);
    assert!(again.is_admin);
    assert_eq!(again.joined_at, first.joined_at);
    assert_eq!(repo.list_active_member_ids("g1").unwrap(), vec!["u1"]);
}

#[tokio::test]
async fn blank_ids_are_rejected() {
    let db = test_db();
    let repo = MembershipRepository::new(Arc::clone(&db.pool), db.writer.clone());

    assert!(repo.upsert_member(member(" ", "g1", false)).await.is_err());
    assert!(repo.list_active_member_ids("g1").unwrap().is_empty());
}
