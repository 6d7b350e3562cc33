use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;

use circlepoints_core::groups::{GroupMember, MembershipRepositoryTrait, NewGroupMember};
use circlepoints_core::Result;

use super::model::GroupMemberDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::group_members;
use crate::schema::group_members::dsl::*;

pub struct MembershipRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MembershipRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl MembershipRepositoryTrait for MembershipRepository {
    fn list_active_group_ids(&self) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(group_members
            .filter(is_active.eq(true))
            .select(group_id)
            .distinct()
            .order(group_id.asc())
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?)
    }

    fn list_active_member_ids(&self, group_id_param: &str) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(group_members
            .filter(group_id.eq(group_id_param))
            .filter(is_active.eq(true))
            .select(user_id)
            .order(user_id.asc())
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?)
    }

    fn get_member(&self, user_id_param: &str, group_id_param: &str) -> Result<Option<GroupMember>> {
        let mut conn = get_connection(&self.pool)?;
        let row = group_members
            .find((user_id_param, group_id_param))
            .select(GroupMemberDB::as_select())
            .first::<GroupMemberDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(GroupMember::from))
    }

    /// Adds the member, or reactivates them with the new admin flag. A
    /// returning member keeps their original join date.
    async fn upsert_member(&self, member: NewGroupMember) -> Result<GroupMember> {
        member.validate()?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<GroupMember> {
                let row = GroupMemberDB {
                    user_id: member.user_id,
                    group_id: member.group_id,
                    is_admin: member.is_admin,
                    is_active: true,
                    joined_at: Utc::now().naive_utc(),
                };
                let stored = diesel::insert_into(group_members::table)
                    .values(&row)
                    .on_conflict((user_id, group_id))
                    .do_update()
                    .set((is_admin.eq(row.is_admin), is_active.eq(true)))
                    .returning(GroupMemberDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(GroupMember::from(stored))
            })
            .await
    }

    async fn deactivate_member(&self, user_id_param: &str, group_id_param: &str) -> Result<usize> {
        let user = user_id_param.to_string();
        let group = group_id_param.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::update(
                    group_members
                        .filter(user_id.eq(user))
                        .filter(group_id.eq(group))
                        .filter(is_active.eq(true)),
                )
                .set(is_active.eq(false))
                .execute(conn)
                .map_err(StorageError::from)?)
            })
            .await
    }
}
