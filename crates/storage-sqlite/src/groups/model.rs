//! Database model for group members.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use circlepoints_core::groups::GroupMember;

#[derive(Queryable, Selectable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::group_members)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GroupMemberDB {
    pub user_id: String,
    pub group_id: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub joined_at: NaiveDateTime,
}

impl From<GroupMemberDB> for GroupMember {
    fn from(db: GroupMemberDB) -> Self {
        Self {
            user_id: db.user_id,
            group_id: db.group_id,
            is_admin: db.is_admin,
            is_active: db.is_active,
            joined_at: db.joined_at.and_utc(),
        }
    }
}
