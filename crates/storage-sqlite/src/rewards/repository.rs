use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;

use circlepoints_core::errors::PreconditionError;
use circlepoints_core::points::NewPointEvent;
use circlepoints_core::rewards::{
    NewRedemption, NewReward, Redemption, RedemptionStatus, RedemptionStatusUpdate, Reward,
    RewardRepositoryTrait, RewardUpdate,
};
use circlepoints_core::{Error, Result};

use super::model::{RedemptionDB, RewardDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::points::{append_event, balance_of};
use crate::schema::{redemptions, rewards};

pub struct RewardRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl RewardRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        RewardRepository { pool, writer }
    }
}

fn load_reward(conn: &mut SqliteConnection, reward_id: &str) -> Result<Reward> {
    rewards::table
        .find(reward_id)
        .select(RewardDB::as_select())
        .first::<RewardDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .map(Reward::from)
        .ok_or_else(|| Error::not_found("Reward", reward_id))
}

fn load_redemption(conn: &mut SqliteConnection, redemption_id: &str) -> Result<Redemption> {
    redemptions::table
        .find(redemption_id)
        .select(RedemptionDB::as_select())
        .first::<RedemptionDB>(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| Error::not_found("Redemption", redemption_id))
        .and_then(Redemption::try_from)
}

fn into_redemptions(rows: Vec<RedemptionDB>) -> Result<Vec<Redemption>> {
    rows.into_iter().map(Redemption::try_from).collect()
}

#[async_trait]
impl RewardRepositoryTrait for RewardRepository {
    async fn insert_new_reward(&self, new_reward: NewReward) -> Result<Reward> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Reward> {
                let row = RewardDB::from_new(new_reward, Utc::now().naive_utc());
                let stored = diesel::insert_into(rewards::table)
                    .values(&row)
                    .returning(RewardDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(Reward::from(stored))
            })
            .await
    }

    async fn update_reward(&self, reward_update: RewardUpdate) -> Result<Reward> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Reward> {
                let category = reward_update.category_or_default();
                let reward_id = reward_update.id.as_str();
                let changed = diesel::update(rewards::table.find(reward_id))
                    .set((
                        rewards::name.eq(&reward_update.name),
                        rewards::description.eq(&reward_update.description),
                        rewards::category.eq(category),
                        rewards::points_cost.eq(reward_update.points_cost),
                        rewards::max_redeems.eq(reward_update.max_redeems),
                        rewards::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if changed == 0 {
                    return Err(Error::not_found("Reward", reward_id));
                }
                load_reward(conn, reward_id)
            })
            .await
    }

    async fn deactivate_reward(&self, reward_id: &str) -> Result<usize> {
        let reward_id = reward_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::update(rewards::table.find(reward_id))
                    .set((
                        rewards::is_active.eq(false),
                        rewards::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    fn get_reward(&self, reward_id: &str) -> Result<Reward> {
        let mut conn = get_connection(&self.pool)?;
        load_reward(&mut conn, reward_id)
    }

    /// Active rewards of a group, cheapest first.
    fn list_active_rewards(&self, group_id: &str) -> Result<Vec<Reward>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = rewards::table
            .filter(rewards::group_id.eq(group_id))
            .filter(rewards::is_active.eq(true))
            .order((rewards::points_cost.asc(), rewards::name.asc()))
            .select(RewardDB::as_select())
            .load::<RewardDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Reward::from).collect())
    }

    /// Re-checks every redemption precondition against committed state, then
    /// bumps the reward counter, records the redemption and spends the points
    /// in a single transaction.
    async fn create_redemption(&self, redemption: NewRedemption) -> Result<Redemption> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Redemption> {
                let reward = load_reward(conn, &redemption.reward_id)?;
                if reward.group_id != redemption.group_id {
                    return Err(PreconditionError::WrongGroup {
                        reward_id: reward.id,
                        group_id: redemption.group_id,
                    }
                    .into());
                }
                if !reward.is_active {
                    return Err(PreconditionError::RewardInactive(reward.id).into());
                }
                if reward.is_capped() {
                    return Err(PreconditionError::RedemptionCapReached {
                        max_redeems: reward.max_redeems.unwrap_or_default(),
                        reward_id: reward.id,
                    }
                    .into());
                }
                let available = balance_of(conn, &redemption.user_id, &redemption.group_id)?;
                if available < redemption.points {
                    return Err(PreconditionError::InsufficientBalance {
                        required: redemption.points,
                        available,
                    }
                    .into());
                }

                diesel::update(rewards::table.find(&reward.id))
                    .set(rewards::times_redeemed.eq(rewards::times_redeemed + 1))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let stored = diesel::insert_into(redemptions::table)
                    .values(&RedemptionDB::pending(&redemption))
                    .returning(RedemptionDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;

                append_event(
                    conn,
                    NewPointEvent::redemption(
                        &stored.id,
                        &stored.user_id,
                        &stored.group_id,
                        stored.points,
                        redemption.created_at,
                    ),
                )?;

                Redemption::try_from(stored)
            })
            .await
    }

    fn get_redemption(&self, redemption_id: &str) -> Result<Redemption> {
        let mut conn = get_connection(&self.pool)?;
        load_redemption(&mut conn, redemption_id)
    }

    /// Moves a redemption only if it is still in `update.from`; a concurrent
    /// reviewer who got there first turns this call into a transition error.
    async fn update_redemption_status(
        &self,
        update: RedemptionStatusUpdate,
    ) -> Result<Redemption> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Redemption> {
                let redemption_id = update.redemption_id.as_str();
                let target = redemptions::table
                    .find(redemption_id)
                    .filter(redemptions::status.eq(update.from.as_str()));
                let at = update.updated_at.naive_utc();

                let changed = match &update.notes {
                    Some(notes) => diesel::update(target)
                        .set((
                            redemptions::status.eq(update.to.as_str()),
                            redemptions::notes.eq(Some(notes.as_str())),
                            redemptions::updated_at.eq(at),
                        ))
                        .execute(conn),
                    None => diesel::update(target)
                        .set((
                            redemptions::status.eq(update.to.as_str()),
                            redemptions::updated_at.eq(at),
                        ))
                        .execute(conn),
                }
                .map_err(StorageError::from)?;

                if changed == 0 {
                    let current = load_redemption(conn, redemption_id)?;
                    return Err(PreconditionError::InvalidStatusTransition {
                        from: current.status.to_string(),
                        to: update.to.to_string(),
                    }
                    .into());
                }
                load_redemption(conn, redemption_id)
            })
            .await
    }

    /// A member's redemptions, newest first.
    fn list_user_redemptions(&self, user_id: &str, group_id: &str) -> Result<Vec<Redemption>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = redemptions::table
            .filter(redemptions::user_id.eq(user_id))
            .filter(redemptions::group_id.eq(group_id))
            .order(redemptions::created_at.desc())
            .select(RedemptionDB::as_select())
            .load::<RedemptionDB>(&mut conn)
            .map_err(StorageError::from)?;
        into_redemptions(rows)
    }

    fn list_group_redemptions(
        &self,
        group_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<Redemption>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = redemptions::table
            .filter(redemptions::group_id.eq(group_id))
            .order(redemptions::created_at.desc())
            .select(RedemptionDB::as_select())
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(redemptions::status.eq(status.as_str()));
        }
        let rows = query
            .load::<RedemptionDB>(&mut conn)
            .map_err(StorageError::from)?;
        into_redemptions(rows)
    }
}
