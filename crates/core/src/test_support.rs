//! In-memory repositories shared by the service tests.
//!
//! `InMemoryStore` implements every repository trait over one mutex, which
//! gives each write the same all-or-nothing behaviour as a storage
//! transaction. Writes can be made to fail to exercise error paths.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::{DatabaseError, Error, PreconditionError, Result};
use crate::goals::{
    evaluate_progress, Goal, GoalProgress, GoalRepositoryTrait, GoalUpdate, NewGoal,
    ProgressEvaluation, ProgressOutcome, ProgressUpdate,
};
use crate::groups::{GroupMember, MembershipRepositoryTrait, NewGroupMember};
use crate::points::{
    Balance, LedgerReader, LedgerWriter, NewPointEvent, PointEvent, PointEventKind, PointsWindow,
};
use crate::rewards::{
    NewRedemption, NewReward, Redemption, RedemptionStatus, RedemptionStatusUpdate, Reward,
    RewardRepositoryTrait, RewardUpdate,
};
use crate::utils::{Clock, FixedClock};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
}

#[derive(Default)]
struct State {
    events: Vec<PointEvent>,
    balances: HashMap<(String, String), Balance>,
    members: Vec<GroupMember>,
    goals: Vec<Goal>,
    progress: HashMap<(String, String), GoalProgress>,
    rewards: Vec<Reward>,
    redemptions: Vec<Redemption>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn append(&mut self, entry: NewPointEvent) -> PointEvent {
        let key = (entry.user_id.clone(), entry.group_id.clone());
        let balance = self.balances.entry(key).or_insert_with(|| Balance {
            user_id: entry.user_id.clone(),
            group_id: entry.group_id.clone(),
            points: 0,
            updated_at: entry.created_at,
        });
        balance.points += entry.signed_amount();
        balance.updated_at = entry.created_at;

        let event = PointEvent {
            id: self.next_id("evt"),
            user_id: entry.user_id,
            group_id: entry.group_id,
            amount: entry.amount,
            kind: entry.kind,
            reason: entry.reason,
            reference_id: entry.reference_id,
            created_at: entry.created_at,
            created_by: entry.created_by,
        };
        self.events.push(event.clone());
        event
    }

    fn balance_of(&self, user_id: &str, group_id: &str) -> i64 {
        self.balances
            .get(&(user_id.to_string(), group_id.to_string()))
            .map(|b| b.points)
            .unwrap_or(0)
    }
}

pub struct InMemoryStore {
    state: Mutex<State>,
    pub clock: FixedClock,
    fail_writes: AtomicBool,
    failing_goals: Mutex<HashSet<String>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
            clock: FixedClock::new(t0()),
            fail_writes: AtomicBool::new(false),
            failing_goals: Mutex::new(HashSet::new()),
        })
    }

    /// Makes every subsequent write fail like an unavailable database.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes progress writes for one goal fail.
    pub fn fail_goal(&self, goal_id: &str) {
        self.failing_goals.lock().unwrap().insert(goal_id.to_string());
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::TransactionFailed("database is locked".into()).into());
        }
        Ok(())
    }

    pub fn add_member(&self, user_id: &str, group_id: &str) {
        self.state.lock().unwrap().members.push(GroupMember {
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
            is_admin: false,
            is_active: true,
            joined_at: t0(),
        });
    }

    pub fn seed_goal(&self, goal: Goal) {
        self.state.lock().unwrap().goals.push(goal);
    }

    pub fn seed_reward(&self, reward: Reward) {
        self.state.lock().unwrap().rewards.push(reward);
    }

    pub fn events(&self) -> Vec<PointEvent> {
        self.state.lock().unwrap().events.clone()
    }

    /// Σ Grant − Σ Spend over the raw events of a pair.
    pub fn ledger_total(&self, user_id: &str, group_id: &str) -> i64 {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.group_id == group_id)
            .map(PointEvent::signed_amount)
            .sum()
    }

    pub fn progress(&self, goal_id: &str, user_id: &str) -> Option<GoalProgress> {
        self.state
            .lock()
            .unwrap()
            .progress
            .get(&(goal_id.to_string(), user_id.to_string()))
            .cloned()
    }

    pub fn get_goal_completed_at(&self, goal_id: &str) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .unwrap()
            .goals
            .iter()
            .find(|g| g.id == goal_id)
            .and_then(|g| g.completed_at)
    }

    /// Overwrites a stored progress value, simulating drift.
    pub fn set_progress_points(&self, goal_id: &str, user_id: &str, points: i64) {
        if let Some(row) = self
            .state
            .lock()
            .unwrap()
            .progress
            .get_mut(&(goal_id.to_string(), user_id.to_string()))
        {
            row.current_points = points;
        }
    }
}

pub fn sample_goal(id: &str, group_id: &str, target: i64, bonus: Option<i64>) -> Goal {
    Goal {
        id: id.to_string(),
        group_id: group_id.to_string(),
        user_id: None,
        name: format!("Goal {}", id),
        description: None,
        category: "general".into(),
        target_points: target,
        start_date: None,
        end_date: None,
        reward_points: bonus,
        completed_at: None,
        is_active: true,
        created_by: "admin".into(),
        created_at: t0(),
        updated_at: t0(),
    }
}

pub fn sample_reward(id: &str, group_id: &str, cost: i64, max_redeems: Option<i64>) -> Reward {
    Reward {
        id: id.to_string(),
        group_id: group_id.to_string(),
        name: format!("Reward {}", id),
        description: None,
        category: "general".into(),
        points_cost: cost,
        max_redeems,
        times_redeemed: 0,
        is_active: true,
        created_by: "admin".into(),
        created_at: t0(),
        updated_at: t0(),
    }
}

#[async_trait]
impl LedgerWriter for InMemoryStore {
    async fn append(&self, event: NewPointEvent) -> Result<PointEvent> {
        self.check_writable()?;
        Ok(self.state.lock().unwrap().append(event))
    }
}

impl LedgerReader for InMemoryStore {
    fn get_balance(&self, user_id: &str, group_id: &str) -> Result<i64> {
        Ok(self.state.lock().unwrap().balance_of(user_id, group_id))
    }

    fn list_balances(&self, group_id: &str) -> Result<Vec<Balance>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .values()
            .filter(|b| b.group_id == group_id)
            .cloned()
            .collect())
    }

    fn list_events(&self, user_id: &str, group_id: &str) -> Result<Vec<PointEvent>> {
        let mut events: Vec<PointEvent> = self
            .state
            .lock()
            .unwrap()
            .events
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id && e.group_id == group_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    fn sum_points(
        &self,
        user_id: &str,
        group_id: &str,
        kind: PointEventKind,
        window: &PointsWindow,
    ) -> Result<i64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.group_id == group_id && e.kind == kind)
            .filter(|e| window.matches(e))
            .map(|e| e.amount)
            .sum())
    }

    fn sum_grants_by_user(
        &self,
        group_id: &str,
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, i64>> {
        let mut sums = HashMap::new();
        for e in self.state.lock().unwrap().events.iter() {
            if e.group_id == group_id && e.kind == PointEventKind::Grant && e.created_at >= since {
                *sums.entry(e.user_id.clone()).or_insert(0) += e.amount;
            }
        }
        Ok(sums)
    }
}

#[async_trait]
impl MembershipRepositoryTrait for InMemoryStore {
    fn list_active_group_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .members
            .iter()
            .filter(|m| m.is_active)
            .map(|m| m.group_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn list_active_member_ids(&self, group_id: &str) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .members
            .iter()
            .filter(|m| m.is_active && m.group_id == group_id)
            .map(|m| m.user_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn get_member(&self, user_id: &str, group_id: &str) -> Result<Option<GroupMember>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .members
            .iter()
            .find(|m| m.user_id == user_id && m.group_id == group_id)
            .cloned())
    }

    async fn upsert_member(&self, member: NewGroupMember) -> Result<GroupMember> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        state
            .members
            .retain(|m| !(m.user_id == member.user_id && m.group_id == member.group_id));
        let row = GroupMember {
            user_id: member.user_id,
            group_id: member.group_id,
            is_admin: member.is_admin,
            is_active: true,
            joined_at: self.clock.now(),
        };
        state.members.push(row.clone());
        Ok(row)
    }

    async fn deactivate_member(&self, user_id: &str, group_id: &str) -> Result<usize> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let mut changed = 0;
        for m in state
            .members
            .iter_mut()
            .filter(|m| m.user_id == user_id && m.group_id == group_id && m.is_active)
        {
            m.is_active = false;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl GoalRepositoryTrait for InMemoryStore {
    async fn insert_new_goal(&self, new_goal: NewGoal) -> Result<Goal> {
        self.check_writable()?;
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        let category = new_goal.category_or_default();
        let goal = Goal {
            id: new_goal.id.unwrap_or_else(|| state.next_id("goal")),
            group_id: new_goal.group_id,
            user_id: new_goal.user_id,
            name: new_goal.name,
            description: new_goal.description,
            category,
            target_points: new_goal.target_points,
            start_date: new_goal.start_date,
            end_date: new_goal.end_date,
            reward_points: new_goal.reward_points,
            completed_at: None,
            is_active: true,
            created_by: new_goal.created_by,
            created_at: now,
            updated_at: now,
        };
        state.goals.push(goal.clone());
        Ok(goal)
    }

    async fn update_goal(&self, goal_update: GoalUpdate) -> Result<Goal> {
        self.check_writable()?;
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        let goal = state
            .goals
            .iter_mut()
            .find(|g| g.id == goal_update.id)
            .ok_or_else(|| Error::not_found("Goal", &goal_update.id))?;
        goal.name = goal_update.name;
        goal.description = goal_update.description;
        if let Some(category) = goal_update.category {
            goal.category = category;
        }
        goal.target_points = goal_update.target_points;
        goal.start_date = goal_update.start_date;
        goal.end_date = goal_update.end_date;
        goal.reward_points = goal_update.reward_points;
        goal.updated_at = now;
        Ok(goal.clone())
    }

    async fn deactivate_goal(&self, goal_id: &str) -> Result<usize> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let mut changed = 0;
        for g in state.goals.iter_mut().filter(|g| g.id == goal_id) {
            g.is_active = false;
            changed += 1;
        }
        Ok(changed)
    }

    fn get_goal(&self, goal_id: &str) -> Result<Goal> {
        self.state
            .lock()
            .unwrap()
            .goals
            .iter()
            .find(|g| g.id == goal_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Goal", goal_id))
    }

    fn list_goals_for_user(&self, group_id: &str, user_id: &str) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = self
            .state
            .lock()
            .unwrap()
            .goals
            .iter()
            .filter(|g| g.is_active && g.group_id == group_id && g.applies_to(user_id))
            .cloned()
            .collect();
        goals.sort_by(|a, b| {
            (a.end_date.is_none(), a.end_date, a.target_points).cmp(&(
                b.end_date.is_none(),
                b.end_date,
                b.target_points,
            ))
        });
        Ok(goals)
    }

    fn list_active_goals(&self, group_id: &str) -> Result<Vec<Goal>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .goals
            .iter()
            .filter(|g| g.is_active && g.group_id == group_id)
            .cloned()
            .collect())
    }

    fn get_progress(&self, goal_id: &str, user_id: &str) -> Result<Option<GoalProgress>> {
        Ok(self.progress(goal_id, user_id))
    }

    fn list_user_progress(&self, user_id: &str, group_id: &str) -> Result<Vec<GoalProgress>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .progress
            .values()
            .filter(|p| p.user_id == user_id && p.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn apply_progress(&self, update: ProgressUpdate) -> Result<Option<ProgressOutcome>> {
        self.check_writable()?;
        if self.failing_goals.lock().unwrap().contains(&update.goal.id) {
            return Err(DatabaseError::QueryFailed("disk I/O error".into()).into());
        }

        let mut state = self.state.lock().unwrap();
        let key = (update.goal.id.clone(), update.user_id.clone());
        let previous = state.progress.get(&key).cloned();

        let (current_points, progress_percent, reaches_target) =
            match evaluate_progress(&update, previous.as_ref(), |goal, user_id| {
                Ok(goal.sum_for_user(user_id, &state.events))
            })? {
                ProgressEvaluation::Frozen => return Ok(None),
                ProgressEvaluation::Update {
                    current_points,
                    progress_percent,
                    reaches_target,
                } => (current_points, progress_percent, reaches_target),
            };

        let mut row = GoalProgress {
            goal_id: update.goal.id.clone(),
            user_id: update.user_id.clone(),
            group_id: update.goal.group_id.clone(),
            current_points,
            progress_percent,
            completed_at: None,
            updated_at: update.at,
        };

        let mut bonus_event = None;
        if reaches_target {
            row.completed_at = Some(update.at);
            let bonus = update.goal.bonus_points();
            if bonus > 0 {
                bonus_event = Some(state.append(NewPointEvent::goal_bonus(
                    &update.goal.id,
                    &update.user_id,
                    &update.goal.group_id,
                    bonus,
                    &update.actor_id,
                    update.at,
                )));
            }
            if let Some(goal) = state.goals.iter_mut().find(|g| g.id == update.goal.id) {
                goal.completed_at.get_or_insert(update.at);
            }
        }

        state.progress.insert(key, row.clone());
        Ok(Some(ProgressOutcome {
            progress: row,
            newly_completed: reaches_target,
            bonus_event,
        }))
    }
}

#[async_trait]
impl RewardRepositoryTrait for InMemoryStore {
    async fn insert_new_reward(&self, new_reward: NewReward) -> Result<Reward> {
        self.check_writable()?;
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        let category = new_reward.category_or_default();
        let reward = Reward {
            id: new_reward.id.unwrap_or_else(|| state.next_id("reward")),
            group_id: new_reward.group_id,
            name: new_reward.name,
            description: new_reward.description,
            category,
            points_cost: new_reward.points_cost,
            max_redeems: new_reward.max_redeems,
            times_redeemed: 0,
            is_active: true,
            created_by: new_reward.created_by,
            created_at: now,
            updated_at: now,
        };
        state.rewards.push(reward.clone());
        Ok(reward)
    }

    async fn update_reward(&self, reward_update: RewardUpdate) -> Result<Reward> {
        self.check_writable()?;
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        let category = reward_update.category_or_default();
        let reward = state
            .rewards
            .iter_mut()
            .find(|r| r.id == reward_update.id)
            .ok_or_else(|| Error::not_found("Reward", &reward_update.id))?;
        reward.name = reward_update.name;
        reward.description = reward_update.description;
        reward.category = category;
        reward.points_cost = reward_update.points_cost;
        reward.max_redeems = reward_update.max_redeems;
        reward.updated_at = now;
        Ok(reward.clone())
    }

    async fn deactivate_reward(&self, reward_id: &str) -> Result<usize> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let mut changed = 0;
        for r in state.rewards.iter_mut().filter(|r| r.id == reward_id) {
            r.is_active = false;
            changed += 1;
        }
        Ok(changed)
    }

    fn get_reward(&self, reward_id: &str) -> Result<Reward> {
        self.state
            .lock()
            .unwrap()
            .rewards
            .iter()
            .find(|r| r.id == reward_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Reward", reward_id))
    }

    fn list_active_rewards(&self, group_id: &str) -> Result<Vec<Reward>> {
        let mut rewards: Vec<Reward> = self
            .state
            .lock()
            .unwrap()
            .rewards
            .iter()
            .filter(|r| r.is_active && r.group_id == group_id)
            .cloned()
            .collect();
        rewards.sort_by(|a, b| a.points_cost.cmp(&b.points_cost).then(a.name.cmp(&b.name)));
        Ok(rewards)
    }

    async fn create_redemption(&self, redemption: NewRedemption) -> Result<Redemption> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();

        let reward = state
            .rewards
            .iter()
            .find(|r| r.id == redemption.reward_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Reward", &redemption.reward_id))?;
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
        let available = state.balance_of(&redemption.user_id, &redemption.group_id);
        if available < redemption.points {
            return Err(PreconditionError::InsufficientBalance {
                required: redemption.points,
                available,
            }
            .into());
        }

        let row = Redemption {
            id: state.next_id("redemption"),
            reward_id: redemption.reward_id.clone(),
            user_id: redemption.user_id.clone(),
            group_id: redemption.group_id.clone(),
            points: redemption.points,
            status: RedemptionStatus::Pending,
            notes: None,
            created_at: redemption.created_at,
            updated_at: redemption.created_at,
        };
        state.append(NewPointEvent::redemption(
            &row.id,
            &row.user_id,
            &row.group_id,
            row.points,
            row.created_at,
        ));
        if let Some(r) = state.rewards.iter_mut().find(|r| r.id == row.reward_id) {
            r.times_redeemed += 1;
        }
        state.redemptions.push(row.clone());
        Ok(row)
    }

    fn get_redemption(&self, redemption_id: &str) -> Result<Redemption> {
        self.state
            .lock()
            .unwrap()
            .redemptions
            .iter()
            .find(|r| r.id == redemption_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Redemption", redemption_id))
    }

    async fn update_redemption_status(
        &self,
        update: RedemptionStatusUpdate,
    ) -> Result<Redemption> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .redemptions
            .iter_mut()
            .find(|r| r.id == update.redemption_id)
            .ok_or_else(|| Error::not_found("Redemption", &update.redemption_id))?;
        if row.status != update.from {
            return Err(PreconditionError::InvalidStatusTransition {
                from: row.status.to_string(),
                to: update.to.to_string(),
            }
            .into());
        }
        row.status = update.to;
        if update.notes.is_some() {
            row.notes = update.notes;
        }
        row.updated_at = update.updated_at;
        Ok(row.clone())
    }

    fn list_user_redemptions(&self, user_id: &str, group_id: &str) -> Result<Vec<Redemption>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .redemptions
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id && r.group_id == group_id)
            .cloned()
            .collect())
    }

    fn list_group_redemptions(
        &self,
        group_id: &str,
        status: Option<RedemptionStatus>,
    ) -> Result<Vec<Redemption>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .redemptions
            .iter()
            .rev()
            .filter(|r| r.group_id == group_id)
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .cloned()
            .collect())
    }
}
