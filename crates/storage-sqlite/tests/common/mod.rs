#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use circlepoints_core::events::RecordingEventSink;
use circlepoints_core::goals::{GoalProgressService, GoalService};
use circlepoints_core::groups::{MembershipRepositoryTrait, NewGroupMember};
use circlepoints_core::leaderboard::LeaderboardService;
use circlepoints_core::points::PointsService;
use circlepoints_core::rewards::RewardService;
use circlepoints_core::utils::FixedClock;
use circlepoints_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, DbPool, GoalRepository, LedgerRepository,
    MembershipRepository, RewardRepository,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
}

/// Services wired against a fresh on-disk database.
pub struct Harness {
    pub pool: Arc<DbPool>,
    pub clock: FixedClock,
    pub sink: RecordingEventSink,
    pub ledger: Arc<LedgerRepository>,
    pub membership: Arc<MembershipRepository>,
    pub goal_repo: Arc<GoalRepository>,
    pub reward_repo: Arc<RewardRepository>,
    pub points: PointsService,
    pub goals: GoalService,
    pub progress: Arc<GoalProgressService>,
    pub rewards: RewardService,
    pub leaderboard: LeaderboardService,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempdir().expect("temp dir");
        let db_path = init(&dir.path().join("circle.db").to_string_lossy()).expect("init");
        let pool = create_pool(&db_path).expect("pool");
        run_migrations(&pool).expect("migrations");
        let writer = spawn_writer((*pool).clone());

        let clock = FixedClock::new(t0());
        let sink = RecordingEventSink::new();

        let ledger = Arc::new(LedgerRepository::new(pool.clone(), writer.clone()));
        let membership = Arc::new(MembershipRepository::new(pool.clone(), writer.clone()));
        let goal_repo = Arc::new(GoalRepository::new(pool.clone(), writer.clone()));
        let reward_repo = Arc::new(RewardRepository::new(pool.clone(), writer));

        let points = PointsService::new(
            ledger.clone(),
            ledger.clone(),
            Arc::new(sink.clone()),
            Arc::new(clock.clone()),
        );
        let goals = GoalService::new(goal_repo.clone());
        let progress = Arc::new(GoalProgressService::new(
            goal_repo.clone(),
            membership.clone(),
            Arc::new(sink.clone()),
            Arc::new(clock.clone()),
        ));
        let rewards = RewardService::new(
            reward_repo.clone(),
            ledger.clone(),
            Arc::new(sink.clone()),
            Arc::new(clock.clone()),
        );
        let leaderboard =
            LeaderboardService::new(membership.clone(), ledger.clone(), Arc::new(clock.clone()));

        Self {
            pool,
            clock,
            sink,
            ledger,
            membership,
            goal_repo,
            reward_repo,
            points,
            goals,
            progress,
            rewards,
            leaderboard,
            _dir: dir,
        }
    }

    pub async fn join(&self, user_id: &str, group_id: &str) {
        self.membership
            .upsert_member(NewGroupMember {
                user_id: user_id.to_string(),
                group_id: group_id.to_string(),
                is_admin: false,
            })
            .await
            .expect("join group");
    }
}
