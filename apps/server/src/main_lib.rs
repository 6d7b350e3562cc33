use std::sync::Arc;

use circlepoints_core::{
    goals::{GoalProgressService, GoalProgressServiceTrait, GoalService, GoalServiceTrait},
    groups::MembershipRepositoryTrait,
    leaderboard::{LeaderboardService, LeaderboardServiceTrait},
    points::{PointsService, PointsServiceTrait},
    reconciliation::GoalReconciler,
    rewards::{RewardService, RewardServiceTrait},
    utils::{Clock, SystemClock},
};
use circlepoints_storage_sqlite::{
    create_pool_with_size, init, run_migrations, spawn_writer_with_timeout, GoalRepository,
    LedgerRepository, MembershipRepository, RewardRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::Config, domain_events::ServerDomainEventSink};

/// The wired service graph of a running instance.
pub struct AppState {
    pub db_path: String,
    /// Kept so the sink outlives every service that emits into it.
    #[allow(dead_code)]
    pub domain_event_sink: Arc<ServerDomainEventSink>,
    #[allow(dead_code)]
    pub points_service: Arc<dyn PointsServiceTrait>,
    #[allow(dead_code)]
    pub goal_service: Arc<dyn GoalServiceTrait>,
    #[allow(dead_code)]
    pub goal_progress_service: Arc<dyn GoalProgressServiceTrait>,
    #[allow(dead_code)]
    pub reward_service: Arc<dyn RewardServiceTrait>,
    #[allow(dead_code)]
    pub leaderboard_service: Arc<dyn LeaderboardServiceTrait>,
    pub membership_repository: Arc<dyn MembershipRepositoryTrait>,
    pub reconciler: Arc<GoalReconciler>,
}

/// Installs the global subscriber. `log` records from the library crates are
/// forwarded to it as well.
pub fn init_tracing() {
    let log_format = std::env::var("CP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = create_pool_with_size(&db_path, config.pool_size)?;
    run_migrations(&pool)?;
    let writer = spawn_writer_with_timeout((*pool).clone(), config.write_timeout);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    // Domain event sink - phase 1: services emit into it before the worker runs
    let domain_event_sink = Arc::new(ServerDomainEventSink::new());

    let ledger_repository = Arc::new(LedgerRepository::new(pool.clone(), writer.clone()));
    let membership_repository = Arc::new(MembershipRepository::new(pool.clone(), writer.clone()));
    let goal_repository = Arc::new(GoalRepository::new(pool.clone(), writer.clone()));
    let reward_repository = Arc::new(RewardRepository::new(pool.clone(), writer));

    let points_service: Arc<dyn PointsServiceTrait> = Arc::new(PointsService::new(
        ledger_repository.clone(),
        ledger_repository.clone(),
        domain_event_sink.clone(),
        clock.clone(),
    ));
    let goal_service: Arc<dyn GoalServiceTrait> =
        Arc::new(GoalService::new(goal_repository.clone()));
    let goal_progress_service: Arc<dyn GoalProgressServiceTrait> =
        Arc::new(GoalProgressService::new(
            goal_repository.clone(),
            membership_repository.clone(),
            domain_event_sink.clone(),
            clock.clone(),
        ));
    let reward_service: Arc<dyn RewardServiceTrait> = Arc::new(RewardService::new(
        reward_repository,
        ledger_repository.clone(),
        domain_event_sink.clone(),
        clock.clone(),
    ));
    let leaderboard_service: Arc<dyn LeaderboardServiceTrait> = Arc::new(LeaderboardService::new(
        membership_repository.clone(),
        ledger_repository,
        clock,
    ));

    let reconciler = Arc::new(GoalReconciler::new(
        membership_repository.clone(),
        goal_repository,
        goal_progress_service.clone(),
    ));

    // Domain event sink - phase 2: the progress engine exists now
    domain_event_sink.start_worker(goal_progress_service.clone());

    Ok(Arc::new(AppState {
        db_path,
        domain_event_sink,
        points_service,
        goal_service,
        goal_progress_service,
        reward_service,
        leaderboard_service,
        membership_repository,
        reconciler,
    }))
}
