/// Actor recorded on ledger entries the system writes on its own behalf
/// (goal completion bonuses).
pub const SYSTEM_ACTOR_ID: &str = "system";

/// Leaderboard size when the caller does not ask for one.
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

/// Largest leaderboard a caller may request.
pub const MAX_LEADERBOARD_LIMIT: i64 = 50;

/// Trailing window for "points this week".
pub const WEEK_WINDOW_DAYS: i64 = 7;

/// Trailing window for "points this month".
pub const MONTH_WINDOW_DAYS: i64 = 30;

/// Category assigned to rewards and goals created without one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Default reconciliation interval: one sweep per hour.
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 60 * 60;
