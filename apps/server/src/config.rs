use std::time::Duration;

use circlepoints_core::reconciliation::ReconcileSchedule;

/// Runtime settings, read from `CP_*` environment variables (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: String,
    pub pool_size: u32,
    pub write_timeout: Duration,
    pub reconcile_interval: Duration,
    pub reconcile_initial_delay: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, default: u64| -> u64 {
            get(key)
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(default)
        };

        let db_path = get("CP_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "./db/circlepoints.db".into());
        let pool_size = u32::try_from(number("CP_POOL_SIZE", 8)).unwrap_or(8);

        Self {
            db_path,
            pool_size,
            write_timeout: Duration::from_millis(number("CP_WRITE_TIMEOUT_MS", 30_000)),
            reconcile_interval: Duration::from_secs(
                number("CP_RECONCILE_INTERVAL_SECS", 3600).max(1),
            ),
            reconcile_initial_delay: Duration::from_secs(number(
                "CP_RECONCILE_INITIAL_DELAY_SECS",
                60,
            )),
        }
    }

    pub fn reconcile_schedule(&self) -> ReconcileSchedule {
        ReconcileSchedule {
            interval: self.reconcile_interval,
            initial_delay: self.reconcile_initial_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.db_path, "./db/circlepoints.db");
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.write_timeout, Duration::from_secs(30));
        assert_eq!(config.reconcile_schedule(), ReconcileSchedule::default());
    }

    #[test]
    fn values_are_read_and_bad_numbers_fall_back() {
        let config = config_from(&[
            ("CP_DB_PATH", "/var/lib/cp/points.db"),
            ("CP_POOL_SIZE", "4"),
            ("CP_WRITE_TIMEOUT_MS", "not-a-number"),
            ("CP_RECONCILE_INTERVAL_SECS", "0"),
            ("CP_RECONCILE_INITIAL_DELAY_SECS", " 5 "),
        ]);
        assert_eq!(config.db_path, "/var/lib/cp/points.db");
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.write_timeout, Duration::from_secs(30));
        assert_eq!(config.reconcile_interval, Duration::from_secs(1));
        assert_eq!(config.reconcile_initial_delay, Duration::from_secs(5));
    }
}
