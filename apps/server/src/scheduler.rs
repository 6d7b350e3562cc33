//! Background scheduler for the periodic goal reconciliation sweep.

use circlepoints_core::reconciliation::{start_reconciler, ReconcilerHandle};
use tracing::info;

use crate::config::Config;
use crate::main_lib::AppState;

/// Starts the reconciler loop. Stop it through the returned handle.
pub fn start_reconcile_scheduler(state: &AppState, config: &Config) -> ReconcilerHandle {
    let schedule = config.reconcile_schedule();
    info!(
        "Scheduling goal reconciliation every {}s (first sweep in {}s)",
        schedule.interval.as_secs(),
        schedule.initial_delay.as_secs()
    );
    start_reconciler(state.reconciler.clone(), schedule)
}
