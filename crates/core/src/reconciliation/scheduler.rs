//! Periodic driver for [`GoalReconciler`] with a cooperative stop.

use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

use super::reconciler::GoalReconciler;
use crate::constants::DEFAULT_RECONCILE_INTERVAL_SECS;

/// Timing of the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSchedule {
    pub interval: Duration,
    /// Delay before the first sweep, so startup is not slowed down.
    pub initial_delay: Duration,
}

impl Default for ReconcileSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS),
            initial_delay: Duration::from_secs(60),
        }
    }
}

/// Handle to a running reconciliation loop.
pub struct ReconcilerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Requests a stop and waits for the loop to exit.
    ///
    /// A sweep already in progress runs to completion first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns the reconciliation loop on the current tokio runtime.
pub fn start_reconciler(
    reconciler: Arc<GoalReconciler>,
    schedule: ReconcileSchedule,
) -> ReconcilerHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!(
            "Goal reconciler started ({}s interval)",
            schedule.interval.as_secs()
        );

        tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                info!("Goal reconciler stopped before first sweep");
                return;
            }
            _ = sleep(schedule.initial_delay) => {}
        }

        let mut ticker = interval(schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }
            // Outside the select so a stop request never cancels a sweep midway.
            reconciler.run_sweep().await;
        }

        info!("Goal reconciler stopped");
    });

    ReconcilerHandle { stop_tx, task }
}
