//! Full sweep that re-derives goal progress from the ledger.

use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::goals::{GoalProgressServiceTrait, GoalRepositoryTrait};
use crate::groups::MembershipRepositoryTrait;

/// Counters from one reconciliation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub groups_scanned: usize,
    pub goals_scanned: usize,
    /// Progress rows written (completed rows are skipped and not counted).
    pub progress_updated: usize,
    pub goals_completed: usize,
    /// Groups or goals that failed and were skipped.
    pub failures: usize,
}

/// Walks every active group and goal and recomputes progress.
///
/// Groups and goals are processed one at a time. A failing group or goal is
/// logged and skipped; the next sweep retries it.
pub struct GoalReconciler {
    membership: Arc<dyn MembershipRepositoryTrait>,
    goal_repo: Arc<dyn GoalRepositoryTrait>,
    engine: Arc<dyn GoalProgressServiceTrait>,
}

impl GoalReconciler {
    pub fn new(
        membership: Arc<dyn MembershipRepositoryTrait>,
        goal_repo: Arc<dyn GoalRepositoryTrait>,
        engine: Arc<dyn GoalProgressServiceTrait>,
    ) -> Self {
        Self {
            membership,
            goal_repo,
            engine,
        }
    }

    pub async fn run_sweep(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let group_ids = match self.membership.list_active_group_ids() {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Reconciliation skipped: could not list groups: {}", e);
                report.failures += 1;
                return report;
            }
        };

        for group_id in group_ids {
            report.groups_scanned += 1;
            let goals = match self.goal_repo.list_active_goals(&group_id) {
                Ok(goals) => goals,
                Err(e) => {
                    warn!("Skipping group {}: could not list goals: {}", group_id, e);
                    report.failures += 1;
                    continue;
                }
            };

            for goal in goals {
                report.goals_scanned += 1;
                match self.engine.recompute_goal(&goal).await {
                    Ok(outcomes) => {
                        report.progress_updated += outcomes.len();
                        report.goals_completed +=
                            outcomes.iter().filter(|o| o.newly_completed).count();
                    }
                    Err(e) => {
                        warn!(
                            "Failed to reconcile goal {} in group {}: {}",
                            goal.id, group_id, e
                        );
                        report.failures += 1;
                    }
                }
            }
            debug!("Reconciled group {}", group_id);
        }

        info!(
            "Goal reconciliation finished: {} groups, {} goals, {} rows, {} completions, {} failures",
            report.groups_scanned,
            report.goals_scanned,
            report.progress_updated,
            report.goals_completed,
            report.failures
        );
        report
    }
}
