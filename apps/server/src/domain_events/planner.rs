//! Planning functions for batches of domain events.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use circlepoints_core::events::DomainEvent;

/// Points granted to one member of one group at one ledger timestamp within
/// a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressIncrement {
    pub user_id: String,
    pub group_id: String,
    pub amount: i64,
    pub awarded_at: DateTime<Utc>,
}

/// Folds the `PointsAwarded` events of a batch into one increment per
/// (user, group, award timestamp), in order of first appearance. Awards with
/// different timestamps stay apart so each is matched against the goal
/// windows it was granted in.
///
/// Deductions, redemptions and completions never move goal progress.
pub fn plan_progress_increments(events: &[DomainEvent]) -> Vec<ProgressIncrement> {
    let mut increments: Vec<ProgressIncrement> = Vec::new();
    let mut index: HashMap<(String, String, DateTime<Utc>), usize> = HashMap::new();

    for event in events {
        let DomainEvent::PointsAwarded {
            user_id,
            group_id,
            amount,
            awarded_at,
        } = event
        else {
            continue;
        };
        if *amount <= 0 || user_id.is_empty() || group_id.is_empty() {
            continue;
        }

        let key = (user_id.clone(), group_id.clone(), *awarded_at);
        match index.get(&key) {
            Some(&i) => increments[i].amount += amount,
            None => {
                index.insert(key, increments.len());
                increments.push(ProgressIncrement {
                    user_id: user_id.clone(),
                    group_id: group_id.clone(),
                    amount: *amount,
                    awarded_at: *awarded_at,
                });
            }
        }
    }

    increments
}
