//! Reconciliation module - periodic recomputation of goal progress.

mod reconciler;
mod scheduler;


pub use reconciler::{GoalReconciler, ReconcileReport};
pub use scheduler::{start_reconciler, ReconcileSchedule, ReconcilerHandle};
