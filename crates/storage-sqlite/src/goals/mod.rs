//! SQLite storage implementation for goals and per-member goal progress.

mod model;
mod repository;

pub use model::{GoalDB, GoalProgressDB, NewGoalDB};
pub use repository::GoalRepository;
