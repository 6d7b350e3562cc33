//! Goals module - domain models, services, and traits.

mod goals_model;
mod goals_progress_service;
mod goals_service;
mod goals_traits;


pub use goals_model::{
    evaluate_progress, progress_percent, Goal, GoalProgress, GoalUpdate, NewGoal,
    ProgressChange, ProgressEvaluation, ProgressOutcome, ProgressUpdate,
};
pub use goals_progress_service::GoalProgressService;
pub use goals_service::GoalService;
pub use goals_traits::{GoalProgressServiceTrait, GoalRepositoryTrait, GoalServiceTrait};
