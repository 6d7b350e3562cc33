//! Event queue worker for processing domain events.
//!
//! Receives events from an mpsc channel, debounces them with a short window,
//! then applies the awarded points of the batch to goal progress.

use std::sync::Arc;
use std::time::Duration;

use circlepoints_core::events::DomainEvent;
use circlepoints_core::goals::GoalProgressServiceTrait;
use tokio::sync::mpsc;

use super::planner::plan_progress_increments;

/// Debounce window for collecting events before processing.
const DEBOUNCE_DURATION: Duration = Duration::from_millis(250);

/// Runs the event queue worker until the channel closes.
///
/// A batch is processed inline, so batches never overlap. Events that arrive
/// meanwhile are buffered by the channel and form the next batch.
pub async fn event_queue_worker(
    mut rx: mpsc::UnboundedReceiver<DomainEvent>,
    progress_service: Arc<dyn GoalProgressServiceTrait>,
) {
    tracing::info!("Domain event queue worker started");

    let mut pending_events: Vec<DomainEvent> = Vec::new();

    loop {
        if pending_events.is_empty() {
            match rx.recv().await {
                Some(e) => pending_events.push(e),
                None => break,
            }
            continue;
        }

        tokio::select! {
            event = rx.recv() => match event {
                Some(e) => pending_events.push(e),
                None => {
                    process_event_batch(&pending_events, progress_service.as_ref()).await;
                    pending_events.clear();
                    break;
                }
            },
            _ = tokio::time::sleep(DEBOUNCE_DURATION) => {
                let batch = std::mem::take(&mut pending_events);
                process_event_batch(&batch, progress_service.as_ref()).await;
            }
        }
    }

    tracing::info!("Domain event queue worker shutting down");
}

/// Processes a batch of domain events.
async fn process_event_batch(
    events: &[DomainEvent],
    progress_service: &dyn GoalProgressServiceTrait,
) {
    tracing::debug!("Processing batch of {} domain event(s)", events.len());

    for event in events {
        match serde_json::to_string(event) {
            Ok(payload) => tracing::debug!(target: "circlepoints::events", "{}", payload),
            Err(e) => tracing::warn!("Unserializable domain event: {}", e),
        }
        if let DomainEvent::GoalCompleted {
            goal_id,
            user_id,
            bonus_points,
            ..
        } = event
        {
            tracing::info!(
                "Goal {} completed by {} (bonus {})",
                goal_id,
                user_id,
                bonus_points
            );
        }
    }

    for increment in plan_progress_increments(events) {
        match progress_service
            .apply_points_awarded(
                &increment.user_id,
                &increment.group_id,
                increment.amount,
                increment.awarded_at,
            )
            .await
        {
            Ok(outcomes) => {
                let completed = outcomes.iter().filter(|o| o.newly_completed).count();
                tracing::debug!(
                    "Applied {} point(s) for {} in {}: {} goal(s) updated, {} completed",
                    increment.amount,
                    increment.user_id,
                    increment.group_id,
                    outcomes.len(),
                    completed
                );
            }
            // The reconciler re-derives this progress on its next sweep.
            Err(e) => tracing::warn!(
                "Goal progress update failed for {} in {}: {}",
                increment.user_id,
                increment.group_id,
                e
            ),
        }
    }
}
