use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use super::points_model::{NewPointEvent, PointEvent};
use super::points_traits::{LedgerReader, LedgerWriter, PointsServiceTrait};
use crate::errors::{Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::utils::Clock;

/// Service that owns every standalone ledger write.
pub struct PointsService {
    reader: Arc<dyn LedgerReader>,
    writer: Arc<dyn LedgerWriter>,
    event_sink: Arc<dyn DomainEventSink>,
    clock: Arc<dyn Clock>,
}

impl PointsService {
    pub fn new(
        reader: Arc<dyn LedgerReader>,
        writer: Arc<dyn LedgerWriter>,
        event_sink: Arc<dyn DomainEventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader,
            writer,
            event_sink,
            clock,
        }
    }

    fn require_ids(user_id: &str, group_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("userId".to_string()).into());
        }
        if group_id.trim().is_empty() {
            return Err(ValidationError::MissingField("groupId".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl PointsServiceTrait for PointsService {
    async fn award(
        &self,
        user_id: &str,
        group_id: &str,
        amount: i64,
        actor_id: &str,
    ) -> Result<PointEvent> {
        let entry = NewPointEvent::award(user_id, group_id, amount, actor_id, self.clock.now());
        entry.validate()?;

        let event = self.writer.append(entry).await?;
        debug!(
            "Awarded {} points to {} in group {} (by {})",
            amount, user_id, group_id, actor_id
        );
        self.event_sink
            .emit(DomainEvent::points_awarded(
                user_id,
                group_id,
                amount,
                event.created_at,
            ));
        Ok(event)
    }

    async fn deduct(
        &self,
        user_id: &str,
        group_id: &str,
        amount: i64,
        actor_id: &str,
    ) -> Result<PointEvent> {
        let entry =
            NewPointEvent::deduction(user_id, group_id, amount, actor_id, self.clock.now());
        entry.validate()?;

        let event = self.writer.append(entry).await?;
        debug!(
            "Deducted {} points from {} in group {} (by {})",
            amount, user_id, group_id, actor_id
        );
        self.event_sink
            .emit(DomainEvent::points_deducted(user_id, group_id, amount));
        Ok(event)
    }

    fn get_balance(&self, user_id: &str, group_id: &str) -> Result<i64> {
        Self::require_ids(user_id, group_id)?;
        self.reader.get_balance(user_id, group_id)
    }

    fn list_history(&self, user_id: &str, group_id: &str) -> Result<Vec<PointEvent>> {
        Self::require_ids(user_id, group_id)?;
        self.reader.list_events(user_id, group_id)
    }
}
