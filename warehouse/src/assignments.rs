//! Assignment Tracker.
//!
//! Loans of variant stock to players. An assignment starts `assigned` and
//! moves once to `returned`; `pending` is declared but no flow produces it.
//! Both transitions go through the [`MovementProcessor`] so the ledger and
//! the stock count move together.

use crate::error::{Entity, Result, WarehouseError};
use crate::gateway::InventoryGateway;
use crate::messages::Messages;
use crate::movements::MovementProcessor;
use crate::requests::{AssignItemRequest, AssignmentQuery, RecordMovementRequest};
use crate::types::{
    AssignmentId, AssignmentStatus, ItemAssignment, MovementType, PlayerId, ReturnedCondition,
};
use chrono::{DateTime, Utc};
use kitroom_core::notify::{NotificationLevel, Notifier};
use std::sync::Arc;

/// Opens and closes player loans.
#[derive(Clone)]
pub struct AssignmentTracker {
    gateway: InventoryGateway,
    processor: MovementProcessor,
    notifier: Arc<dyn Notifier>,
    messages: Messages,
}

impl AssignmentTracker {
    /// Create a tracker sharing the processor's gateway.
    #[must_use]
    pub fn new(
        gateway: InventoryGateway,
        processor: MovementProcessor,
        notifier: Arc<dyn Notifier>,
        messages: Messages,
    ) -> Self {
        Self {
            gateway,
            processor,
            notifier,
            messages,
        }
    }

    /// Loan stock to a player, dated now.
    ///
    /// Decrements the variant's stock and records an `assign` movement.
    ///
    /// # Errors
    ///
    /// - [`WarehouseError::Validation`] for a non-positive quantity, a bad
    ///   expected return date, or more units than are in stock
    /// - [`WarehouseError::NotFound`] for an unknown variant or player
    /// - [`WarehouseError::Query`] if the store fails
    pub async fn assign(&self, request: AssignItemRequest) -> Result<ItemAssignment> {
        let result = self.open(request).await;
        match &result {
            Ok(_) => self
                .notifier
                .notify(NotificationLevel::Success, &self.messages.item_assigned()),
            Err(e) => self
                .notifier
                .notify(NotificationLevel::Error, &self.messages.assign_failed(e)),
        }
        result
    }

    async fn open(&self, request: AssignItemRequest) -> Result<ItemAssignment> {
        let now = self.gateway.now();
        request.validate(now)?;

        let variant = self.gateway.get_variant(request.variant_id).await?;
        let outcome = self
            .processor
            .apply(request.into_movement(variant.base_item_id, now))
            .await?;

        outcome.assignment.ok_or_else(|| {
            WarehouseError::not_found(Entity::Assignment, outcome.movement.id)
        })
    }

    /// Close an open loan, dated now, and put the stock back.
    ///
    /// Returning twice is an error, not a no-op.
    ///
    /// # Errors
    ///
    /// - [`WarehouseError::NotFound`] if the assignment is absent or already
    ///   returned
    /// - [`WarehouseError::Query`] if the store fails
    pub async fn mark_returned(
        &self,
        id: AssignmentId,
        condition: ReturnedCondition,
    ) -> Result<ItemAssignment> {
        let result = self.close(id, condition).await;
        match &result {
            Ok(_) => self
                .notifier
                .notify(NotificationLevel::Success, &self.messages.item_returned()),
            Err(e) => self
                .notifier
                .notify(NotificationLevel::Error, &self.messages.return_failed(e)),
        }
        result
    }

    async fn close(&self, id: AssignmentId, condition: ReturnedCondition) -> Result<ItemAssignment> {
        let assignment = self.gateway.get_assignment(id).await?;
        if !assignment.is_outstanding() {
            return Err(WarehouseError::not_found(Entity::OpenAssignment, id));
        }

        let request = RecordMovementRequest {
            base_item_id: assignment.base_item_id,
            variant_id: Some(assignment.variant_id),
            movement_type: MovementType::Return,
            quantity: i64::from(assignment.quantity),
            date: Some(self.gateway.now()),
            note: None,
            player_id: Some(assignment.player_id),
            assignment_id: Some(id),
            expected_return_date: None,
            returned_condition: Some(condition),
        };
        let outcome = self.processor.apply(request).await?;

        outcome
            .assignment
            .ok_or_else(|| WarehouseError::not_found(Entity::Assignment, id))
    }

    /// A single assignment in any state.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotFound`] if the id is absent, or
    /// [`WarehouseError::Query`] if the store fails.
    pub async fn get(&self, id: AssignmentId) -> Result<ItemAssignment> {
        self.gateway.get_assignment(id).await
    }

    /// Assignments matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the store fails.
    pub async fn list(&self, query: &AssignmentQuery) -> Result<Vec<ItemAssignment>> {
        self.gateway.list_assignments(query).await
    }

    /// Loans a player has not returned yet, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the store fails.
    pub async fn outstanding_for_player(&self, player_id: PlayerId) -> Result<Vec<ItemAssignment>> {
        let query = AssignmentQuery {
            player_id: Some(player_id),
            status: Some(AssignmentStatus::Assigned),
            ..AssignmentQuery::default()
        };
        self.gateway.list_assignments(&query).await
    }

    /// Open loans whose expected return date is before `now`, most overdue first.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the store fails.
    pub async fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<ItemAssignment>> {
        let query = AssignmentQuery {
            status: Some(AssignmentStatus::Assigned),
            ..AssignmentQuery::default()
        };
        let mut overdue: Vec<ItemAssignment> = self
            .gateway
            .list_assignments(&query)
            .await?
            .into_iter()
            .filter(|a| a.is_overdue(now))
            .collect();
        overdue.sort_by_key(|a| a.expected_return_date);
        Ok(overdue)
    }
}
