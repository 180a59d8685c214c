//! Movement Processor.
//!
//! Records stock-affecting events and keeps the variant's quantity in step
//! with the ledger. Every movement adjusts stock by the delta its kind implies:
//!
//! | Kind | Stock | Side effect |
//! |------|-------|-------------|
//! | `in` | +q | |
//! | `out`, `lost`, `damaged` | −q, clamped at 0 | |
//! | `assign` | −q, must be available | opens an assignment |
//! | `return` | +q | closes the assignment |
//!
//! The store offers no transactions, so writes go variant → assignment →
//! movement. If a later write fails the earlier ones are undone on a best
//! effort basis and the original error is returned.

use crate::error::{Entity, Result, ValidationError, WarehouseError};
use crate::gateway::InventoryGateway;
use crate::messages::Messages;
use crate::requests::{MovementQuery, RecordMovementRequest, ValidatedMovement};
use crate::types::{
    AssignmentId, AssignmentStatus, Direction, InventoryMovement, ItemAssignment, ItemVariant,
    MovementId, MovementType,
};
use kitroom_core::notify::{NotificationLevel, Notifier};
use kitroom_runtime::metrics::{AssignmentMetrics, StockMetrics};
use std::sync::Arc;

/// Effect of one movement on a variant's stock count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockChange {
    /// Units on hand before
    pub before: u32,
    /// Units on hand after
    pub after: u32,
    /// Whether an outbound movement asked for more than was on hand
    pub clamped: bool,
}

/// Compute the stock count after a movement.
///
/// Outbound movements larger than the stock on hand leave zero and report
/// `clamped`; the count never goes negative.
///
/// # Example
///
/// ```
/// use kitroom_warehouse::movements::apply_stock_change;
/// use kitroom_warehouse::types::MovementType;
///
/// let change = apply_stock_change(2, MovementType::Out, 5);
/// assert_eq!(change.after, 0);
/// assert!(change.clamped);
/// ```
#[must_use]
pub const fn apply_stock_change(current: u32, movement_type: MovementType, quantity: u32) -> StockChange {
    match movement_type.direction() {
        Direction::Inbound => StockChange {
            before: current,
            after: current.saturating_add(quantity),
            clamped: false,
        },
        Direction::Outbound => StockChange {
            before: current,
            after: current.saturating_sub(quantity),
            clamped: quantity > current,
        },
    }
}

/// Everything a movement wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovementOutcome {
    /// The ledger entry
    pub movement: InventoryMovement,
    /// The variant after the stock change
    pub variant: ItemVariant,
    /// Assignment opened (assign) or closed (return)
    pub assignment: Option<ItemAssignment>,
    /// Stock before and after
    pub change: StockChange,
}

/// Undo step for an assignment write that was followed by a failure.
#[derive(Clone, Copy, Debug)]
enum AssignmentUndo {
    Delete(AssignmentId),
    Reopen(AssignmentId),
}

/// Records movements and adjusts stock.
#[derive(Clone)]
pub struct MovementProcessor {
    gateway: InventoryGateway,
    notifier: Arc<dyn Notifier>,
    messages: Messages,
}

impl MovementProcessor {
    /// Create a processor writing through `gateway`.
    #[must_use]
    pub fn new(gateway: InventoryGateway, notifier: Arc<dyn Notifier>, messages: Messages) -> Self {
        Self {
            gateway,
            notifier,
            messages,
        }
    }

    /// Validate and record a movement, adjusting the variant's stock.
    ///
    /// Notifies success or failure with a localized message.
    ///
    /// # Errors
    ///
    /// - [`WarehouseError::Validation`] for bad input, a variant of another
    ///   item, an assignment larger than stock, or a return that does not
    ///   match its assignment
    /// - [`WarehouseError::NotFound`] for an unknown variant or player, or an
    ///   assignment that is absent or already returned
    /// - [`WarehouseError::Query`] if the store fails
    pub async fn record_movement(&self, request: RecordMovementRequest) -> Result<InventoryMovement> {
        match self.apply(request).await {
            Ok(outcome) => {
                self.notifier
                    .notify(NotificationLevel::Success, &self.messages.movement_recorded());
                Ok(outcome.movement)
            }
            Err(e) => {
                self.notifier
                    .notify(NotificationLevel::Error, &self.messages.movement_failed(&e));
                Err(e)
            }
        }
    }

    /// Ledger entries matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Query`] if the store fails.
    pub async fn list_movements(&self, query: &MovementQuery) -> Result<Vec<InventoryMovement>> {
        self.gateway.list_movements(query).await
    }

    /// Record a movement without notifying. Shared with the assignment tracker.
    pub(crate) async fn apply(&self, request: RecordMovementRequest) -> Result<MovementOutcome> {
        let movement = request.validate()?;
        let variant = self.gateway.get_variant(movement.variant_id).await?;
        if variant.base_item_id != movement.base_item_id {
            return Err(ValidationError::VariantItemMismatch {
                variant_id: variant.id,
                base_item_id: movement.base_item_id,
            }
            .into());
        }

        let open_assignment = self.check_preconditions(&movement, &variant).await?;

        let change = apply_stock_change(variant.quantity, movement.movement_type, movement.quantity);
        if change.clamped {
            StockMetrics::record_clamp();
            tracing::warn!(
                variant_id = %variant.id,
                movement_type = %movement.movement_type,
                requested = movement.quantity,
                available = change.before,
                "Outbound movement exceeds stock, clamping at zero"
            );
        }

        let updated = self
            .gateway
            .update_variant_stock(&variant, change.after)
            .await?;

        let (assignment, undo) = match self.write_assignment(&movement, open_assignment).await {
            Ok(written) => written,
            Err(e) => {
                self.compensate(&updated, change.before, None).await;
                return Err(e);
            }
        };

        let entry = InventoryMovement {
            id: MovementId::new(),
            base_item_id: movement.base_item_id,
            variant_id: Some(movement.variant_id),
            movement_type: movement.movement_type,
            quantity: movement.quantity,
            date: movement.date,
            note: movement.note,
            player_id: movement.player_id,
            assignment_id: assignment.as_ref().map(|a| a.id),
            created_at: self.gateway.now(),
        };
        let stored = match self.gateway.append_movement(entry).await {
            Ok(stored) => stored,
            Err(e) => {
                self.compensate(&updated, change.before, undo).await;
                return Err(e);
            }
        };

        StockMetrics::record_movement(stored.movement_type.as_str());
        match stored.movement_type {
            MovementType::Assign => AssignmentMetrics::record_opened(),
            MovementType::Return => AssignmentMetrics::record_returned(),
            _ => {}
        }
        tracing::info!(
            movement_id = %stored.id,
            variant_id = %updated.id,
            movement_type = %stored.movement_type,
            quantity = stored.quantity,
            before = change.before,
            after = change.after,
            status = %updated.status,
            "Movement recorded"
        );

        Ok(MovementOutcome {
            movement: stored,
            variant: updated,
            assignment,
            change,
        })
    }

    /// Checks that need the store. Returns the assignment a return closes.
    async fn check_preconditions(
        &self,
        movement: &ValidatedMovement,
        variant: &ItemVariant,
    ) -> Result<Option<ItemAssignment>> {
        match movement.movement_type {
            MovementType::Assign => {
                if let Some(player_id) = movement.player_id {
                    self.gateway.get_player(player_id).await?;
                }
                if movement.quantity > variant.quantity {
                    return Err(ValidationError::InsufficientStock {
                        requested: movement.quantity,
                        available: variant.quantity,
                    }
                    .into());
                }
                Ok(None)
            }
            MovementType::Return => {
                let Some(assignment_id) = movement.assignment_id else {
                    return Err(ValidationError::MissingField("assignmentId").into());
                };
                let assignment = self.gateway.get_assignment(assignment_id).await?;
                if !assignment.is_outstanding() {
                    return Err(WarehouseError::not_found(
                        Entity::OpenAssignment,
                        assignment_id,
                    ));
                }
                if let Some(player_id) = movement.player_id {
                    if player_id != assignment.player_id {
                        return Err(ValidationError::AssignmentPlayerMismatch {
                            assignment_id,
                            expected: assignment.player_id,
                            actual: player_id,
                        }
                        .into());
                    }
                }
                if assignment.variant_id != variant.id {
                    return Err(ValidationError::AssignmentVariantMismatch {
                        assignment_id,
                        expected: assignment.variant_id,
                        actual: variant.id,
                    }
                    .into());
                }
                if assignment.quantity != movement.quantity {
                    return Err(ValidationError::ReturnQuantityMismatch {
                        assigned: assignment.quantity,
                        returned: movement.quantity,
                    }
                    .into());
                }
                Ok(Some(assignment))
            }
            MovementType::In | MovementType::Out | MovementType::Lost | MovementType::Damaged => {
                Ok(None)
            }
        }
    }

    async fn write_assignment(
        &self,
        movement: &ValidatedMovement,
        open: Option<ItemAssignment>,
    ) -> Result<(Option<ItemAssignment>, Option<AssignmentUndo>)> {
        match (movement.movement_type, movement.player_id, movement.expected_return_date) {
            (MovementType::Assign, Some(player_id), Some(expected_return_date)) => {
                let assignment = ItemAssignment {
                    id: AssignmentId::new(),
                    variant_id: movement.variant_id,
                    base_item_id: movement.base_item_id,
                    player_id,
                    quantity: movement.quantity,
                    assign_date: movement.date,
                    expected_return_date,
                    return_date: None,
                    status: AssignmentStatus::Assigned,
                    returned_condition: None,
                    notes: movement.note.clone(),
                };
                let stored = self.gateway.insert_assignment(assignment).await?;
                let undo = AssignmentUndo::Delete(stored.id);
                Ok((Some(stored), Some(undo)))
            }
            (MovementType::Return, _, _) => match open {
                Some(open) => {
                    let condition = movement.returned_condition.unwrap_or_default();
                    let closed = self
                        .gateway
                        .close_assignment(open.id, movement.date, condition)
                        .await?;
                    let undo = AssignmentUndo::Reopen(closed.id);
                    Ok((Some(closed), Some(undo)))
                }
                None => Ok((None, None)),
            },
            _ => Ok((None, None)),
        }
    }

    /// Put the variant's stock back and undo the assignment write.
    ///
    /// Failures here are logged; the caller returns the original error.
    async fn compensate(&self, variant: &ItemVariant, restore_to: u32, undo: Option<AssignmentUndo>) {
        StockMetrics::record_compensation();
        tracing::warn!(
            variant_id = %variant.id,
            restore_to,
            "Follow-up write failed, undoing stock change"
        );

        if let Err(e) = self.gateway.update_variant_stock(variant, restore_to).await {
            tracing::error!(variant_id = %variant.id, restore_to, error = %e, "Stock restore failed");
        }

        let undone = match undo {
            Some(AssignmentUndo::Delete(id)) => self.gateway.delete_assignment(id).await.map(|()| id),
            Some(AssignmentUndo::Reopen(id)) => self.gateway.reopen_assignment(id).await.map(|a| a.id),
            None => return,
        };
        if let Err(e) = undone {
            tracing::error!(error = %e, "Assignment undo failed");
        }
    }
}
