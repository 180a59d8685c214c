//! Integration tests for player loans.
//!
//! Covers the assign → returned lifecycle, stock bookkeeping on both legs,
//! undo of half-applied writes, and the outstanding/overdue reads.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use chrono::Duration;
use common::Harness;
use kitroom_core::notify::NotificationLevel;
use kitroom_core::persistence::{QueryError, Table};
use kitroom_testing::Operation;
use kitroom_warehouse::requests::{
    AssignItemRequest, AssignmentQuery, MovementQuery, RecordMovementRequest,
};
use kitroom_warehouse::types::{
    AssignmentId, AssignmentStatus, MovementType, PlayerId, ReturnedCondition,
};
use kitroom_warehouse::{Entity, ValidationError, WarehouseError};

#[tokio::test]
async fn assign_then_return_restores_stock() {
    let h = Harness::new();
    let player = h.seed_player("Giulia", "Bianchi");
    let (_, variant) = h.item_with_variant("Maglia", 7, 2).await;
    let due = h.now() + Duration::days(14);

    let loan = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 3, due))
        .await
        .unwrap();
    assert_eq!(loan.status, AssignmentStatus::Assigned);
    assert_eq!(loan.assign_date, h.now());
    assert_eq!(loan.expected_return_date, due);
    assert_eq!(h.stock(&variant).await, 4);

    h.clock.advance(Duration::days(3));
    let returned = h
        .app
        .assignments
        .mark_returned(loan.id, ReturnedCondition::Damaged)
        .await
        .unwrap();
    assert_eq!(returned.status, AssignmentStatus::Returned);
    assert_eq!(returned.return_date, Some(h.now()));
    assert_eq!(returned.returned_condition, Some(ReturnedCondition::Damaged));
    assert_eq!(h.stock(&variant).await, 7);

    let ledger = h.app.movements.list_movements(&MovementQuery::all()).await.unwrap();
    let kinds: Vec<MovementType> = ledger.iter().map(|m| m.movement_type).collect();
    assert_eq!(kinds, vec![MovementType::Return, MovementType::Assign]);
    assert!(ledger.iter().all(|m| m.assignment_id == Some(loan.id)));
    assert!(ledger.iter().all(|m| m.player_id == Some(player)));

    assert_eq!(
        h.notifier.successes()[2..],
        [
            "Articolo assegnato con successo".to_string(),
            "Restituzione registrata con successo".to_string()
        ]
    );
}

#[tokio::test]
async fn returning_twice_is_not_found() {
    let h = Harness::new();
    let player = h.seed_player("Marco", "Rossi");
    let (_, variant) = h.item_with_variant("Tuta", 2, 0).await;
    let loan = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 1, h.now()))
        .await
        .unwrap();

    h.app
        .assignments
        .mark_returned(loan.id, ReturnedCondition::Good)
        .await
        .unwrap();
    let err = h
        .app
        .assignments
        .mark_returned(loan.id, ReturnedCondition::Good)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WarehouseError::NotFound {
            entity: Entity::OpenAssignment,
            ..
        }
    ));
    assert_eq!(h.stock(&variant).await, 2, "second return must not restock");
    let (level, message) = h.notifier.last().unwrap();
    assert_eq!(level, NotificationLevel::Error);
    assert!(message.starts_with("Errore durante la registrazione della restituzione: "));
}

#[tokio::test]
async fn returning_an_unknown_assignment_is_not_found() {
    let h = Harness::new();
    let err = h
        .app
        .assignments
        .mark_returned(AssignmentId::new(), ReturnedCondition::Good)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WarehouseError::NotFound {
            entity: Entity::Assignment,
            ..
        }
    ));
}

#[tokio::test]
async fn cannot_lend_more_than_is_on_hand() {
    let h = Harness::new();
    let player = h.seed_player("Sara", "Verdi");
    let (_, variant) = h.item_with_variant("Maglia", 2, 1).await;

    let err = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 3, h.now() + Duration::days(1)))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WarehouseError::Validation(ValidationError::InsufficientStock {
            requested: 3,
            available: 2
        })
    );
    assert_eq!(h.stock(&variant).await, 2);
    assert_eq!(h.store.count(Table::ItemAssignments), 0);
    assert_eq!(h.store.count(Table::InventoryMovements), 0);
}

#[tokio::test]
async fn loan_needs_a_known_player() {
    let h = Harness::new();
    let (_, variant) = h.item_with_variant("Maglia", 2, 1).await;

    let err = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, PlayerId::new(), 1, h.now()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WarehouseError::NotFound {
            entity: Entity::Player,
            ..
        }
    ));
    assert_eq!(h.stock(&variant).await, 2);
}

#[tokio::test]
async fn loan_input_is_checked_before_any_lookup() {
    let h = Harness::new();
    let player = h.seed_player("Luca", "Neri");
    let (_, variant) = h.item_with_variant("Maglia", 2, 1).await;
    let before = h.store.operations().len();

    let early = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 1, h.now() - Duration::days(1)))
        .await
        .unwrap_err();
    assert_eq!(early, WarehouseError::Validation(ValidationError::ReturnBeforeAssign));

    let mut undated = AssignItemRequest::new(variant.id, player, 1, h.now());
    undated.expected_return_date = None;
    let undated = h.app.assignments.assign(undated).await.unwrap_err();
    assert_eq!(
        undated,
        WarehouseError::Validation(ValidationError::MissingField("expectedReturnDate"))
    );

    let zero = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 0, h.now()))
        .await
        .unwrap_err();
    assert!(zero.is_validation());

    assert_eq!(h.store.operations().len(), before);
}

#[tokio::test]
async fn return_must_match_the_loan() {
    let h = Harness::new();
    let player = h.seed_player("Anna", "Gallo");
    let other = h.seed_player("Paolo", "Conti");
    let (item, variant) = h.item_with_variant("Maglia", 5, 1).await;
    let loan = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 2, h.now()))
        .await
        .unwrap();

    let mut partial = RecordMovementRequest::new(item.id, variant.id, MovementType::Return, 1, h.now())
        .with_player(player);
    partial.assignment_id = Some(loan.id);
    let err = h.app.movements.record_movement(partial).await.unwrap_err();
    assert_eq!(
        err,
        WarehouseError::Validation(ValidationError::ReturnQuantityMismatch {
            assigned: 2,
            returned: 1
        })
    );

    let mut wrong_player =
        RecordMovementRequest::new(item.id, variant.id, MovementType::Return, 2, h.now())
            .with_player(other);
    wrong_player.assignment_id = Some(loan.id);
    let err = h.app.movements.record_movement(wrong_player).await.unwrap_err();
    assert!(matches!(
        err,
        WarehouseError::Validation(ValidationError::AssignmentPlayerMismatch { .. })
    ));

    let no_assignment =
        RecordMovementRequest::new(item.id, variant.id, MovementType::Return, 2, h.now())
            .with_player(player);
    let err = h.app.movements.record_movement(no_assignment).await.unwrap_err();
    assert_eq!(
        err,
        WarehouseError::Validation(ValidationError::MissingField("assignmentId"))
    );

    assert_eq!(h.stock(&variant).await, 3);
    assert!(h.app.assignments.get(loan.id).await.unwrap().is_outstanding());
}

#[tokio::test]
async fn return_through_the_ledger_closes_the_loan() {
    let h = Harness::new();
    let player = h.seed_player("Anna", "Gallo");
    let (item, variant) = h.item_with_variant("Maglia", 5, 1).await;
    let loan = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 2, h.now()))
        .await
        .unwrap();

    let mut back = RecordMovementRequest::new(item.id, variant.id, MovementType::Return, 2, h.now())
        .with_player(player);
    back.assignment_id = Some(loan.id);
    h.app.movements.record_movement(back).await.unwrap();

    let closed = h.app.assignments.get(loan.id).await.unwrap();
    assert_eq!(closed.status, AssignmentStatus::Returned);
    assert_eq!(closed.returned_condition, Some(ReturnedCondition::Good));
    assert_eq!(h.stock(&variant).await, 5);
}

#[tokio::test]
async fn kit_on_loan_cannot_be_deleted() {
    let h = Harness::new();
    let player = h.seed_player("Sara", "Conti");
    let (item, variant) = h.item_with_variant("Maglia", 4, 1).await;
    let loan = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 2, h.now() + Duration::days(7)))
        .await
        .unwrap();

    let err = h.app.catalog.remove_variant(variant.id).await.unwrap_err();
    assert_eq!(
        err,
        WarehouseError::Validation(ValidationError::OpenAssignments {
            variant_id: variant.id,
            open: 1
        })
    );
    let err = h.app.catalog.delete_item(item.id).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(h.store.count(Table::ItemVariants), 1);
    assert_eq!(h.store.count(Table::BaseItems), 1);

    h.app
        .assignments
        .mark_returned(loan.id, ReturnedCondition::Good)
        .await
        .unwrap();
    assert_eq!(h.stock(&variant).await, 4);

    h.app.catalog.remove_variant(variant.id).await.unwrap();
    h.app.catalog.delete_item(item.id).await.unwrap();
    assert_eq!(h.store.count(Table::BaseItems), 0);
}

// ============================================================================
// Undo of half-applied writes
// ============================================================================

#[tokio::test]
async fn failed_loan_insert_puts_stock_back() {
    let h = Harness::new();
    let player = h.seed_player("Giulia", "Bianchi");
    let (_, variant) = h.item_with_variant("Maglia", 5, 1).await;
    h.store.fail_next_on(
        Table::ItemAssignments,
        Operation::Insert,
        QueryError::Transport("timeout".to_string()),
    );

    let err = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 2, h.now()))
        .await
        .unwrap_err();

    assert!(err.is_query());
    assert_eq!(h.stock(&variant).await, 5);
    assert_eq!(h.store.count(Table::ItemAssignments), 0);
    assert_eq!(h.store.count(Table::InventoryMovements), 0);
}

#[tokio::test]
async fn failed_ledger_write_drops_the_new_loan() {
    let h = Harness::new();
    let player = h.seed_player("Giulia", "Bianchi");
    let (_, variant) = h.item_with_variant("Maglia", 5, 1).await;
    h.store.fail_next_on(
        Table::InventoryMovements,
        Operation::Insert,
        QueryError::Transport("timeout".to_string()),
    );

    h.app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 2, h.now()))
        .await
        .unwrap_err();

    assert_eq!(h.stock(&variant).await, 5);
    assert_eq!(h.store.count(Table::ItemAssignments), 0);
    assert_eq!(h.store.operation_count(Operation::Delete, Table::ItemAssignments), 1);
}

#[tokio::test]
async fn failed_ledger_write_reopens_the_loan() {
    let h = Harness::new();
    let player = h.seed_player("Giulia", "Bianchi");
    let (_, variant) = h.item_with_variant("Maglia", 5, 1).await;
    let loan = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 2, h.now()))
        .await
        .unwrap();
    h.store.fail_next_on(
        Table::InventoryMovements,
        Operation::Insert,
        QueryError::Transport("timeout".to_string()),
    );

    h.app
        .assignments
        .mark_returned(loan.id, ReturnedCondition::Good)
        .await
        .unwrap_err();

    let reopened = h.app.assignments.get(loan.id).await.unwrap();
    assert_eq!(reopened.status, AssignmentStatus::Assigned);
    assert_eq!(reopened.return_date, None);
    assert_eq!(reopened.returned_condition, None);
    assert_eq!(h.stock(&variant).await, 3);

    // The loan can still be closed once the store recovers
    h.app
        .assignments
        .mark_returned(loan.id, ReturnedCondition::Good)
        .await
        .unwrap();
    assert_eq!(h.stock(&variant).await, 5);
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn outstanding_and_overdue_loans() {
    let h = Harness::new();
    let giulia = h.seed_player("Giulia", "Bianchi");
    let marco = h.seed_player("Marco", "Rossi");
    let (_, variant) = h.item_with_variant("Maglia", 10, 1).await;
    let start = h.now();

    let short = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, giulia, 1, start + Duration::days(2)))
        .await
        .unwrap();
    let long = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, giulia, 1, start + Duration::days(30)))
        .await
        .unwrap();
    let marcos = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, marco, 1, start + Duration::days(1)))
        .await
        .unwrap();
    h.app
        .assignments
        .mark_returned(long.id, ReturnedCondition::Good)
        .await
        .unwrap();

    let open: Vec<AssignmentId> = h
        .app
        .assignments
        .outstanding_for_player(giulia)
        .await
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(open, vec![short.id]);

    assert!(h.app.assignments.overdue(h.now()).await.unwrap().is_empty());

    h.clock.advance(Duration::days(5));
    let overdue: Vec<AssignmentId> = h
        .app
        .assignments
        .overdue(h.now())
        .await
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(overdue, vec![marcos.id, short.id]);

    let summary = h.app.summary().await.unwrap();
    assert_eq!(summary.outstanding_assignments, 2);
    assert_eq!(summary.overdue_assignments, 2);
    assert_eq!(summary.units_on_loan, 2);
    assert_eq!(summary.total_units, 8);
}

#[tokio::test]
async fn assignment_list_filters_by_status() {
    let h = Harness::new();
    let player = h.seed_player("Giulia", "Bianchi");
    let (_, variant) = h.item_with_variant("Maglia", 10, 1).await;
    let first = h
        .app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 1, h.now()))
        .await
        .unwrap();
    h.app
        .assignments
        .assign(AssignItemRequest::new(variant.id, player, 1, h.now()))
        .await
        .unwrap();
    h.app
        .assignments
        .mark_returned(first.id, ReturnedCondition::Worn)
        .await
        .unwrap();

    let all = h.app.assignments.list(&AssignmentQuery::all()).await.unwrap();
    assert_eq!(all.len(), 2);

    let returned = h
        .app
        .assignments
        .list(&AssignmentQuery {
            status: Some(AssignmentStatus::Returned),
            ..AssignmentQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(returned.len(), 1);
    assert_eq!(returned[0].id, first.id);
    assert_eq!(returned[0].returned_condition, Some(ReturnedCondition::Worn));
}
