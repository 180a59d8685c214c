//! Error taxonomy for warehouse operations.
//!
//! - [`ValidationError`]: caller input breaks a business rule; raised before
//!   any write reaches the store
//! - [`WarehouseError::NotFound`]: the target id is absent (or, for
//!   assignments, no longer open)
//! - [`QueryError`]: backend failure, passed through verbatim

use crate::types::{AssignmentId, BaseItemId, MovementType, PlayerId, VariantId};
use kitroom_core::persistence::QueryError;
use std::fmt;
use thiserror::Error;

/// Input that violates a precondition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or blank
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Movement and assignment quantities must be at least 1
    #[error("quantity must be a positive integer, got {0}")]
    NonPositiveQuantity(i64),

    /// Stock counts and thresholds cannot be negative
    #[error("{field} cannot be negative, got {value}")]
    NegativeValue {
        /// Offending field
        field: &'static str,
        /// Supplied value
        value: i64,
    },

    /// Value does not fit the stored integer range
    #[error("{field} is too large: {value}")]
    OutOfRange {
        /// Offending field
        field: &'static str,
        /// Supplied value
        value: i64,
    },

    /// Movement kind outside the six known kinds
    #[error("unknown movement type: {0}")]
    UnknownMovementType(String),

    /// Another variant of the same item already has this size and color
    #[error("a variant with size {size} and color {color} already exists for this item")]
    DuplicateVariant {
        /// Size label
        size: String,
        /// Color
        color: String,
    },

    /// Another variant of the same item already uses this SKU
    #[error("SKU {0} is already used by another variant of this item")]
    DuplicateSku(String),

    /// Outbound request larger than the stock on hand
    #[error("requested {requested} units but only {available} in stock")]
    InsufficientStock {
        /// Units requested
        requested: u32,
        /// Units on hand
        available: u32,
    },

    /// Assign and return movements must name a player
    #[error("{0} movements require a player")]
    MissingPlayer(MovementType),

    /// The variant belongs to a different base item
    #[error("variant {variant_id} does not belong to item {base_item_id}")]
    VariantItemMismatch {
        /// Variant in the request
        variant_id: VariantId,
        /// Base item in the request
        base_item_id: BaseItemId,
    },

    /// Expected return date earlier than the assignment date
    #[error("expected return date must not be before the assignment date")]
    ReturnBeforeAssign,

    /// The return names a different player than the loan
    #[error("assignment {assignment_id} was made to player {expected}, not {actual}")]
    AssignmentPlayerMismatch {
        /// Assignment being closed
        assignment_id: AssignmentId,
        /// Player on the loan
        expected: PlayerId,
        /// Player in the request
        actual: PlayerId,
    },

    /// The return names a different variant than the loan
    #[error("assignment {assignment_id} is for variant {expected}, not {actual}")]
    AssignmentVariantMismatch {
        /// Assignment being closed
        assignment_id: AssignmentId,
        /// Variant on the loan
        expected: VariantId,
        /// Variant in the request
        actual: VariantId,
    },

    /// Partial returns are not supported
    #[error("return of {returned} units does not match the {assigned} units assigned")]
    ReturnQuantityMismatch {
        /// Units on the loan
        assigned: u32,
        /// Units in the request
        returned: u32,
    },

    /// The variant is still out on loan and cannot be removed
    #[error("variant {variant_id} has {open} open assignment(s)")]
    OpenAssignments {
        /// Variant targeted by the delete
        variant_id: VariantId,
        /// Loans not yet returned
        open: usize,
    },
}

/// Kind of record an operation targeted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Base item
    BaseItem,
    /// Item variant
    Variant,
    /// Assignment, in any state
    Assignment,
    /// Assignment that is still open
    OpenAssignment,
    /// Roster player
    Player,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BaseItem => "base item",
            Self::Variant => "variant",
            Self::Assignment => "assignment",
            Self::OpenAssignment => "open assignment",
            Self::Player => "player",
        })
    }
}

/// Errors returned by every warehouse operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarehouseError {
    /// Caller input rejected
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Target id absent from the store
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record
        entity: Entity,
        /// Requested id
        id: String,
    },

    /// Backend failure
    #[error("Query error: {0}")]
    Query(#[from] QueryError),
}

impl WarehouseError {
    /// Build a [`WarehouseError::NotFound`].
    pub fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the caller's input was rejected.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the target record does not exist (or is no longer open).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the backend failed.
    #[must_use]
    pub const fn is_query(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

/// Result alias for warehouse operations.
pub type Result<T> = std::result::Result<T, WarehouseError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn validation_converts_with_question_mark() {
        fn check() -> Result<()> {
            let outcome: std::result::Result<(), ValidationError> =
                Err(ValidationError::MissingField("name"));
            outcome?;
            Ok(())
        }
        let err = check().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Validation error: name is required");
    }

    #[test]
    fn query_errors_pass_through() {
        let err: WarehouseError = QueryError::Transport("timeout".to_string()).into();
        assert!(err.is_query());
        assert_eq!(err.to_string(), "Query error: Transport error: timeout");
    }

    #[test]
    fn not_found_names_the_entity() {
        let id = AssignmentId::new();
        let err = WarehouseError::not_found(Entity::OpenAssignment, id);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), format!("open assignment not found: {id}"));
    }
}
