//! Request DTOs, one per operation, validated at the boundary.
//!
//! Every request deserializes camelCase from a form payload. Missing text
//! fields deserialize as blank so they surface as [`ValidationError`]s rather
//! than decode failures. Quantities arrive as `i64` so non-positive input can be
//! rejected explicitly.

use crate::error::ValidationError;
use crate::types::{
    AssignmentId, AssignmentStatus, BaseItemId, MovementType, PlayerId, ReturnedCondition,
    SizeStock, VariantId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Field helpers
// ============================================================================

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn stock_count(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeValue { field, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::OutOfRange { field, value })
}

fn positive_quantity(value: i64) -> Result<u32, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositiveQuantity(value));
    }
    u32::try_from(value).map_err(|_| ValidationError::OutOfRange {
        field: "quantity",
        value,
    })
}

fn validate_sizes(sizes: Vec<SizeStock>) -> Result<Vec<SizeStock>, ValidationError> {
    sizes
        .into_iter()
        .map(|s| {
            Ok(SizeStock {
                size: required("size", &s.size)?,
                quantity: s.quantity,
            })
        })
        .collect()
}

// ============================================================================
// Base items
// ============================================================================

/// Create a catalog entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateBaseItemRequest {
    /// Display name (required)
    pub name: String,
    /// Category (required)
    pub category: String,
    /// Free-text description
    pub description: Option<String>,
    /// Brand
    pub brand: Option<String>,
    /// Catalog-level code
    pub sku: Option<String>,
    /// Picture URL
    pub image_url: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Embedded size counts
    pub sizes: Vec<SizeStock>,
}

impl CreateBaseItemRequest {
    /// Request with just the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    /// Trim text fields and check required ones.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] if name or category is blank.
    pub fn normalize(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required("name", &self.name)?,
            category: required("category", &self.category)?,
            description: optional_text(self.description),
            brand: optional_text(self.brand),
            sku: optional_text(self.sku),
            image_url: optional_text(self.image_url),
            notes: optional_text(self.notes),
            sizes: validate_sizes(self.sizes)?,
        })
    }
}

/// Partial update of a catalog entry. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateBaseItemRequest {
    /// New name
    pub name: Option<String>,
    /// New category
    pub category: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New brand
    pub brand: Option<String>,
    /// New catalog-level code
    pub sku: Option<String>,
    /// New picture URL
    pub image_url: Option<String>,
    /// New notes
    pub notes: Option<String>,
    /// Replacement size counts
    pub sizes: Option<Vec<SizeStock>>,
}

impl UpdateBaseItemRequest {
    /// Trim text fields; a provided name or category must not be blank.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] if name or category is set to blank.
    pub fn normalize(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: self.name.map(|n| required("name", &n)).transpose()?,
            category: self.category.map(|c| required("category", &c)).transpose()?,
            description: self.description.map(|v| v.trim().to_string()),
            brand: self.brand.map(|v| v.trim().to_string()),
            sku: self.sku.map(|v| v.trim().to_string()),
            image_url: self.image_url.map(|v| v.trim().to_string()),
            notes: self.notes.map(|v| v.trim().to_string()),
            sizes: self.sizes.map(validate_sizes).transpose()?,
        })
    }
}

// ============================================================================
// Variants
// ============================================================================

/// Create a variant under a base item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariantRequest {
    /// Owning base item
    pub base_item_id: BaseItemId,
    /// Size label (required)
    #[serde(default)]
    pub size: String,
    /// Color (required)
    #[serde(default)]
    pub color: String,
    /// Stock-keeping code (required)
    #[serde(default)]
    pub sku: String,
    /// Opening stock
    #[serde(default)]
    pub quantity: i64,
    /// Low-stock threshold
    #[serde(default)]
    pub minimum_threshold: i64,
    /// Storage location
    #[serde(default)]
    pub location: Option<String>,
}

/// A [`CreateVariantRequest`] that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewVariant {
    /// Owning base item
    pub base_item_id: BaseItemId,
    /// Size label
    pub size: String,
    /// Color
    pub color: String,
    /// Stock-keeping code
    pub sku: String,
    /// Opening stock
    pub quantity: u32,
    /// Low-stock threshold
    pub minimum_threshold: u32,
    /// Storage location
    pub location: Option<String>,
}

impl CreateVariantRequest {
    /// Request with no storage location.
    #[must_use]
    pub fn new(
        base_item_id: BaseItemId,
        size: impl Into<String>,
        color: impl Into<String>,
        sku: impl Into<String>,
        quantity: i64,
        minimum_threshold: i64,
    ) -> Self {
        Self {
            base_item_id,
            size: size.into(),
            color: color.into(),
            sku: sku.into(),
            quantity,
            minimum_threshold,
            location: None,
        }
    }

    /// Check required fields and non-negative counts.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for blank size/color/SKU or negative counts.
    pub fn normalize(self) -> Result<NewVariant, ValidationError> {
        Ok(NewVariant {
            base_item_id: self.base_item_id,
            size: required("size", &self.size)?,
            color: required("color", &self.color)?,
            sku: required("sku", &self.sku)?,
            quantity: stock_count("quantity", self.quantity)?,
            minimum_threshold: stock_count("minimumThreshold", self.minimum_threshold)?,
            location: optional_text(self.location),
        })
    }
}

/// Partial update of a variant. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateVariantRequest {
    /// New size label
    pub size: Option<String>,
    /// New color
    pub color: Option<String>,
    /// New stock-keeping code
    pub sku: Option<String>,
    /// Corrected stock count
    pub quantity: Option<i64>,
    /// New low-stock threshold
    pub minimum_threshold: Option<i64>,
    /// New storage location
    pub location: Option<String>,
}

/// An [`UpdateVariantRequest`] that passed validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantPatch {
    /// New size label
    pub size: Option<String>,
    /// New color
    pub color: Option<String>,
    /// New stock-keeping code
    pub sku: Option<String>,
    /// Corrected stock count
    pub quantity: Option<u32>,
    /// New low-stock threshold
    pub minimum_threshold: Option<u32>,
    /// New storage location
    pub location: Option<String>,
}

impl VariantPatch {
    /// Patch that only sets the stock count.
    #[must_use]
    pub fn quantity(quantity: u32) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }
}

impl UpdateVariantRequest {
    /// Check provided fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for blank labels or negative counts.
    pub fn normalize(self) -> Result<VariantPatch, ValidationError> {
        Ok(VariantPatch {
            size: self.size.map(|s| required("size", &s)).transpose()?,
            color: self.color.map(|c| required("color", &c)).transpose()?,
            sku: self.sku.map(|s| required("sku", &s)).transpose()?,
            quantity: self
                .quantity
                .map(|q| stock_count("quantity", q))
                .transpose()?,
            minimum_threshold: self
                .minimum_threshold
                .map(|t| stock_count("minimumThreshold", t))
                .transpose()?,
            location: self.location.map(|l| l.trim().to_string()),
        })
    }
}

// ============================================================================
// Movements
// ============================================================================

/// Record a stock-affecting event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMovementRequest {
    /// Affected base item
    pub base_item_id: BaseItemId,
    /// Affected variant (required)
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// Kind of movement
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Units moved, must be positive
    #[serde(default)]
    pub quantity: i64,
    /// When the movement happened (required)
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Free-text note
    #[serde(default)]
    pub note: Option<String>,
    /// Player (required for assign and return)
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    /// Assignment being closed (required for return)
    #[serde(default)]
    pub assignment_id: Option<AssignmentId>,
    /// End of the loan (required for assign)
    #[serde(default)]
    pub expected_return_date: Option<DateTime<Utc>>,
    /// Condition of returned stock (defaults to good)
    #[serde(default)]
    pub returned_condition: Option<ReturnedCondition>,
}

impl RecordMovementRequest {
    /// Request for a plain stock movement with no player involved.
    #[must_use]
    pub fn new(
        base_item_id: BaseItemId,
        variant_id: VariantId,
        movement_type: MovementType,
        quantity: i64,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            base_item_id,
            variant_id: Some(variant_id),
            movement_type,
            quantity,
            date: Some(date),
            note: None,
            player_id: None,
            assignment_id: None,
            expected_return_date: None,
            returned_condition: None,
        }
    }

    /// Attach a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attach a player.
    #[must_use]
    pub const fn with_player(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    /// Check every precondition that does not need the store.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a non-positive quantity, a missing date
    /// or variant, a missing player on assign/return, a missing or earlier
    /// expected return date on assign, or a missing assignment on return.
    pub fn validate(self) -> Result<ValidatedMovement, ValidationError> {
        let quantity = positive_quantity(self.quantity)?;
        let date = self.date.ok_or(ValidationError::MissingField("date"))?;
        let variant_id = self
            .variant_id
            .ok_or(ValidationError::MissingField("variantId"))?;

        if self.movement_type.requires_player() && self.player_id.is_none() {
            return Err(ValidationError::MissingPlayer(self.movement_type));
        }

        let expected_return_date = match self.movement_type {
            MovementType::Assign => {
                let expected = self
                    .expected_return_date
                    .ok_or(ValidationError::MissingField("expectedReturnDate"))?;
                if expected < date {
                    return Err(ValidationError::ReturnBeforeAssign);
                }
                Some(expected)
            }
            _ => None,
        };

        let assignment_id = match self.movement_type {
            MovementType::Return => Some(
                self.assignment_id
                    .ok_or(ValidationError::MissingField("assignmentId"))?,
            ),
            _ => None,
        };

        let returned_condition = match self.movement_type {
            MovementType::Return => Some(self.returned_condition.unwrap_or_default()),
            _ => None,
        };

        Ok(ValidatedMovement {
            base_item_id: self.base_item_id,
            variant_id,
            movement_type: self.movement_type,
            quantity,
            date,
            note: optional_text(self.note),
            player_id: self.player_id,
            assignment_id,
            expected_return_date,
            returned_condition,
        })
    }
}

/// A [`RecordMovementRequest`] that passed boundary validation.
///
/// Type-specific fields are populated exactly when the kind needs them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedMovement {
    /// Affected base item
    pub base_item_id: BaseItemId,
    /// Affected variant
    pub variant_id: VariantId,
    /// Kind of movement
    pub movement_type: MovementType,
    /// Units moved
    pub quantity: u32,
    /// When the movement happened
    pub date: DateTime<Utc>,
    /// Free-text note
    pub note: Option<String>,
    /// Player, present for assign and return
    pub player_id: Option<PlayerId>,
    /// Present for return
    pub assignment_id: Option<AssignmentId>,
    /// Present for assign
    pub expected_return_date: Option<DateTime<Utc>>,
    /// Present for return
    pub returned_condition: Option<ReturnedCondition>,
}

// ============================================================================
// Assignments
// ============================================================================

/// Loan a variant's stock to a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignItemRequest {
    /// Variant to loan
    pub variant_id: VariantId,
    /// Borrowing player
    pub player_id: PlayerId,
    /// Units to loan
    pub quantity: i64,
    /// When the stock should come back
    #[serde(default)]
    pub expected_return_date: Option<DateTime<Utc>>,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl AssignItemRequest {
    /// Loan request with no notes.
    #[must_use]
    pub const fn new(
        variant_id: VariantId,
        player_id: PlayerId,
        quantity: i64,
        expected_return_date: DateTime<Utc>,
    ) -> Self {
        Self {
            variant_id,
            player_id,
            quantity,
            expected_return_date: Some(expected_return_date),
            notes: None,
        }
    }
}

impl AssignItemRequest {
    /// Check the input before the variant is looked up.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a non-positive quantity, or a missing
    /// expected return date or one before `assign_date`.
    pub fn validate(&self, assign_date: DateTime<Utc>) -> Result<(), ValidationError> {
        positive_quantity(self.quantity)?;
        let expected = self
            .expected_return_date
            .ok_or(ValidationError::MissingField("expectedReturnDate"))?;
        if expected < assign_date {
            return Err(ValidationError::ReturnBeforeAssign);
        }
        Ok(())
    }

    /// The assign movement this request becomes, for a variant of `base_item_id`.
    #[must_use]
    pub fn into_movement(
        self,
        base_item_id: BaseItemId,
        assign_date: DateTime<Utc>,
    ) -> RecordMovementRequest {
        RecordMovementRequest {
            base_item_id,
            variant_id: Some(self.variant_id),
            movement_type: MovementType::Assign,
            quantity: self.quantity,
            date: Some(assign_date),
            note: self.notes,
            player_id: Some(self.player_id),
            assignment_id: None,
            expected_return_date: self.expected_return_date,
            returned_condition: None,
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Filter for the movement ledger. Results are always newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MovementQuery {
    /// Only this kind
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    /// Only this base item
    pub base_item_id: Option<BaseItemId>,
    /// Only this variant
    pub variant_id: Option<VariantId>,
    /// Only this player
    pub player_id: Option<PlayerId>,
}

impl MovementQuery {
    /// The whole ledger.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether no filter is set.
    #[must_use]
    pub const fn is_unfiltered(&self) -> bool {
        self.movement_type.is_none()
            && self.base_item_id.is_none()
            && self.variant_id.is_none()
            && self.player_id.is_none()
    }
}

/// Filter for assignments. Results are newest assignment first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignmentQuery {
    /// Only this player
    pub player_id: Option<PlayerId>,
    /// Only this variant
    pub variant_id: Option<VariantId>,
    /// Only this lifecycle state
    pub status: Option<AssignmentStatus>,
}

impl AssignmentQuery {
    /// Every assignment.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether no filter is set.
    #[must_use]
    pub const fn is_unfiltered(&self) -> bool {
        self.player_id.is_none() && self.variant_id.is_none() && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn movement(kind: MovementType, quantity: i64) -> RecordMovementRequest {
        RecordMovementRequest::new(
            BaseItemId::new(),
            VariantId::new(),
            kind,
            quantity,
            Utc::now(),
        )
    }

    #[test]
    fn base_item_requires_name_and_category() {
        let err = CreateBaseItemRequest::new("  ", "kit").normalize().unwrap_err();
        assert_eq!(err, ValidationError::MissingField("name"));

        let err = CreateBaseItemRequest::new("Maglia", "").normalize().unwrap_err();
        assert_eq!(err, ValidationError::MissingField("category"));

        let ok = CreateBaseItemRequest::new(" Maglia ", "kit").normalize().unwrap();
        assert_eq!(ok.name, "Maglia");
    }

    #[test]
    fn missing_fields_in_payload_become_validation_errors() {
        let request: CreateBaseItemRequest =
            serde_json::from_value(json!({"category": "kit"})).unwrap();
        assert_eq!(
            request.normalize().unwrap_err(),
            ValidationError::MissingField("name")
        );
    }

    #[test]
    fn blank_optional_text_is_dropped() {
        let mut request = CreateBaseItemRequest::new("Maglia", "kit");
        request.brand = Some("   ".to_string());
        request.notes = Some(" home kit ".to_string());

        let ok = request.normalize().unwrap();
        assert_eq!(ok.brand, None);
        assert_eq!(ok.notes.as_deref(), Some("home kit"));
    }

    #[test]
    fn update_rejects_blank_name_but_allows_absent() {
        let blank = UpdateBaseItemRequest {
            name: Some(String::new()),
            ..UpdateBaseItemRequest::default()
        };
        assert!(blank.normalize().is_err());
        assert!(UpdateBaseItemRequest::default().normalize().is_ok());
    }

    #[test]
    fn variant_counts_cannot_be_negative() {
        let request = CreateVariantRequest {
            base_item_id: BaseItemId::new(),
            size: "M".to_string(),
            color: "#1976d2".to_string(),
            sku: "MAG-M".to_string(),
            quantity: -1,
            minimum_threshold: 3,
            location: None,
        };
        assert_eq!(
            request.normalize().unwrap_err(),
            ValidationError::NegativeValue {
                field: "quantity",
                value: -1
            }
        );
    }

    #[test]
    fn movement_quantity_must_be_positive() {
        for bad in [0, -4] {
            assert_eq!(
                movement(MovementType::In, bad).validate().unwrap_err(),
                ValidationError::NonPositiveQuantity(bad)
            );
        }
        let too_big = i64::from(u32::MAX) + 1;
        assert!(matches!(
            movement(MovementType::In, too_big).validate().unwrap_err(),
            ValidationError::OutOfRange { .. }
        ));
    }

    #[test]
    fn movement_requires_date_and_variant() {
        let mut no_date = movement(MovementType::In, 1);
        no_date.date = None;
        assert_eq!(
            no_date.validate().unwrap_err(),
            ValidationError::MissingField("date")
        );

        let mut no_variant = movement(MovementType::Out, 1);
        no_variant.variant_id = None;
        assert_eq!(
            no_variant.validate().unwrap_err(),
            ValidationError::MissingField("variantId")
        );
    }

    #[test]
    fn assign_and_return_require_a_player() {
        for kind in [MovementType::Assign, MovementType::Return] {
            assert_eq!(
                movement(kind, 1).validate().unwrap_err(),
                ValidationError::MissingPlayer(kind)
            );
        }
    }

    #[test]
    fn assign_requires_a_future_return_date() {
        let request = movement(MovementType::Assign, 1).with_player(PlayerId::new());
        assert_eq!(
            request.clone().validate().unwrap_err(),
            ValidationError::MissingField("expectedReturnDate")
        );

        let mut early = request.clone();
        early.expected_return_date = early.date.map(|d| d - Duration::days(1));
        assert_eq!(
            early.validate().unwrap_err(),
            ValidationError::ReturnBeforeAssign
        );

        let mut ok = request;
        ok.expected_return_date = ok.date.map(|d| d + Duration::days(7));
        let validated = ok.validate().unwrap();
        assert!(validated.expected_return_date.is_some());
        assert!(validated.assignment_id.is_none());
    }

    #[test]
    fn return_requires_assignment_and_defaults_condition() {
        let request = movement(MovementType::Return, 1).with_player(PlayerId::new());
        assert_eq!(
            request.clone().validate().unwrap_err(),
            ValidationError::MissingField("assignmentId")
        );

        let mut ok = request;
        ok.assignment_id = Some(AssignmentId::new());
        let validated = ok.validate().unwrap();
        assert_eq!(validated.returned_condition, Some(ReturnedCondition::Good));
    }

    #[test]
    fn movement_request_reads_form_payload() {
        let payload = json!({
            "baseItemId": BaseItemId::new(),
            "variantId": VariantId::new(),
            "type": "damaged",
            "quantity": 2,
            "date": "2025-02-01T10:00:00Z",
            "note": "torn seam"
        });
        let request: RecordMovementRequest = serde_json::from_value(payload).unwrap();
        let validated = request.validate().unwrap();
        assert_eq!(validated.movement_type, MovementType::Damaged);
        assert_eq!(validated.quantity, 2);
    }

    #[test]
    fn assign_request_checks_quantity_and_dates() {
        let now = Utc::now();
        let request = AssignItemRequest::new(
            VariantId::new(),
            PlayerId::new(),
            2,
            now + Duration::days(14),
        );
        assert!(request.validate(now).is_ok());

        let mut zero = request.clone();
        zero.quantity = 0;
        assert_eq!(
            zero.validate(now).unwrap_err(),
            ValidationError::NonPositiveQuantity(0)
        );

        assert_eq!(
            request.validate(now + Duration::days(15)).unwrap_err(),
            ValidationError::ReturnBeforeAssign
        );

        let base_item_id = BaseItemId::new();
        let movement = request.into_movement(base_item_id, now).validate().unwrap();
        assert_eq!(movement.movement_type, MovementType::Assign);
        assert_eq!(movement.base_item_id, base_item_id);
        assert_eq!(movement.date, now);
    }

    #[test]
    fn queries_know_when_they_are_unfiltered() {
        assert!(MovementQuery::all().is_unfiltered());
        let by_type = MovementQuery {
            movement_type: Some(MovementType::Out),
            ..MovementQuery::default()
        };
        assert!(!by_type.is_unfiltered());
        assert!(AssignmentQuery::all().is_unfiltered());
    }
}
