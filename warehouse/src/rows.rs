//! Persisted row shapes and their translation to domain types.
//!
//! Rows are flat and snake_case with foreign keys as id strings, the shape the
//! generic persistence client moves around. Domain types nest variants under
//! their item and serialize camelCase. Nothing outside the gateway sees a row.

use crate::requests::{NewVariant, UpdateBaseItemRequest, VariantPatch};
use crate::status::{self, StockStatus};
use crate::types::{
    AssignmentId, AssignmentStatus, BaseItem, BaseItemId, InventoryMovement, ItemAssignment,
    ItemVariant, MovementId, MovementType, Player, PlayerId, ReturnedCondition, SizeStock,
    VariantId,
};
use chrono::{DateTime, Utc};
use kitroom_core::persistence::{QueryError, Row, Table};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timestamps are written with a fixed precision so their text form sorts
/// chronologically in stores that compare JSON strings.
mod stamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(d)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<DateTime<Utc>>::deserialize(d)
        }
    }
}

/// Decode a stored row into `T`.
pub(crate) fn decode<T: DeserializeOwned>(table: Table, row: Row) -> Result<T, QueryError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| QueryError::Decode {
        table,
        message: e.to_string(),
    })
}

/// Encode `value` as a flat row for `table`.
pub(crate) fn encode<T: Serialize>(table: Table, value: &T) -> Result<Row, QueryError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(QueryError::InvalidQuery(format!(
            "{table} row must be an object, got {other}"
        ))),
        Err(e) => Err(QueryError::InvalidQuery(format!("{table}: {e}"))),
    }
}

// ============================================================================
// Base items
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BaseItemRow {
    pub id: BaseItemId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
    #[serde(with = "stamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "stamp")]
    pub updated_at: DateTime<Utc>,
}

impl BaseItemRow {
    pub fn into_domain(self, variants: Vec<ItemVariant>) -> BaseItem {
        BaseItem {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            brand: self.brand,
            sku: self.sku,
            image_url: self.image_url,
            notes: self.notes,
            sizes: self.sizes,
            variants,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Base item columns to overwrite. Absent fields are left alone; a field set
/// to `Some(None)` is cleared.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct BaseItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<SizeStock>>,
    #[serde(with = "stamp")]
    pub updated_at: DateTime<Utc>,
}

fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| Some(v).filter(|v| !v.is_empty()))
}

impl BaseItemPatch {
    pub fn from_request(request: UpdateBaseItemRequest, now: DateTime<Utc>) -> Self {
        Self {
            name: request.name,
            category: request.category,
            description: clearable(request.description),
            brand: clearable(request.brand),
            sku: clearable(request.sku),
            image_url: clearable(request.image_url),
            notes: clearable(request.notes),
            sizes: request.sizes,
            updated_at: now,
        }
    }
}

// ============================================================================
// Variants
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct VariantRow {
    pub id: VariantId,
    pub base_item_id: BaseItemId,
    pub size: String,
    pub color: String,
    pub sku: String,
    pub quantity: u32,
    pub minimum_threshold: u32,
    #[serde(default)]
    pub location: Option<String>,
    /// Stored for filtering in the store; never trusted on read.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(with = "stamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "stamp")]
    pub updated_at: DateTime<Utc>,
}

impl VariantRow {
    pub fn new(variant: NewVariant, now: DateTime<Utc>) -> Self {
        let status = status::derive_variant_status(variant.quantity, variant.minimum_threshold);
        Self {
            id: VariantId::new(),
            base_item_id: variant.base_item_id,
            size: variant.size,
            color: variant.color,
            sku: variant.sku,
            quantity: variant.quantity,
            minimum_threshold: variant.minimum_threshold,
            location: variant.location,
            status: Some(status.as_str().to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_domain(self) -> ItemVariant {
        let mut variant = ItemVariant {
            id: self.id,
            base_item_id: self.base_item_id,
            size: self.size,
            color: self.color,
            sku: self.sku,
            quantity: self.quantity,
            minimum_threshold: self.minimum_threshold,
            location: self.location,
            status: StockStatus::Out,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        variant.refresh_status();
        variant
    }
}

/// Variant columns to overwrite, with the status recomputed for the merged
/// quantity and threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct VariantPatchRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    pub status: StockStatus,
    #[serde(with = "stamp")]
    pub updated_at: DateTime<Utc>,
}

impl VariantPatchRow {
    pub fn merge(current: &ItemVariant, patch: VariantPatch, now: DateTime<Utc>) -> Self {
        let quantity = patch.quantity.unwrap_or(current.quantity);
        let threshold = patch.minimum_threshold.unwrap_or(current.minimum_threshold);
        Self {
            size: patch.size,
            color: patch.color,
            sku: patch.sku,
            quantity: patch.quantity,
            minimum_threshold: patch.minimum_threshold,
            location: clearable(patch.location),
            status: status::derive_variant_status(quantity, threshold),
            updated_at: now,
        }
    }
}

// ============================================================================
// Movements
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MovementRow {
    pub id: MovementId,
    pub base_item_id: BaseItemId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: u32,
    #[serde(with = "stamp")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub assignment_id: Option<AssignmentId>,
    #[serde(with = "stamp")]
    pub created_at: DateTime<Utc>,
}

impl From<InventoryMovement> for MovementRow {
    fn from(m: InventoryMovement) -> Self {
        Self {
            id: m.id,
            base_item_id: m.base_item_id,
            variant_id: m.variant_id,
            movement_type: m.movement_type,
            quantity: m.quantity,
            date: m.date,
            note: m.note,
            player_id: m.player_id,
            assignment_id: m.assignment_id,
            created_at: m.created_at,
        }
    }
}

impl From<MovementRow> for InventoryMovement {
    fn from(r: MovementRow) -> Self {
        Self {
            id: r.id,
            base_item_id: r.base_item_id,
            variant_id: r.variant_id,
            movement_type: r.movement_type,
            quantity: r.quantity,
            date: r.date,
            note: r.note,
            player_id: r.player_id,
            assignment_id: r.assignment_id,
            created_at: r.created_at,
        }
    }
}

// ============================================================================
// Assignments
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AssignmentRow {
    pub id: AssignmentId,
    pub variant_id: VariantId,
    pub base_item_id: BaseItemId,
    pub player_id: PlayerId,
    pub quantity: u32,
    #[serde(with = "stamp")]
    pub assign_date: DateTime<Utc>,
    #[serde(with = "stamp")]
    pub expected_return_date: DateTime<Utc>,
    #[serde(default, with = "stamp::option")]
    pub return_date: Option<DateTime<Utc>>,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub returned_condition: Option<ReturnedCondition>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<ItemAssignment> for AssignmentRow {
    fn from(a: ItemAssignment) -> Self {
        Self {
            id: a.id,
            variant_id: a.variant_id,
            base_item_id: a.base_item_id,
            player_id: a.player_id,
            quantity: a.quantity,
            assign_date: a.assign_date,
            expected_return_date: a.expected_return_date,
            return_date: a.return_date,
            status: a.status,
            returned_condition: a.returned_condition,
            notes: a.notes,
        }
    }
}

impl From<AssignmentRow> for ItemAssignment {
    fn from(r: AssignmentRow) -> Self {
        Self {
            id: r.id,
            variant_id: r.variant_id,
            base_item_id: r.base_item_id,
            player_id: r.player_id,
            quantity: r.quantity,
            assign_date: r.assign_date,
            expected_return_date: r.expected_return_date,
            return_date: r.return_date,
            status: r.status,
            returned_condition: r.returned_condition,
            notes: r.notes,
        }
    }
}

/// Lifecycle columns of an assignment, written together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct AssignmentStatePatch {
    pub status: AssignmentStatus,
    #[serde(with = "stamp::option")]
    pub return_date: Option<DateTime<Utc>>,
    pub returned_condition: Option<ReturnedCondition>,
}

impl AssignmentStatePatch {
    pub const fn returned(at: DateTime<Utc>, condition: ReturnedCondition) -> Self {
        Self {
            status: AssignmentStatus::Returned,
            return_date: Some(at),
            returned_condition: Some(condition),
        }
    }

    pub const fn reopened() -> Self {
        Self {
            status: AssignmentStatus::Assigned,
            return_date: None,
            returned_condition: None,
        }
    }
}

// ============================================================================
// Players
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PlayerRow {
    pub id: PlayerId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub jersey_number: Option<u32>,
}

impl From<PlayerRow> for Player {
    fn from(r: PlayerRow) -> Self {
        Self {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            jersey_number: r.jersey_number,
        }
    }
}

impl From<Player> for PlayerRow {
    fn from(p: Player) -> Self {
        Self {
            id: p.id,
            first_name: p.first_name,
            last_name: p.last_name,
            jersey_number: p.jersey_number,
        }
    }
}

/// Flat row for seeding the roster table, which the warehouse never writes.
///
/// # Errors
///
/// Returns [`QueryError::InvalidQuery`] if the player cannot be encoded.
pub fn player_row(player: &Player) -> Result<Row, QueryError> {
    encode(Table::Players, &PlayerRow::from(player.clone()))
}
