//! Domain types for the warehouse.
//!
//! Base items own their variants; movements and assignments point at
//! variants, items and players by id. Everything here serializes camelCase,
//! the shape the presentation layer consumes. The flat persisted rows stay
//! private to the gateway.

use crate::status::{self, StockStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a base item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseItemId(Uuid);

impl BaseItemId {
    /// Creates a new random `BaseItemId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BaseItemId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BaseItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BaseItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an item variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(Uuid);

impl VariantId {
    /// Creates a new random `VariantId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `VariantId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for VariantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ledger movement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementId(Uuid);

impl MovementId {
    /// Creates a new random `MovementId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MovementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a player assignment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    /// Creates a new random `AssignmentId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `AssignmentId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a player in the roster.
///
/// Players are owned by the roster; the warehouse only references them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Creates a new random `PlayerId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PlayerId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Kind of stock-affecting event.
///
/// The stored quantity is always positive; the direction comes from the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Stock loaded into the warehouse
    In,
    /// Stock unloaded (sold, consumed, given away)
    Out,
    /// Stock loaned to a player
    Assign,
    /// Loaned stock coming back
    Return,
    /// Stock lost
    Lost,
    /// Stock damaged beyond use
    Damaged,
}

/// Which way a movement moves stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Adds to the variant's quantity
    Inbound,
    /// Removes from the variant's quantity
    Outbound,
}

impl MovementType {
    /// All movement kinds.
    pub const ALL: [Self; 6] = [
        Self::In,
        Self::Out,
        Self::Assign,
        Self::Return,
        Self::Lost,
        Self::Damaged,
    ];

    /// Persisted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::Assign => "assign",
            Self::Return => "return",
            Self::Lost => "lost",
            Self::Damaged => "damaged",
        }
    }

    /// Direction implied by the kind.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::In | Self::Return => Direction::Inbound,
            Self::Out | Self::Assign | Self::Lost | Self::Damaged => Direction::Outbound,
        }
    }

    /// Whether the movement must name a player.
    #[must_use]
    pub const fn requires_player(self) -> bool {
        matches!(self, Self::Assign | Self::Return)
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| crate::error::ValidationError::UnknownMovementType(s.to_string()))
    }
}

/// Lifecycle state of a loan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    /// Out with the player
    Assigned,
    /// Back in the warehouse (terminal)
    Returned,
    /// Reserved; no flow produces it
    Pending,
}

impl AssignmentStatus {
    /// Persisted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Returned => "returned",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition of loaned stock when it comes back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnedCondition {
    /// Reusable as is
    #[default]
    Good,
    /// Reusable but visibly used
    Worn,
    /// Came back damaged
    Damaged,
}

impl ReturnedCondition {
    /// Persisted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Worn => "worn",
            Self::Damaged => "damaged",
        }
    }
}

impl fmt::Display for ReturnedCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Lightweight size record embedded in a base item.
///
/// Items that do not track full variants keep per-size counts here and share
/// the fixed [`status::EMBEDDED_SIZES_LOW_WATER_MARK`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeStock {
    /// Size label (S, M, L, 38, ...)
    pub size: String,
    /// Units on hand
    pub quantity: u32,
}

impl SizeStock {
    /// Creates a size record
    #[must_use]
    pub fn new(size: impl Into<String>, quantity: u32) -> Self {
        Self {
            size: size.into(),
            quantity,
        }
    }
}

/// A concrete stock-keeping unit of a base item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVariant {
    /// Unique identifier
    pub id: VariantId,
    /// Owning base item
    pub base_item_id: BaseItemId,
    /// Size label
    pub size: String,
    /// Color (name or hex code)
    pub color: String,
    /// Stock-keeping code
    pub sku: String,
    /// Units on hand
    pub quantity: u32,
    /// At or below this many units the variant is low
    pub minimum_threshold: u32,
    /// Shelf or room where the variant is stored
    pub location: Option<String>,
    /// Derived from `quantity` and `minimum_threshold`
    pub status: StockStatus,
    /// When the variant was created
    pub created_at: DateTime<Utc>,
    /// When the variant was last changed
    pub updated_at: DateTime<Utc>,
}

impl ItemVariant {
    /// Recompute `status` from the current quantity and threshold.
    pub fn refresh_status(&mut self) {
        self.status = status::derive_variant_status(self.quantity, self.minimum_threshold);
    }

    /// Whether this variant has the same size and color as the given pair.
    ///
    /// Labels are compared trimmed and case-insensitively.
    #[must_use]
    pub fn has_size_and_color(&self, size: &str, color: &str) -> bool {
        same_label(&self.size, size) && same_label(&self.color, color)
    }
}

/// A catalog entry with its variants embedded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseItem {
    /// Unique identifier
    pub id: BaseItemId,
    /// Display name
    pub name: String,
    /// Category (kit, training, medical, ...)
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
    /// Embedded size counts (simplified model)
    pub sizes: Vec<SizeStock>,
    /// Owned variants; empty when none exist
    pub variants: Vec<ItemVariant>,
    /// When the item was created
    pub created_at: DateTime<Utc>,
    /// When the item was last changed
    pub updated_at: DateTime<Utc>,
}

impl BaseItem {
    /// Units on hand across variants, or across embedded sizes when the item
    /// has no variants.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        if self.variants.is_empty() {
            self.sizes.iter().map(|s| u64::from(s.quantity)).sum()
        } else {
            self.variants.iter().map(|v| u64::from(v.quantity)).sum()
        }
    }

    /// Aggregate status of the item.
    ///
    /// Entity variants take precedence; the embedded sizes model is used only
    /// when the item has no variants. An item with neither is out of stock.
    #[must_use]
    pub fn aggregate_status(&self) -> StockStatus {
        if self.variants.is_empty() {
            status::derive_sizes_status(&self.sizes)
        } else {
            status::derive_aggregate_status(&self.variants)
        }
    }

    /// Variant with the given id, if owned by this item.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&ItemVariant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

/// Append-only ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMovement {
    /// Unique identifier
    pub id: MovementId,
    /// Affected base item
    pub base_item_id: BaseItemId,
    /// Affected variant, absent on entries that predate variants
    pub variant_id: Option<VariantId>,
    /// Kind of movement
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Units moved, always positive
    pub quantity: u32,
    /// When the movement happened
    pub date: DateTime<Utc>,
    /// Free-text note
    pub note: Option<String>,
    /// Player involved (assign/return)
    pub player_id: Option<PlayerId>,
    /// Assignment opened or closed by this movement
    pub assignment_id: Option<AssignmentId>,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

/// A variant's stock loaned to a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAssignment {
    /// Unique identifier
    pub id: AssignmentId,
    /// Loaned variant
    pub variant_id: VariantId,
    /// Base item of the loaned variant
    pub base_item_id: BaseItemId,
    /// Borrowing player
    pub player_id: PlayerId,
    /// Units loaned
    pub quantity: u32,
    /// When the loan started
    pub assign_date: DateTime<Utc>,
    /// When the loan should end
    pub expected_return_date: DateTime<Utc>,
    /// When the stock actually came back
    pub return_date: Option<DateTime<Utc>>,
    /// Lifecycle state
    pub status: AssignmentStatus,
    /// Condition on return
    pub returned_condition: Option<ReturnedCondition>,
    /// Free-text notes
    pub notes: Option<String>,
}

impl ItemAssignment {
    /// Whether the loan is still open.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        self.status == AssignmentStatus::Assigned
    }

    /// Whether the loan is open and past its expected return date.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_outstanding() && self.expected_return_date < now
    }
}

/// Roster entry, as far as the warehouse needs to know it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Roster identifier
    pub id: PlayerId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Shirt number
    pub jersey_number: Option<u32>,
}

impl Player {
    /// "First Last"
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Same rule as the store's `lower(btrim(..))` unique index.
pub(crate) fn same_label(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
