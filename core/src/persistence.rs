//! Generic persistence client for the hosted relational store.
//!
//! The warehouse never talks SQL. Every read and write goes through the four
//! operations of [`PersistenceClient`], which move flat key-value [`Row`]s in and
//! out of a named [`Table`]. Foreign keys are id strings.
//!
//! # Implementations
//!
//! - `PostgresPersistence` (in `kitroom-postgres`): production store
//! - `InMemoryPersistence` (in `kitroom-testing`): fast, deterministic tests
//!
//! # Example
//!
//! ```no_run
//! use kitroom_core::persistence::{Filter, PersistenceClient, QueryError, Table};
//!
//! async fn example<P: PersistenceClient>(client: &P) -> Result<(), QueryError> {
//!     let variants = client
//!         .select(Table::ItemVariants, Filter::eq("base_item_id", "item-1"))
//!         .await?;
//!     println!("{} variants", variants.len());
//!     Ok(())
//! }
//! ```

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by dyn-compatible traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A flat persisted record: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Tables (collections) the warehouse reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Catalog entries
    BaseItems,
    /// Size/color stock-keeping units
    ItemVariants,
    /// Append-only stock ledger
    InventoryMovements,
    /// Loans of variants to players
    ItemAssignments,
    /// Roster reference (read-only for the warehouse)
    Players,
}

impl Table {
    /// All tables, in dependency order (parents first).
    pub const ALL: [Self; 5] = [
        Self::BaseItems,
        Self::ItemVariants,
        Self::InventoryMovements,
        Self::ItemAssignments,
        Self::Players,
    ];

    /// Physical table name in the backing store.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BaseItems => "warehouse_items",
            Self::ItemVariants => "item_variants",
            Self::InventoryMovements => "inventory_movements",
            Self::ItemAssignments => "item_assignments",
            Self::Players => "players",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sort direction for [`Filter::order_by`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Equality filter plus optional ordering for [`PersistenceClient::select`].
///
/// All conditions must match (logical AND). An empty filter selects every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    /// `(column, value)` pairs that must all be equal
    pub conditions: Vec<(String, Value)>,
    /// Optional ordering column and direction
    pub order_by: Option<(String, SortOrder)>,
}

impl Filter {
    /// Select every row.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Select rows whose `column` equals `value`.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(column, value)
    }

    /// Add another equality condition.
    #[must_use]
    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    /// Order results by `column` ascending.
    #[must_use]
    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some((column.into(), SortOrder::Ascending));
        self
    }

    /// Order results by `column` descending.
    #[must_use]
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some((column.into(), SortOrder::Descending));
        self
    }

    /// Whether `row` satisfies every condition.
    ///
    /// Backends that filter in process (the in-memory store) use this directly.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column).unwrap_or(&Value::Null) == expected)
    }
}

/// Errors surfaced by a persistence backend.
///
/// These reach warehouse callers verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The store could not be reached (network, pool exhausted, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Row-level authorization rejected the operation.
    #[error("Permission denied on {table}: {message}")]
    PermissionDenied {
        /// Table the operation targeted
        table: Table,
        /// Backend message
        message: String,
    },

    /// A store-side constraint (foreign key, unique, not null) was violated.
    #[error("Constraint violation on {table}: {message}")]
    Constraint {
        /// Table the operation targeted
        table: Table,
        /// Backend message
        message: String,
    },

    /// A returned row could not be decoded into the expected shape.
    #[error("Decode error on {table}: {message}")]
    Decode {
        /// Table the row came from
        table: Table,
        /// What went wrong
        message: String,
    },

    /// The request itself was malformed (bad column name, non-object row).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Generic CRUD client over the backing store.
///
/// # Dyn Compatibility
///
/// Methods return [`BoxFuture`] instead of using `async fn` so the client can be
/// shared as `Arc<dyn PersistenceClient>` by every warehouse service.
///
/// # Not-found semantics
///
/// `update` returns `Ok(None)` and `delete` returns `Ok(0)` when no row has the
/// given id. Deciding whether that is an error is the caller's job.
pub trait PersistenceClient: Send + Sync {
    /// Select rows matching `filter`, ordered as requested.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the backend fails.
    fn select(&self, table: Table, filter: Filter) -> BoxFuture<'_, Result<Vec<Row>, QueryError>>;

    /// Insert `row` and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the backend fails or rejects the row.
    fn insert(&self, table: Table, row: Row) -> BoxFuture<'_, Result<Row, QueryError>>;

    /// Merge `patch` into the row with primary key `id`.
    ///
    /// Returns the updated row, or `None` when `id` does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the backend fails or rejects the patch.
    fn update(
        &self,
        table: Table,
        id: &str,
        patch: Row,
    ) -> BoxFuture<'_, Result<Option<Row>, QueryError>>;

    /// Delete the row with primary key `id`, returning the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the backend fails.
    fn delete(&self, table: Table, id: &str) -> BoxFuture<'_, Result<u64, QueryError>>;
}
