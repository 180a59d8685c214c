//! In-memory persistence for fast, deterministic testing.
//!
//! - [`InMemoryPersistence`]: table-per-`Vec` row storage implementing
//!   [`PersistenceClient`]
//! - [`Operation`]: operation log entries for asserting round trips
//! - failure injection via [`InMemoryPersistence::fail_next`] and
//!   [`InMemoryPersistence::fail_next_on`]

use kitroom_core::persistence::{
    BoxFuture, Filter, PersistenceClient, QueryError, Row, SortOrder, Table,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Kind of client call, as recorded in the operation log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `select`
    Select,
    /// `insert`
    Insert,
    /// `update`
    Update,
    /// `delete`
    Delete,
}

#[derive(Debug)]
struct PlannedFailure {
    table: Option<Table>,
    operation: Option<Operation>,
    error: QueryError,
}

impl PlannedFailure {
    fn applies_to(&self, table: Table, operation: Operation) -> bool {
        self.table.is_none_or(|t| t == table) && self.operation.is_none_or(|o| o == operation)
    }
}

/// In-memory backing store.
///
/// Rows keep insertion order, so ties under [`Filter::order_by`] come back in
/// the order they were written. Primary keys live in the `id` column.
///
/// # Example
///
/// ```
/// use kitroom_core::persistence::{Filter, PersistenceClient, Table};
/// use kitroom_testing::InMemoryPersistence;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryPersistence::new();
/// let row = json!({"id": "p1", "name": "Rossi"}).as_object().cloned().unwrap_or_default();
/// store.insert(Table::Players, row).await?;
///
/// let players = store.select(Table::Players, Filter::all()).await?;
/// assert_eq!(players.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryPersistence {
    tables: Arc<RwLock<HashMap<Table, Vec<Row>>>>,
    failures: Arc<Mutex<VecDeque<PlannedFailure>>>,
    log: Arc<Mutex<Vec<(Operation, Table)>>>,
}

impl InMemoryPersistence {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of any kind fail with `error`.
    pub fn fail_next(&self, error: QueryError) {
        self.push_failure(PlannedFailure {
            table: None,
            operation: None,
            error,
        });
    }

    /// Make the next `operation` on `table` fail with `error`.
    pub fn fail_next_on(&self, table: Table, operation: Operation, error: QueryError) {
        self.push_failure(PlannedFailure {
            table: Some(table),
            operation: Some(operation),
            error,
        });
    }

    /// Snapshot of every row in `table`, in insertion order.
    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of rows in `table`.
    #[must_use]
    pub fn count(&self, table: Table) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table)
            .map_or(0, Vec::len)
    }

    /// Insert a row directly, bypassing the log and failure plan.
    ///
    /// Used to seed reference data such as players.
    pub fn seed(&self, table: Table, row: Row) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table)
            .or_default()
            .push(row);
    }

    /// Every call made so far, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<(Operation, Table)> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of calls of `operation` against `table`.
    #[must_use]
    pub fn operation_count(&self, operation: Operation, table: Table) -> usize {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| **entry == (operation, table))
            .count()
    }

    /// Drop all rows, planned failures and log entries.
    pub fn clear(&self) {
        self.tables.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn push_failure(&self, failure: PlannedFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(failure);
    }

    /// Log the call and pop a planned failure that applies to it.
    fn begin(&self, operation: Operation, table: Table) -> Result<(), QueryError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((operation, table));

        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        match failures.iter().position(|f| f.applies_to(table, operation)) {
            Some(index) => match failures.remove(index) {
                Some(failure) => Err(failure.error),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn select_now(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, QueryError> {
        self.begin(Operation::Select, table)?;

        let mut rows: Vec<Row> = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some((column, order)) = &filter.order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                );
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        Ok(rows)
    }

    fn insert_now(&self, table: Table, row: Row) -> Result<Row, QueryError> {
        self.begin(Operation::Insert, table)?;

        let Some(id) = row.get("id").and_then(Value::as_str).map(str::to_owned) else {
            return Err(QueryError::InvalidQuery(format!(
                "row inserted into {table} has no string id"
            )));
        };

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let rows = tables.entry(table).or_default();
        if rows.iter().any(|existing| row_id(existing) == Some(id.as_str())) {
            return Err(QueryError::Constraint {
                table,
                message: format!("duplicate key value violates unique constraint: id={id}"),
            });
        }
        rows.push(row.clone());
        Ok(row)
    }

    fn update_now(&self, table: Table, id: &str, patch: Row) -> Result<Option<Row>, QueryError> {
        self.begin(Operation::Update, table)?;

        if patch.get("id").is_some_and(|new_id| new_id.as_str() != Some(id)) {
            return Err(QueryError::InvalidQuery(format!(
                "patch for {table} row {id} attempts to change its id"
            )));
        }

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let Some(existing) = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
        else {
            return Ok(None);
        };

        for (column, value) in patch {
            existing.insert(column, value);
        }
        Ok(Some(existing.clone()))
    }

    fn delete_now(&self, table: Table, id: &str) -> Result<u64, QueryError> {
        self.begin(Operation::Delete, table)?;

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let Some(rows) = tables.get_mut(&table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| row_id(row) != Some(id));
        Ok((before - rows.len()) as u64)
    }
}

impl PersistenceClient for InMemoryPersistence {
    fn select(&self, table: Table, filter: Filter) -> BoxFuture<'_, Result<Vec<Row>, QueryError>> {
        Box::pin(async move { self.select_now(table, &filter) })
    }

    fn insert(&self, table: Table, row: Row) -> BoxFuture<'_, Result<Row, QueryError>> {
        Box::pin(async move { self.insert_now(table, row) })
    }

    fn update(
        &self,
        table: Table,
        id: &str,
        patch: Row,
    ) -> BoxFuture<'_, Result<Option<Row>, QueryError>> {
        let id = id.to_owned();
        Box::pin(async move { self.update_now(table, &id, patch) })
    }

    fn delete(&self, table: Table, id: &str) -> BoxFuture<'_, Result<u64, QueryError>> {
        let id = id.to_owned();
        Box::pin(async move { self.delete_now(table, &id) })
    }
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

/// Total order used for `order_by`: nulls first, then numbers, then strings.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
