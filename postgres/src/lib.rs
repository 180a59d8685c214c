//! `PostgreSQL` persistence client for the kitroom warehouse.
//!
//! Implements the generic [`PersistenceClient`] from `kitroom-core` over a sqlx
//! connection pool. Rows travel as JSON objects: selects return `to_jsonb` of
//! each row, inserts and updates go through `jsonb_populate_record`, so one
//! set of queries serves every table.
//!
//! Backend failures are mapped to [`QueryError`] by SQLSTATE:
//!
//! - `42501` → [`QueryError::PermissionDenied`] (row-level security)
//! - class `23` → [`QueryError::Constraint`]
//! - class `22` → [`QueryError::InvalidQuery`] (value does not fit the column)
//! - I/O, TLS and pool failures → [`QueryError::Transport`]
//!
//! # Example
//!
//! ```no_run
//! use kitroom_postgres::PostgresPersistence;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresPersistence::connect("postgres://localhost/kitroom", 5, 30).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use kitroom_core::persistence::{
    BoxFuture, Filter, PersistenceClient, QueryError, Row, SortOrder, Table,
};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

const SCHEMA: &str = include_str!("../migrations/0001_warehouse.sql");

/// Generic row store backed by `PostgreSQL`.
#[derive(Clone, Debug)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Open a connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Transport`] if the database cannot be reached
    /// within `connect_timeout_secs`.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, QueryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the warehouse tables and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if any statement fails.
    pub async fn migrate(&self) -> Result<(), QueryError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(Table::BaseItems, &e))?;
        tracing::info!("Warehouse schema applied");
        Ok(())
    }

    async fn select_rows(&self, table: Table, filter: Filter) -> Result<Vec<Row>, QueryError> {
        let mut conditions = Row::new();
        for (column, value) in filter.conditions {
            conditions.insert(checked_column(&column)?.to_string(), value);
        }

        let mut sql = format!(
            "SELECT to_jsonb(t) FROM {} t WHERE to_jsonb(t) @> $1",
            table.name()
        );
        if let Some((column, order)) = &filter.order_by {
            let direction = match order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            sql.push_str(&format!(
                " ORDER BY t.\"{}\" {direction}, {}",
                checked_column(column)?,
                tiebreak(table)
            ));
        }

        let values: Vec<Value> = sqlx::query_scalar(&sql)
            .bind(Value::Object(conditions))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_error(table, &e))?;

        values
            .into_iter()
            .map(|value| into_row(table, value))
            .collect()
    }

    async fn insert_row(&self, table: Table, row: Row) -> Result<Row, QueryError> {
        let sql = format!(
            "INSERT INTO {name} AS t SELECT * FROM jsonb_populate_record(NULL::{name}, $1) \
             RETURNING to_jsonb(t.*)",
            name = table.name()
        );

        let value: Value = sqlx::query_scalar(&sql)
            .bind(Value::Object(row))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_error(table, &e))?;
        into_row(table, value)
    }

    async fn update_row(&self, table: Table, id: &str, patch: Row) -> Result<Option<Row>, QueryError> {
        if patch.get("id").is_some_and(|new_id| new_id.as_str() != Some(id)) {
            return Err(QueryError::InvalidQuery(format!(
                "cannot change the id of a {table} row"
            )));
        }

        let columns = patch
            .keys()
            .filter(|column| column.as_str() != "id")
            .map(|column| checked_column(column).map(|c| format!("\"{c}\"")))
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            let mut found = self.select_rows(table, Filter::eq("id", id)).await?;
            return Ok(found.pop());
        }

        let list = columns.join(", ");
        let assignment = if columns.len() == 1 {
            format!("{list} = (SELECT {list} FROM jsonb_populate_record(NULL::{}, $1))", table.name())
        } else {
            format!("({list}) = (SELECT {list} FROM jsonb_populate_record(NULL::{}, $1))", table.name())
        };
        let sql = format!(
            "UPDATE {} AS t SET {assignment} WHERE t.id = $2 RETURNING to_jsonb(t.*)",
            table.name()
        );

        let value: Option<Value> = sqlx::query_scalar(&sql)
            .bind(Value::Object(patch))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_error(table, &e))?;
        value.map(|v| into_row(table, v)).transpose()
    }

    async fn delete_row(&self, table: Table, id: &str) -> Result<u64, QueryError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", table.name());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error(table, &e))?;
        Ok(result.rows_affected())
    }
}

impl PersistenceClient for PostgresPersistence {
    fn select(&self, table: Table, filter: Filter) -> BoxFuture<'_, Result<Vec<Row>, QueryError>> {
        Box::pin(self.select_rows(table, filter))
    }

    fn insert(&self, table: Table, row: Row) -> BoxFuture<'_, Result<Row, QueryError>> {
        Box::pin(self.insert_row(table, row))
    }

    fn update(
        &self,
        table: Table,
        id: &str,
        patch: Row,
    ) -> BoxFuture<'_, Result<Option<Row>, QueryError>> {
        let id = id.to_string();
        Box::pin(async move { self.update_row(table, &id, patch).await })
    }

    fn delete(&self, table: Table, id: &str) -> BoxFuture<'_, Result<u64, QueryError>> {
        let id = id.to_string();
        Box::pin(async move { self.delete_row(table, &id).await })
    }
}

/// Secondary sort for equal keys: oldest write first, as rows were inserted.
const fn tiebreak(table: Table) -> &'static str {
    match table {
        Table::BaseItems | Table::ItemVariants | Table::InventoryMovements => {
            "t.created_at ASC, t.id ASC"
        }
        Table::ItemAssignments | Table::Players => "t.id ASC",
    }
}

/// Column names are interpolated into SQL, so only plain identifiers pass.
fn checked_column(column: &str) -> Result<&str, QueryError> {
    let valid = !column.is_empty()
        && column.len() <= 63
        && column
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !column.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(column)
    } else {
        Err(QueryError::InvalidQuery(format!("invalid column name: {column:?}")))
    }
}

fn into_row(table: Table, value: Value) -> Result<Row, QueryError> {
    match value {
        Value::Object(row) => Ok(row),
        other => Err(QueryError::Decode {
            table,
            message: format!("expected a JSON object, got {other}"),
        }),
    }
}

fn map_error(table: Table, err: &sqlx::Error) -> QueryError {
    let mapped = match err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.to_string()).unwrap_or_default();
            let message = db.message().to_string();
            if code == "42501" {
                QueryError::PermissionDenied { table, message }
            } else if code.starts_with("23") {
                QueryError::Constraint { table, message }
            } else if code.starts_with("22") {
                QueryError::InvalidQuery(format!("{table}: {message}"))
            } else {
                QueryError::Backend(format!("{table}: {message} (SQLSTATE {code})"))
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => QueryError::Transport(err.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => QueryError::Decode {
            table,
            message: err.to_string(),
        },
        _ => QueryError::Backend(err.to_string()),
    };

    metrics::counter!("warehouse_postgres_errors_total", "table" => table.name()).increment(1);
    tracing::debug!(table = %table, error = %err, "PostgreSQL operation failed");
    mapped
}
