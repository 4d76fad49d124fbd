//! Warehouse client seam.
//!
//! The gateway only ever talks to the [`Warehouse`] trait: a SQL string in, a
//! bounded [`ResultSet`] of stringified values out. Any engine satisfying the
//! contract is substitutable; [`SqlWarehouse`] is the sqlx-backed one.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use thiserror::Error;

use crate::connection::WarehousePool;

/// Ordered columns plus stringified rows, already truncated to the row cap
/// the caller requested.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The engine rejected the statement (syntax, missing table, ...).
    #[error("warehouse query failed: {0}")]
    Query(String),
    #[error("warehouse connection failed: {0}")]
    Connection(String),
    #[error("warehouse value decode failed: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute `sql` and materialize at most `max_rows` rows.
    async fn select(&self, sql: &str, max_rows: usize) -> Result<ResultSet, WarehouseError>;
}

#[derive(Clone)]
pub struct SqlWarehouse {
    pool: WarehousePool,
}

impl SqlWarehouse {
    pub fn new(pool: WarehousePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &WarehousePool {
        &self.pool
    }
}

#[async_trait]
impl Warehouse for SqlWarehouse {
    async fn select(&self, sql: &str, max_rows: usize) -> Result<ResultSet, WarehouseError> {
        let mut stream = sqlx::query(sql).fetch(&self.pool);

        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();

        // Rows stream so the engine never materializes more than the cap.
        while let Some(row) = stream.try_next().await.map_err(classify)? {
            if columns.is_empty() {
                columns = row.columns().iter().map(|column| column.name().to_string()).collect();
            }
            rows.push(render_row(&row)?);
            if rows.len() >= max_rows {
                break;
            }
        }

        Ok(ResultSet { columns, rows })
    }
}

fn classify(error: sqlx::Error) -> WarehouseError {
    match error {
        sqlx::Error::Database(db_error) => WarehouseError::Query(db_error.message().to_string()),
        sqlx::Error::Io(io_error) => WarehouseError::Connection(io_error.to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            WarehouseError::Connection(error.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            WarehouseError::Decode(error.to_string())
        }
        other => WarehouseError::Query(other.to_string()),
    }
}

fn render_row(row: &SqliteRow) -> Result<Vec<String>, WarehouseError> {
    let column_count = row.columns().len();
    let mut values = Vec::with_capacity(column_count);
    for index in 0..column_count {
        values.push(render_value(row, index)?);
    }
    Ok(values)
}

/// Stringify one field according to its SQLite storage class.
fn render_value(row: &SqliteRow, index: usize) -> Result<String, WarehouseError> {
    let raw = row.try_get_raw(index).map_err(|error| WarehouseError::Decode(error.to_string()))?;
    if raw.is_null() {
        return Ok("NULL".to_string());
    }

    let type_name = raw.type_info().name().to_string();
    let rendered = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => {
            row.try_get::<i64, _>(index).map(|value| value.to_string())
        }
        "REAL" | "NUMERIC" => row.try_get::<f64, _>(index).map(|value| value.to_string()),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(|bytes| {
            bytes.iter().map(|byte| format!("{byte:02x}")).collect::<String>()
        }),
        _ => row.try_get::<String, _>(index),
    };

    rendered.map_err(|error| WarehouseError::Decode(error.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::client::{SqlWarehouse, Warehouse, WarehouseError};
    use crate::connection::connect_with_settings;

    async fn seeded_warehouse() -> SqlWarehouse {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("pool should connect");

        sqlx::query(
            "CREATE TABLE readings (id INTEGER PRIMARY KEY, label TEXT, score REAL, note TEXT)",
        )
        .execute(&pool)
        .await
        .expect("schema should apply");

        for index in 1..=60_i64 {
            sqlx::query("INSERT INTO readings (id, label, score, note) VALUES (?, ?, ?, ?)")
                .bind(index)
                .bind(format!("row-{index}"))
                .bind(index as f64 * 0.5)
                .bind(Option::<String>::None)
                .execute(&pool)
                .await
                .expect("insert should succeed");
        }

        SqlWarehouse::new(pool)
    }

    #[tokio::test]
    async fn select_preserves_schema_order_and_stringifies_values() {
        let warehouse = seeded_warehouse().await;

        let result = warehouse
            .select("SELECT id, label, score, note FROM readings ORDER BY id LIMIT 2", 50)
            .await
            .expect("select should succeed");

        assert_eq!(result.columns, vec!["id", "label", "score", "note"]);
        assert_eq!(result.rows[0], vec!["1", "row-1", "0.5", "NULL"]);
        assert_eq!(result.rows[1], vec!["2", "row-2", "1", "NULL"]);
    }

    #[tokio::test]
    async fn select_stops_at_the_requested_row_cap() {
        let warehouse = seeded_warehouse().await;

        let result = warehouse
            .select("SELECT id FROM readings ORDER BY id", 50)
            .await
            .expect("select should succeed");

        assert_eq!(result.rows.len(), 50);
        assert_eq!(result.rows[49], vec!["50"]);
    }

    #[tokio::test]
    async fn zero_matches_yield_an_empty_result_set() {
        let warehouse = seeded_warehouse().await;

        let result = warehouse
            .select("SELECT id FROM readings WHERE id > 1000", 50)
            .await
            .expect("select should succeed");

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn engine_rejections_surface_as_query_errors() {
        let warehouse = seeded_warehouse().await;

        let error = warehouse
            .select("SELECT nope FROM missing_table", 50)
            .await
            .expect_err("select against a missing table should fail");

        match error {
            WarehouseError::Query(message) => {
                assert!(message.contains("missing_table"), "unexpected message: {message}")
            }
            other => panic!("expected query error, got {other:?}"),
        }
    }
}
