use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub type WarehousePool = sqlx::SqlitePool;

pub async fn connect(warehouse_url: &str) -> Result<WarehousePool, sqlx::Error> {
    connect_with_settings(warehouse_url, 5, 30).await
}

pub async fn connect_with_settings(
    warehouse_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<WarehousePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(warehouse_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await
}
