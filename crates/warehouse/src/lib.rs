pub mod client;
pub mod connection;
pub mod fixtures;

pub use client::{ResultSet, SqlWarehouse, Warehouse, WarehouseError};
pub use connection::{connect, connect_with_settings, WarehousePool};
pub use fixtures::{SeedSummary, VerificationResult};
