//! Deterministic demo datasets for the two warehouse tables.
//!
//! Seeding is idempotent and fully deterministic (trend and seasonality, no
//! random noise) so tests can assert on exact aggregates.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::client::WarehouseError;
use crate::connection::WarehousePool;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub sales_rows: usize,
    pub promo_rows: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub checks: Vec<(&'static str, bool)>,
    pub all_present: bool,
}

struct ProductSeed {
    id: &'static str,
    name: &'static str,
    base_sales: f64,
    growth_rate_per_month: f64,
    seasonality: [f64; 12],
}

const PRODUCTS: &[ProductSeed] = &[
    ProductSeed {
        id: "P01",
        name: "Basic T-Shirt",
        base_sales: 10_000.0,
        growth_rate_per_month: 0.005,
        seasonality: [0.9, 0.9, 1.0, 1.05, 1.1, 1.1, 1.05, 1.0, 0.95, 0.95, 1.0, 1.05],
    },
    ProductSeed {
        id: "P02",
        name: "Wireless Headphones",
        base_sales: 5_000.0,
        growth_rate_per_month: 0.015,
        seasonality: [0.8, 0.8, 0.9, 0.9, 1.0, 1.0, 1.05, 1.1, 1.2, 1.3, 1.5, 1.8],
    },
    ProductSeed {
        id: "P03",
        name: "Coffee Maker",
        base_sales: 3_000.0,
        growth_rate_per_month: 0.002,
        seasonality: [1.2, 1.0, 0.9, 0.9, 0.95, 1.0, 1.0, 1.05, 1.1, 1.15, 1.2, 1.3],
    },
    ProductSeed {
        id: "P04",
        name: "Running Shoes",
        base_sales: 7_000.0,
        growth_rate_per_month: 0.008,
        seasonality: [1.0, 1.1, 1.2, 1.15, 1.0, 0.9, 0.9, 1.0, 1.1, 1.15, 1.05, 1.0],
    },
    ProductSeed {
        id: "P05",
        name: "Denim Jeans",
        base_sales: 8_000.0,
        growth_rate_per_month: 0.003,
        seasonality: [0.9, 0.9, 1.0, 1.0, 1.0, 0.95, 1.05, 1.2, 1.15, 1.1, 1.0, 0.95],
    },
    ProductSeed {
        id: "P06",
        name: "Cookware Set",
        base_sales: 1_500.0,
        growth_rate_per_month: -0.001,
        seasonality: [0.8, 0.8, 0.9, 1.0, 1.1, 1.0, 0.9, 0.9, 1.0, 1.1, 1.2, 1.5],
    },
    ProductSeed {
        id: "P07",
        name: "Smartwatch",
        base_sales: 4_000.0,
        growth_rate_per_month: 0.02,
        seasonality: [0.9, 0.9, 1.0, 1.0, 1.05, 1.05, 1.1, 1.1, 1.2, 1.4, 1.6, 2.0],
    },
    ProductSeed {
        id: "P08",
        name: "Novelty Mug",
        base_sales: 2_000.0,
        growth_rate_per_month: -0.005,
        seasonality: [0.7, 0.75, 0.8, 0.85, 0.9, 0.95, 0.9, 0.85, 0.9, 1.0, 1.5, 2.5],
    },
    ProductSeed {
        id: "P09",
        name: "Camping Tent",
        base_sales: 1_000.0,
        growth_rate_per_month: 0.001,
        seasonality: [0.5, 0.6, 0.8, 1.2, 1.5, 1.8, 1.7, 1.3, 0.9, 0.7, 0.6, 0.5],
    },
    ProductSeed {
        id: "P10",
        name: "Weighted Blanket",
        base_sales: 2_500.0,
        growth_rate_per_month: -0.01,
        seasonality: [1.8, 1.5, 1.0, 0.8, 0.7, 0.6, 0.6, 0.7, 0.8, 1.0, 1.3, 2.0],
    },
];

const PROMO_GROUPS: &[(&str, f64)] = &[("FACE CREAM", 12_000.0), ("MOISTURISER", 9_000.0)];
const PROMO_GEOGRAPHIES: &[&str] = &["NORTH EAST", "MIDWEST"];
const PROMO_WEEKS: u32 = 52;

/// Create both tables (if missing) and load the deterministic datasets.
/// Existing rows are replaced so repeated seeding stays idempotent.
pub async fn seed(
    pool: &WarehousePool,
    sales_table: &str,
    promo_table: &str,
) -> Result<SeedSummary, WarehouseError> {
    create_schema(pool, sales_table, promo_table).await?;

    let mut tx = pool.begin().await.map_err(seed_error)?;

    sqlx::query(&format!("DELETE FROM {sales_table}"))
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?;
    sqlx::query(&format!("DELETE FROM {promo_table}"))
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?;

    let mut sales_rows = 0_usize;
    for (month_index, date) in months().iter().enumerate() {
        for product in PRODUCTS {
            let revenue = monthly_revenue(product, month_index, date.month0() as usize);
            sqlx::query(&format!(
                "INSERT INTO {sales_table} (Date, ProductId, ProductName, SalesRevenue) \
                 VALUES (?, ?, ?, ?)"
            ))
            .bind(date.format("%Y-%m-%d").to_string())
            .bind(product.id)
            .bind(product.name)
            .bind(revenue)
            .execute(&mut *tx)
            .await
            .map_err(seed_error)?;
            sales_rows += 1;
        }
    }

    let mut promo_rows = 0_usize;
    let first_week = NaiveDate::from_ymd_opt(2023, 1, 3).unwrap_or_default();
    for week in 0..PROMO_WEEKS {
        let date = first_week + chrono::Duration::weeks(week as i64);
        for (group_index, (group, base)) in PROMO_GROUPS.iter().enumerate() {
            for (geo_index, geography) in PROMO_GEOGRAPHIES.iter().enumerate() {
                let offset = week + group_index as u32 + geo_index as u32;
                let is_tpr = i64::from(offset % 4 == 0);
                let is_feature = i64::from(offset % 6 == 0);
                let is_display = i64::from(offset % 3 == 0);
                let lift = 1.0
                    + 0.25 * is_tpr as f64
                    + 0.15 * is_feature as f64
                    + 0.10 * is_display as f64;
                let value = (base * (1.0 + 0.002 * week as f64) * lift).round();

                sqlx::query(&format!(
                    "INSERT INTO {promo_table} \
                     (date, retailer_banner_geography, promoted_group, \
                      daily_weekly_value_sales, is_tpr, is_feature, is_display) \
                     VALUES (?, ?, ?, ?, ?, ?, ?)"
                ))
                .bind(date.format("%Y-%m-%d").to_string())
                .bind(*geography)
                .bind(*group)
                .bind(value)
                .bind(is_tpr)
                .bind(is_feature)
                .bind(is_display)
                .execute(&mut *tx)
                .await
                .map_err(seed_error)?;
                promo_rows += 1;
            }
        }
    }

    tx.commit().await.map_err(seed_error)?;

    Ok(SeedSummary { sales_rows, promo_rows })
}

/// Count-based sanity check after seeding.
pub async fn verify(
    pool: &WarehousePool,
    sales_table: &str,
    promo_table: &str,
) -> Result<VerificationResult, WarehouseError> {
    let sales_count: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {sales_table}"))
            .fetch_one(pool)
            .await
            .map_err(seed_error)?;
    let promo_count: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {promo_table}"))
            .fetch_one(pool)
            .await
            .map_err(seed_error)?;

    let expected_sales = (months().len() * PRODUCTS.len()) as i64;
    let expected_promo =
        (PROMO_WEEKS as usize * PROMO_GROUPS.len() * PROMO_GEOGRAPHIES.len()) as i64;

    let checks = vec![
        ("sales-row-count", sales_count == expected_sales),
        ("promo-row-count", promo_count == expected_promo),
    ];
    let all_present = checks.iter().all(|(_, passed)| *passed);

    Ok(VerificationResult { checks, all_present })
}

async fn create_schema(
    pool: &WarehousePool,
    sales_table: &str,
    promo_table: &str,
) -> Result<(), WarehouseError> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {sales_table} (\
         Date TEXT NOT NULL, \
         ProductId TEXT NOT NULL, \
         ProductName TEXT NOT NULL, \
         SalesRevenue REAL NOT NULL)"
    ))
    .execute(pool)
    .await
    .map_err(seed_error)?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {promo_table} (\
         date TEXT NOT NULL, \
         retailer_banner_geography TEXT NOT NULL, \
         promoted_group TEXT NOT NULL, \
         daily_weekly_value_sales REAL NOT NULL, \
         is_tpr INTEGER NOT NULL, \
         is_feature INTEGER NOT NULL, \
         is_display INTEGER NOT NULL)"
    ))
    .execute(pool)
    .await
    .map_err(seed_error)?;

    Ok(())
}

fn months() -> Vec<NaiveDate> {
    let mut months = Vec::with_capacity(36);
    for year in 2021..=2023 {
        for month in 1..=12_u32 {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                months.push(date);
            }
        }
    }
    months
}

fn monthly_revenue(product: &ProductSeed, month_index: usize, month0: usize) -> f64 {
    let trend = 1.0 + product.growth_rate_per_month * month_index as f64;
    let seasonal = product.seasonality[month0];
    (product.base_sales * trend * seasonal).round().max(0.0)
}

fn seed_error(error: sqlx::Error) -> WarehouseError {
    match error {
        sqlx::Error::Database(db_error) => WarehouseError::Query(db_error.message().to_string()),
        other => WarehouseError::Connection(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crate::connection::connect_with_settings;
    use crate::fixtures::{seed, verify, PRODUCTS};

    #[tokio::test]
    async fn seeding_is_idempotent_and_verifiable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("pool should connect");

        let first = seed(&pool, "monthly_retail_sales", "weekly_promo_sales")
            .await
            .expect("first seed should succeed");
        let second = seed(&pool, "monthly_retail_sales", "weekly_promo_sales")
            .await
            .expect("second seed should succeed");

        assert_eq!(first, second, "reseeding should produce identical row counts");
        assert_eq!(first.sales_rows, 36 * PRODUCTS.len());

        let verification = verify(&pool, "monthly_retail_sales", "weekly_promo_sales")
            .await
            .expect("verify should succeed");
        assert!(verification.all_present, "checks failed: {:?}", verification.checks);

        pool.close().await;
    }

    #[tokio::test]
    async fn seeded_revenue_is_deterministic() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("pool should connect");

        seed(&pool, "monthly_retail_sales", "weekly_promo_sales")
            .await
            .expect("seed should succeed");

        // Month index 0, January seasonality 0.9, base 10k -> 9000.
        let revenue: f64 = sqlx::query_scalar(
            "SELECT SalesRevenue FROM monthly_retail_sales \
             WHERE ProductId = 'P01' AND Date = '2021-01-01'",
        )
        .fetch_one(&pool)
        .await
        .expect("seeded row should exist");

        assert_eq!(revenue, 9000.0);

        pool.close().await;
    }
}
