use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use salescope_warehouse::WarehousePool;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    pool: WarehousePool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub warehouse: HealthCheck,
    pub checked_at: String,
}

pub fn router(pool: WarehousePool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { pool })
}

pub async fn spawn(bind_address: &str, port: u16, pool: WarehousePool) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(pool)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let warehouse = warehouse_check(&state.pool).await;
    let ready = warehouse.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "salescope-server runtime initialized".to_string(),
        },
        warehouse,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn warehouse_check(pool: &WarehousePool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "warehouse query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("warehouse query failed: {error}") }
        }
    }
}
