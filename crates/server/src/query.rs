//! The question-answering HTTP surface: `POST /query`.
//!
//! Request and response bodies are single-field JSON objects. Every runtime
//! failure collapses to a generic 500; details stay in the logs, keyed by a
//! per-request correlation id.

use std::future::IntoFuture;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use salescope_agent::runtime::AgentRuntime;
use salescope_core::errors::ApplicationError;

#[derive(Clone)]
pub struct QueryState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: &'static str,
}

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    // Browser dashboards call this from arbitrary origins.
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .layer(cors)
        .with_state(QueryState { runtime })
}

pub async fn serve(
    bind_address: &str,
    port: u16,
    runtime: Arc<AgentRuntime>,
    shutdown_grace: std::time::Duration,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.query.start",
        bind_address = %address,
        "query endpoint started"
    );

    let server = axum::serve(listener, router(runtime))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .into_future();

    // In-flight requests get `shutdown_grace` to drain after the signal.
    tokio::select! {
        result = server => result,
        _ = async {
            let _ = tokio::signal::ctrl_c().await;
            tokio::time::sleep(shutdown_grace).await;
        } => Ok(()),
    }
}

pub async fn handle_query(
    State(state): State<QueryState>,
    Json(body): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let correlation_id = Uuid::new_v4().simple().to_string();

    info!(
        event_name = "server.query.received",
        correlation_id = %correlation_id,
        question_chars = body.question.len()
    );

    match state.runtime.answer(&body.question).await {
        Ok(answer) => {
            info!(
                event_name = "server.query.answered",
                correlation_id = %correlation_id,
                answer_chars = answer.len()
            );
            Ok(Json(QueryResponse { answer }))
        }
        Err(failure) => {
            error!(
                event_name = "server.query.failed",
                correlation_id = %correlation_id,
                error = %format!("{failure:#}")
            );
            let interface =
                ApplicationError::Agent(failure.to_string()).into_interface(correlation_id);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { detail: interface.user_message() }),
            ))
        }
    }
}
