//! The warehouse query gateway.
//!
//! Accepts free-form SQL produced by the upstream model, enforces the
//! SELECT-only policy, executes with a hard row cap, and serializes the
//! outcome to a single string. Nothing escapes this boundary as an error:
//! the calling runtime always receives text it can hand back to the model.

use std::sync::Arc;

use tracing::{info, warn};

use salescope_warehouse::{ResultSet, Warehouse, WarehouseError};

pub const REJECTION_MESSAGE: &str =
    "ERROR: Only SELECT queries are allowed for security reasons.";
pub const EMPTY_RESULT_MESSAGE: &str =
    "Query executed successfully, but no results were found.";

/// Tagged per-call outcome. Constructed fresh on every call, never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Header line plus up to `max_rows` data lines, comma-joined.
    Rows(String),
    /// The statement ran but matched nothing. Informational, not an error.
    Empty,
    /// Policy violation: the text does not start with SELECT.
    Rejected,
    /// Engine or transport failure, message carries the upstream text.
    Failure(String),
}

impl QueryOutcome {
    pub fn into_text(self) -> String {
        match self {
            Self::Rows(serialized) => serialized,
            Self::Empty => EMPTY_RESULT_MESSAGE.to_string(),
            Self::Rejected => REJECTION_MESSAGE.to_string(),
            Self::Failure(message) => message,
        }
    }
}

/// One parameterized gateway instance serves every agent profile; only the
/// row cap varies. Stateless between calls, so the host may run independent
/// invocations concurrently - each borrows its own pooled session.
pub struct QueryGateway {
    warehouse: Arc<dyn Warehouse>,
    max_rows: usize,
}

impl QueryGateway {
    pub fn new(warehouse: Arc<dyn Warehouse>, max_rows: usize) -> Self {
        Self { warehouse, max_rows }
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// The tool-call boundary: always a string, never an error.
    pub async fn execute(&self, sql: &str) -> String {
        self.run(sql).await.into_text()
    }

    pub async fn run(&self, sql: &str) -> QueryOutcome {
        // Normalization is for the policy check only; the warehouse sees the
        // original text.
        if !is_select(sql) {
            warn!(
                event_name = "agent.gateway.rejected",
                "non-SELECT statement rejected before reaching the warehouse"
            );
            return QueryOutcome::Rejected;
        }

        info!(event_name = "agent.gateway.query", max_rows = self.max_rows, sql = %sql);

        match self.warehouse.select(sql, self.max_rows).await {
            Ok(result) if result.is_empty() => QueryOutcome::Empty,
            Ok(result) => QueryOutcome::Rows(serialize(&result)),
            Err(WarehouseError::Query(message)) => {
                warn!(event_name = "agent.gateway.warehouse_error", error = %message);
                QueryOutcome::Failure(format!("Warehouse error: {message}"))
            }
            Err(other) => {
                warn!(event_name = "agent.gateway.unexpected_error", error = %other);
                QueryOutcome::Failure(format!(
                    "An unexpected error occurred during query execution: {other}"
                ))
            }
        }
    }
}

/// Prefix check, intentionally not a SQL parser. A batched statement like
/// `SELECT 1; DROP TABLE t` passes on engines that allow batching; callers
/// needing real isolation must enforce it at the warehouse permission layer.
fn is_select(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with("SELECT")
}

fn serialize(result: &ResultSet) -> String {
    let mut out = result.columns.join(",");
    out.push('\n');
    for row in &result.rows {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
