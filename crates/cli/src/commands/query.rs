use std::sync::Arc;

use crate::commands::CommandResult;
use salescope_agent::gateway::QueryGateway;
use salescope_core::config::{AppConfig, LoadOptions};
use salescope_warehouse::{connect_with_settings, SqlWarehouse};

/// Runs one statement through the gateway and prints the boundary string
/// verbatim, the same text an agent tool call would receive.
pub fn run(sql: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "query",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "query",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.warehouse.url,
            config.warehouse.max_connections,
            config.warehouse.timeout_secs,
        )
        .await
        .map_err(|error| ("warehouse_connectivity", error.to_string(), 4u8))?;

        let gateway = QueryGateway::new(
            Arc::new(SqlWarehouse::new(pool.clone())),
            config.warehouse.max_result_rows,
        );
        let output = gateway.execute(sql).await;

        pool.close().await;
        Ok::<String, (&'static str, String, u8)>(output)
    });

    match result {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("query", error_class, message, exit_code)
        }
    }
}
