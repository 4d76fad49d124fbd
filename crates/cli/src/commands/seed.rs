use crate::commands::CommandResult;
use salescope_core::config::{AppConfig, LoadOptions};
use salescope_warehouse::{connect_with_settings, fixtures};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
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
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let sales_table = config.profiles.sales_table.clone();
    let promo_table = config.profiles.promo_table.clone();

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.warehouse.url,
            config.warehouse.max_connections,
            config.warehouse.timeout_secs,
        )
        .await
        .map_err(|error| ("warehouse_connectivity", error.to_string(), 4u8))?;

        let summary = fixtures::seed(&pool, &sales_table, &promo_table)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = fixtures::verify(&pool, &sales_table, &promo_table)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if !verification.all_present {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            let message = if failed_checks.is_empty() {
                "Some seed data failed to load".to_string()
            } else {
                format!("Seed verification failed for checks: {}", failed_checks.join(", "))
            };
            Err(("seed_verification", message, 6u8))
        } else {
            Ok(summary)
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(summary) => CommandResult::success(
            "seed",
            format!(
                "Deterministic fixtures loaded: {} rows into `{sales_table}`, {} rows into `{promo_table}`",
                summary.sales_rows, summary.promo_rows
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
