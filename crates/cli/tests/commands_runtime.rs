use std::env;
use std::sync::{Mutex, OnceLock};

use salescope_agent::gateway::REJECTION_MESSAGE;
use salescope_cli::commands::{doctor, query, seed};
use serde_json::Value;

#[test]
fn doctor_reports_pass_with_valid_env() {
    with_env(&single_connection_memory_env(), || {
        let output = doctor::run(true);
        let payload = parse_payload(&output);

        assert_eq!(payload["overall_status"], "pass");
        let checks = payload["checks"].as_array().expect("checks should be an array");
        assert!(checks
            .iter()
            .any(|check| check["name"] == "warehouse_connectivity" && check["status"] == "pass"));
    });
}

#[test]
fn doctor_reports_config_failure_for_unsupported_warehouse_url() {
    with_env(&[("SALESCOPE_WAREHOUSE_URL", "postgres://warehouse/sales")], || {
        let output = doctor::run(true);
        let payload = parse_payload(&output);

        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().expect("checks should be an array");
        assert!(checks
            .iter()
            .any(|check| check["name"] == "config_validation" && check["status"] == "fail"));
    });
}

#[test]
fn doctor_human_output_lists_each_check() {
    with_env(&single_connection_memory_env(), || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: all readiness checks passed"));
        assert!(output.contains("- [ok] config_validation:"));
        assert!(output.contains("- [ok] warehouse_connectivity:"));
    });
}

#[test]
fn seed_loads_and_verifies_the_fixtures() {
    with_env(&single_connection_memory_env(), || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected successful seed run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("`monthly_retail_sales`"));
        assert!(message.contains("`weekly_promo_sales`"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(&single_connection_memory_env(), || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);

        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn query_prints_the_gateway_boundary_string() {
    with_env(&single_connection_memory_env(), || {
        let result = query::run("SELECT 1 AS one");

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "one\n1\n");
    });
}

#[test]
fn query_rejects_non_select_statements() {
    with_env(&single_connection_memory_env(), || {
        let result = query::run("DROP TABLE monthly_retail_sales");

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, REJECTION_MESSAGE);
    });
}

/// A single connection keeps the in-memory schema visible across the
/// seed and verify steps.
fn single_connection_memory_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("SALESCOPE_WAREHOUSE_URL", "sqlite::memory:"),
        ("SALESCOPE_WAREHOUSE_MAX_CONNECTIONS", "1"),
    ]
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SALESCOPE_WAREHOUSE_URL",
        "SALESCOPE_WAREHOUSE_MAX_CONNECTIONS",
        "SALESCOPE_WAREHOUSE_TIMEOUT_SECS",
        "SALESCOPE_WAREHOUSE_MAX_RESULT_ROWS",
        "SALESCOPE_LLM_PROVIDER",
        "SALESCOPE_LLM_API_KEY",
        "SALESCOPE_LLM_BASE_URL",
        "SALESCOPE_LLM_MODEL",
        "SALESCOPE_LLM_TIMEOUT_SECS",
        "SALESCOPE_LLM_MAX_RETRIES",
        "SALESCOPE_CALENDAR_ENABLED",
        "SALESCOPE_CALENDAR_BASE_URL",
        "SALESCOPE_CALENDAR_API_TOKEN",
        "SALESCOPE_SERVER_BIND_ADDRESS",
        "SALESCOPE_SERVER_QUERY_PORT",
        "SALESCOPE_SERVER_HEALTH_CHECK_PORT",
        "SALESCOPE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "SALESCOPE_PROFILES_SALES_TABLE",
        "SALESCOPE_PROFILES_PROMO_TABLE",
        "SALESCOPE_LOGGING_LEVEL",
        "SALESCOPE_LOGGING_FORMAT",
        "SALESCOPE_LOG_LEVEL",
        "SALESCOPE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
