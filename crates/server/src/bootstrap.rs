use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;
use tracing::info;

use salescope_agent::calendar::{CalendarClient, CalendarError, HttpCalendarClient};
use salescope_agent::gateway::QueryGateway;
use salescope_agent::llm::ChatCompletionsClient;
use salescope_agent::runtime::AgentRuntime;
use salescope_core::config::{AppConfig, ConfigError, LoadOptions};
use salescope_core::credentials::{CredentialError, CredentialProvider, StaticTokenSource};
use salescope_core::profile::{AgentProfile, ProfileRouter};
use salescope_warehouse::{connect_with_settings, SqlWarehouse, WarehousePool};

/// Tokens are refreshed once they are within this margin of expiry.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;
const CALENDAR_HTTP_TIMEOUT_SECS: u64 = 30;

pub struct Application {
    pub config: AppConfig,
    pub pool: WarehousePool,
    pub runtime: Arc<AgentRuntime>,
    /// Present when the calendar integration is enabled; released on shutdown.
    pub credentials: Option<Arc<CredentialProvider>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("warehouse connection failed: {0}")]
    WarehouseConnect(#[source] sqlx::Error),
    #[error("llm client construction failed: {0}")]
    Llm(#[source] anyhow::Error),
    #[error("credential acquisition failed: {0}")]
    Credentials(#[from] CredentialError),
    #[error("calendar client construction failed: {0}")]
    Calendar(#[from] CalendarError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let pool = connect_with_settings(
        &config.warehouse.url,
        config.warehouse.max_connections,
        config.warehouse.timeout_secs,
    )
    .await
    .map_err(BootstrapError::WarehouseConnect)?;
    info!(event_name = "system.bootstrap.warehouse_connected", "warehouse connection established");

    let gateway = Arc::new(QueryGateway::new(
        Arc::new(SqlWarehouse::new(pool.clone())),
        config.warehouse.max_result_rows,
    ));

    let router = ProfileRouter::new(vec![
        AgentProfile::retail_sales(&config.profiles.sales_table),
        AgentProfile::promo(&config.profiles.promo_table),
    ]);

    let llm =
        Arc::new(ChatCompletionsClient::from_config(&config.llm).map_err(BootstrapError::Llm)?);

    let (calendar, credentials) = build_calendar(&config).await?;

    let runtime = Arc::new(AgentRuntime::new(
        router,
        llm,
        gateway,
        calendar,
        config.calendar.window_days,
        config.calendar.max_events,
    ));

    info!(
        event_name = "system.bootstrap.complete",
        calendar_enabled = config.calendar.enabled,
        "application bootstrap complete"
    );

    Ok(Application { config, pool, runtime, credentials })
}

/// Acquires the scoped calendar credential up front so the first tool call
/// does not pay the acquisition latency.
async fn build_calendar(
    config: &AppConfig,
) -> Result<(Option<Arc<dyn CalendarClient>>, Option<Arc<CredentialProvider>>), BootstrapError> {
    if !config.calendar.enabled {
        return Ok((None, None));
    }

    // validate() guarantees token and base_url are present when enabled.
    let token = config.calendar.api_token.clone().ok_or_else(|| {
        BootstrapError::Config(ConfigError::Validation(
            "calendar.api_token is required when calendar.enabled is true".to_string(),
        ))
    })?;
    let base_url = config.calendar.base_url.clone().ok_or_else(|| {
        BootstrapError::Config(ConfigError::Validation(
            "calendar.base_url is required when calendar.enabled is true".to_string(),
        ))
    })?;

    let source = Arc::new(StaticTokenSource::new(
        token,
        Duration::seconds(config.calendar.token_ttl_secs as i64),
    ));
    let credentials =
        Arc::new(CredentialProvider::new(source, Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)));
    credentials.acquire().await?;
    info!(event_name = "system.bootstrap.credentials_acquired", "calendar credential acquired");

    let client =
        HttpCalendarClient::new(base_url, credentials.clone(), CALENDAR_HTTP_TIMEOUT_SECS)?;

    Ok((Some(Arc::new(client)), Some(credentials)))
}
