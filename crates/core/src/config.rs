use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub warehouse: WarehouseConfig,
    pub llm: LlmConfig,
    pub calendar: CalendarConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub profiles: ProfilesConfig,
}

#[derive(Clone, Debug)]
pub struct WarehouseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
    /// Hard cap on rows any single gateway call may materialize.
    pub max_result_rows: usize,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct CalendarConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_token: Option<SecretString>,
    /// Lifetime assigned to tokens acquired from a static source.
    pub token_ttl_secs: u64,
    pub window_days: u32,
    pub max_events: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub query_port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Warehouse tables backing the two built-in agent profiles.
#[derive(Clone, Debug)]
pub struct ProfilesConfig {
    pub sales_table: String,
    pub promo_table: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub warehouse_url: Option<String>,
    pub max_result_rows: Option<usize>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub calendar_enabled: Option<bool>,
    pub calendar_api_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            warehouse: WarehouseConfig {
                url: "sqlite://salescope.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
                max_result_rows: 50,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            calendar: CalendarConfig {
                enabled: false,
                base_url: Some("https://www.googleapis.com/calendar/v3".to_string()),
                api_token: None,
                token_ttl_secs: 3300,
                window_days: 7,
                max_events: 10,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                query_port: 8000,
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            profiles: ProfilesConfig {
                sales_table: "monthly_retail_sales".to_string(),
                promo_table: "weekly_promo_sales".to_string(),
            },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("salescope.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(warehouse) = patch.warehouse {
            if let Some(url) = warehouse.url {
                self.warehouse.url = url;
            }
            if let Some(max_connections) = warehouse.max_connections {
                self.warehouse.max_connections = max_connections;
            }
            if let Some(timeout_secs) = warehouse.timeout_secs {
                self.warehouse.timeout_secs = timeout_secs;
            }
            if let Some(max_result_rows) = warehouse.max_result_rows {
                self.warehouse.max_result_rows = max_result_rows;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(calendar) = patch.calendar {
            if let Some(enabled) = calendar.enabled {
                self.calendar.enabled = enabled;
            }
            if let Some(base_url) = calendar.base_url {
                self.calendar.base_url = Some(base_url);
            }
            if let Some(calendar_token_value) = calendar.api_token {
                self.calendar.api_token = Some(secret_value(calendar_token_value));
            }
            if let Some(token_ttl_secs) = calendar.token_ttl_secs {
                self.calendar.token_ttl_secs = token_ttl_secs;
            }
            if let Some(window_days) = calendar.window_days {
                self.calendar.window_days = window_days;
            }
            if let Some(max_events) = calendar.max_events {
                self.calendar.max_events = max_events;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(query_port) = server.query_port {
                self.server.query_port = query_port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(profiles) = patch.profiles {
            if let Some(sales_table) = profiles.sales_table {
                self.profiles.sales_table = sales_table;
            }
            if let Some(promo_table) = profiles.promo_table {
                self.profiles.promo_table = promo_table;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SALESCOPE_WAREHOUSE_URL") {
            self.warehouse.url = value;
        }
        if let Some(value) = read_env("SALESCOPE_WAREHOUSE_MAX_CONNECTIONS") {
            self.warehouse.max_connections =
                parse_u32("SALESCOPE_WAREHOUSE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SALESCOPE_WAREHOUSE_TIMEOUT_SECS") {
            self.warehouse.timeout_secs = parse_u64("SALESCOPE_WAREHOUSE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SALESCOPE_WAREHOUSE_MAX_RESULT_ROWS") {
            self.warehouse.max_result_rows =
                parse_usize("SALESCOPE_WAREHOUSE_MAX_RESULT_ROWS", &value)?;
        }

        if let Some(value) = read_env("SALESCOPE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SALESCOPE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SALESCOPE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SALESCOPE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SALESCOPE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SALESCOPE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SALESCOPE_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("SALESCOPE_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("SALESCOPE_CALENDAR_ENABLED") {
            self.calendar.enabled = parse_bool("SALESCOPE_CALENDAR_ENABLED", &value)?;
        }
        if let Some(value) = read_env("SALESCOPE_CALENDAR_BASE_URL") {
            self.calendar.base_url = Some(value);
        }
        if let Some(value) = read_env("SALESCOPE_CALENDAR_API_TOKEN") {
            self.calendar.api_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("SALESCOPE_CALENDAR_TOKEN_TTL_SECS") {
            self.calendar.token_ttl_secs =
                parse_u64("SALESCOPE_CALENDAR_TOKEN_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("SALESCOPE_CALENDAR_WINDOW_DAYS") {
            self.calendar.window_days = parse_u32("SALESCOPE_CALENDAR_WINDOW_DAYS", &value)?;
        }
        if let Some(value) = read_env("SALESCOPE_CALENDAR_MAX_EVENTS") {
            self.calendar.max_events = parse_usize("SALESCOPE_CALENDAR_MAX_EVENTS", &value)?;
        }

        if let Some(value) = read_env("SALESCOPE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SALESCOPE_SERVER_QUERY_PORT") {
            self.server.query_port = parse_u16("SALESCOPE_SERVER_QUERY_PORT", &value)?;
        }
        if let Some(value) = read_env("SALESCOPE_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("SALESCOPE_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("SALESCOPE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SALESCOPE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SALESCOPE_PROFILES_SALES_TABLE") {
            self.profiles.sales_table = value;
        }
        if let Some(value) = read_env("SALESCOPE_PROFILES_PROMO_TABLE") {
            self.profiles.promo_table = value;
        }

        let log_level =
            read_env("SALESCOPE_LOGGING_LEVEL").or_else(|| read_env("SALESCOPE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SALESCOPE_LOGGING_FORMAT").or_else(|| read_env("SALESCOPE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(warehouse_url) = overrides.warehouse_url {
            self.warehouse.url = warehouse_url;
        }
        if let Some(max_result_rows) = overrides.max_result_rows {
            self.warehouse.max_result_rows = max_result_rows;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(calendar_enabled) = overrides.calendar_enabled {
            self.calendar.enabled = calendar_enabled;
        }
        if let Some(calendar_api_token) = overrides.calendar_api_token {
            self.calendar.api_token = Some(secret_value(calendar_api_token));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_warehouse(&self.warehouse)?;
        validate_llm(&self.llm)?;
        validate_calendar(&self.calendar)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        validate_profiles(&self.profiles)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("salescope.toml"), PathBuf::from("config/salescope.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_warehouse(warehouse: &WarehouseConfig) -> Result<(), ConfigError> {
    let url = warehouse.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "warehouse.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if warehouse.max_connections == 0 {
        return Err(ConfigError::Validation(
            "warehouse.max_connections must be greater than zero".to_string(),
        ));
    }

    if warehouse.timeout_secs == 0 || warehouse.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "warehouse.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if warehouse.max_result_rows == 0 || warehouse.max_result_rows > 500 {
        return Err(ConfigError::Validation(
            "warehouse.max_result_rows must be in range 1..=500".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_calendar(calendar: &CalendarConfig) -> Result<(), ConfigError> {
    if calendar.enabled {
        let token_missing = calendar
            .api_token
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if token_missing {
            return Err(ConfigError::Validation(
                "calendar.enabled is true but calendar.api_token is not configured".to_string(),
            ));
        }

        match &calendar.base_url {
            Some(base_url)
                if base_url.starts_with("http://") || base_url.starts_with("https://") => {}
            Some(_) => {
                return Err(ConfigError::Validation(
                    "calendar.base_url must start with http:// or https://".to_string(),
                ));
            }
            None => {
                return Err(ConfigError::Validation(
                    "calendar.enabled is true but calendar.base_url is not configured".to_string(),
                ));
            }
        }
    }

    if calendar.window_days == 0 || calendar.window_days > 90 {
        return Err(ConfigError::Validation(
            "calendar.window_days must be in range 1..=90".to_string(),
        ));
    }

    if calendar.max_events == 0 || calendar.max_events > 100 {
        return Err(ConfigError::Validation(
            "calendar.max_events must be in range 1..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.query_port == 0 {
        return Err(ConfigError::Validation(
            "server.query_port must be greater than zero".to_string(),
        ));
    }

    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.query_port == server.health_check_port {
        return Err(ConfigError::Validation(
            "server.query_port and server.health_check_port must differ".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_profiles(profiles: &ProfilesConfig) -> Result<(), ConfigError> {
    for (key, table) in
        [("profiles.sales_table", &profiles.sales_table), ("profiles.promo_table", &profiles.promo_table)]
    {
        let trimmed = table.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
        let valid = trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-' | '`'));
        if !valid {
            return Err(ConfigError::Validation(format!(
                "{key} contains characters that are not valid in a table name: `{trimmed}`"
            )));
        }
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    warehouse: Option<WarehousePatch>,
    llm: Option<LlmPatch>,
    calendar: Option<CalendarPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    profiles: Option<ProfilesPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct WarehousePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
    max_result_rows: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CalendarPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    api_token: Option<String>,
    token_ttl_secs: Option<u64>,
    window_days: Option<u32>,
    max_events: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    query_port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfilesPatch {
    sales_table: Option<String>,
    promo_table: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_CALENDAR_API_TOKEN", "cal-token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("salescope.toml");
            fs::write(
                &path,
                r#"
[calendar]
enabled = true
base_url = "https://calendar.example.com/v3"
api_token = "${TEST_CALENDAR_API_TOKEN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let token = config
                .calendar
                .api_token
                .as_ref()
                .map(|value| value.expose_secret().to_string())
                .unwrap_or_default();
            ensure(
                token == "cal-token-from-env",
                "calendar token should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_CALENDAR_API_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCOPE_LOG_LEVEL", "warn");
        env::set_var("SALESCOPE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["SALESCOPE_LOG_LEVEL", "SALESCOPE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCOPE_WAREHOUSE_MAX_RESULT_ROWS", "75");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("salescope.toml");
            fs::write(
                &path,
                r#"
[warehouse]
url = "sqlite://from-file.db"
max_result_rows = 25

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    warehouse_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.warehouse.url == "sqlite://from-override.db",
                "override warehouse url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.warehouse.max_result_rows == 75,
                "env row cap should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["SALESCOPE_WAREHOUSE_MAX_RESULT_ROWS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCOPE_CALENDAR_ENABLED", "true");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("calendar.api_token")
            );
            ensure(has_message, "validation failure should mention calendar.api_token")
        })();

        clear_vars(&["SALESCOPE_CALENDAR_ENABLED"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SALESCOPE_LLM_API_KEY", "llm-secret-value");
        env::set_var("SALESCOPE_CALENDAR_API_TOKEN", "cal-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("llm-secret-value"),
                "debug output should not contain the llm api key",
            )?;
            ensure(
                !debug.contains("cal-secret-value"),
                "debug output should not contain the calendar token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["SALESCOPE_LLM_API_KEY", "SALESCOPE_CALENDAR_API_TOKEN"]);
        result
    }

    #[test]
    fn rejects_row_cap_outside_supported_range() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    max_result_rows: Some(0),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            }) {
                Ok(_) => return Err("row cap of zero should not validate".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::Validation(ref message) if message.contains("max_result_rows")
                ),
                "validation failure should mention max_result_rows",
            )
        })();

        result
    }
}
