use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function,
/// so tests can drive it from a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("SSDC_ENV", "development"))?;
    let log_level = or_default("SSDC_LOG_LEVEL", "info");
    let twitter_bearer_token = lookup("SSDC_TWITTER_BEARER_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty());
    let twitter_api_base_url = or_default("SSDC_TWITTER_API_BASE_URL", "https://api.twitter.com/");

    let harvest_request_timeout_secs = parse_u64("SSDC_HARVEST_REQUEST_TIMEOUT_SECS", "30")?;
    let harvest_user_agent = or_default(
        "SSDC_HARVEST_USER_AGENT",
        "ssdc/0.1 (social-data-collection)",
    );
    let harvest_max_retries = parse_u32("SSDC_HARVEST_MAX_RETRIES", "3")?;
    let harvest_retry_backoff_base_ms = parse_u64("SSDC_HARVEST_RETRY_BACKOFF_BASE_MS", "1000")?;

    Ok(AppConfig {
        env,
        log_level,
        twitter_bearer_token,
        twitter_api_base_url,
        harvest_request_timeout_secs,
        harvest_user_agent,
        harvest_max_retries,
        harvest_retry_backoff_base_ms,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SSDC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
