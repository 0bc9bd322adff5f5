use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub twitter_bearer_token: Option<String>,
    pub twitter_api_base_url: String,
    pub harvest_request_timeout_secs: u64,
    pub harvest_user_agent: String,
    pub harvest_max_retries: u32,
    pub harvest_retry_backoff_base_ms: u64,
}

impl AppConfig {
    /// The Twitter bearer token, required by any action that harvests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `SSDC_TWITTER_BEARER_TOKEN`
    /// was not set.
    pub fn require_twitter_token(&self) -> Result<&str, ConfigError> {
        self.twitter_bearer_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("SSDC_TWITTER_BEARER_TOKEN".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "twitter_bearer_token",
                &self.twitter_bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .field("twitter_api_base_url", &self.twitter_api_base_url)
            .field(
                "harvest_request_timeout_secs",
                &self.harvest_request_timeout_secs,
            )
            .field("harvest_user_agent", &self.harvest_user_agent)
            .field("harvest_max_retries", &self.harvest_max_retries)
            .field(
                "harvest_retry_backoff_base_ms",
                &self.harvest_retry_backoff_base_ms,
            )
            .finish()
    }
}
