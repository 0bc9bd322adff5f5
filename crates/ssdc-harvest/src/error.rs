use thiserror::Error;

/// Errors returned while collecting posts from a platform API.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by the platform API (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// The platform reported that the account does not exist or is not visible.
    #[error("account not found: {account} ({detail})")]
    NotFound { account: String, detail: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
