//! HTTP client for the Twitter API v2 user timeline endpoints.
//!
//! Resolves a username to a user id, then pages through the user's tweets
//! following `meta.next_token`. Requests authenticate with an app bearer token
//! and are retried on transient failures with exponential back-off.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::HarvestError;
use crate::retry::retry_with_backoff;
use crate::types::{ApiProblem, Post, TimelineResponse, TwitterUser, UserLookupResponse};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/";

/// Maximum number of timeline pages fetched per account. At 100 tweets per
/// page this covers the ~3200 most recent tweets the API exposes.
pub(crate) const MAX_PAGES: usize = 32;

/// Bounds the API accepts for `max_results` on the timeline endpoint.
const MIN_PAGE_SIZE: usize = 5;
const MAX_PAGE_SIZE: usize = 100;

/// Transport settings shared by every request a client makes.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for retriable errors.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "ssdc/0.1 (social-data-collection)".to_string(),
            max_retries: 3,
            backoff_base_ms: 1_000,
        }
    }
}

/// Client for the Twitter API v2.
///
/// Use [`TwitterClient::new`] for production or [`TwitterClient::with_base_url`]
/// to point at a mock server in tests.
pub struct TwitterClient {
    client: Client,
    bearer_token: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl TwitterClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(bearer_token: &str, options: &ClientOptions) -> Result<Self, HarvestError> {
        Self::with_base_url(bearer_token, options, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`HarvestError::InvalidBaseUrl`] if `base_url` cannot carry a path.
    pub fn with_base_url(
        bearer_token: &str,
        options: &ClientOptions,
        base_url: &str,
    ) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&options.user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| HarvestError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(HarvestError::InvalidBaseUrl {
                base_url: base_url.to_owned(),
                reason: "URL cannot be used as a base".to_owned(),
            });
        }

        Ok(Self {
            client,
            bearer_token: bearer_token.to_owned(),
            base_url: parsed,
            max_retries: options.max_retries,
            backoff_base_ms: options.backoff_base_ms,
        })
    }

    /// Collects up to `limit` of the most recent posts of `account` (a
    /// username). `None` collects as many as the API exposes, bounded by
    /// [`MAX_PAGES`].
    ///
    /// # Errors
    ///
    /// - [`HarvestError::NotFound`] if the username does not resolve.
    /// - [`HarvestError::RateLimited`] / [`HarvestError::UnexpectedStatus`] /
    ///   [`HarvestError::Http`] after retries are exhausted.
    /// - [`HarvestError::Deserialize`] if a response has an unexpected shape.
    pub async fn user_timeline(
        &self,
        account: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Post>, HarvestError> {
        let user = self.lookup_user(account).await?;
        let mut posts: Vec<Post> = Vec::new();
        let mut next_token: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            let remaining = limit.map(|l| l.saturating_sub(posts.len()));
            if remaining == Some(0) {
                break;
            }
            let page_size = remaining
                .unwrap_or(MAX_PAGE_SIZE)
                .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);

            let url = self.timeline_url(&user.id, page_size, next_token.as_deref());
            let page: TimelineResponse = self
                .request_json(&url, &format!("timeline page {page_number} of {account}"))
                .await?;

            tracing::debug!(
                account,
                page = page_number,
                tweets = page.data.len(),
                "fetched timeline page"
            );
            posts.extend(page.data.into_iter().map(|tweet| tweet.into_post(&user)));

            match page.meta.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
            if page_number == MAX_PAGES {
                tracing::warn!(account, max_pages = MAX_PAGES, "timeline page limit reached");
            }
        }

        if let Some(limit) = limit {
            posts.truncate(limit);
        }
        tracing::info!(account, posts = posts.len(), "collected user timeline");
        Ok(posts)
    }

    async fn lookup_user(&self, account: &str) -> Result<TwitterUser, HarvestError> {
        let mut url = self.endpoint(&["2", "users", "by", "username", account]);
        url.query_pairs_mut()
            .append_pair("user.fields", "public_metrics,location");

        let response: UserLookupResponse = self
            .request_json(&url, &format!("user lookup of {account}"))
            .await?;

        response.data.ok_or_else(|| HarvestError::NotFound {
            account: account.to_owned(),
            detail: response
                .errors
                .first()
                .map_or_else(|| "no user data returned".to_owned(), ApiProblem::describe),
        })
    }

    fn timeline_url(&self, user_id: &str, page_size: usize, next_token: Option<&str>) -> Url {
        let mut url = self.endpoint(&["2", "users", user_id, "tweets"]);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("max_results", &page_size.to_string());
            pairs.append_pair("tweet.fields", "created_at,entities");
            if let Some(token) = next_token {
                pairs.append_pair("pagination_token", token);
            }
        }
        url
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // The constructor rejects cannot-be-a-base URLs, so this always applies.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends an authenticated GET with retry, mapping non-2xx statuses to typed
    /// errors and decoding the body as `T`.
    async fn request_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<T, HarvestError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(&self.bearer_token)
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(HarvestError::RateLimited { retry_after_secs });
            }

            if !status.is_success() {
                return Err(HarvestError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = response.text().await?;
            serde_json::from_str::<T>(&body).map_err(|e| HarvestError::Deserialize {
                context: context.to_owned(),
                source: e,
            })
        })
        .await
    }
}
