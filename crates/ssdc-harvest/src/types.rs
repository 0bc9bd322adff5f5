use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One collected post, flattened to the columns a harvest run exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub text: String,
    pub username: String,
    pub hashtags: Vec<String>,
    pub followers_count: u64,
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// Twitter API v2 response shapes
// ---------------------------------------------------------------------------

/// `GET 2/users/by/username/{username}`. A missing user comes back as HTTP 200
/// with `errors` and no `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct UserLookupResponse {
    pub data: Option<TwitterUser>,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TwitterUser {
    pub id: String,
    pub username: String,
    pub location: Option<String>,
    pub public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PublicMetrics {
    #[serde(default)]
    pub followers_count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiProblem {
    pub title: Option<String>,
    pub detail: Option<String>,
}

impl ApiProblem {
    pub fn describe(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// `GET 2/users/{id}/tweets`. An empty page omits `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct TimelineResponse {
    #[serde(default)]
    pub data: Vec<Tweet>,
    #[serde(default)]
    pub meta: TimelineMeta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TimelineMeta {
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Tweet {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub entities: Option<TweetEntities>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TweetEntities {
    #[serde(default)]
    pub hashtags: Vec<Hashtag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hashtag {
    pub tag: String,
}

impl Tweet {
    pub fn into_post(self, author: &TwitterUser) -> Post {
        Post {
            id: self.id,
            created_at: self.created_at,
            text: self.text,
            username: author.username.clone(),
            hashtags: self
                .entities
                .map(|e| e.hashtags.into_iter().map(|h| h.tag).collect())
                .unwrap_or_default(),
            followers_count: author
                .public_metrics
                .as_ref()
                .map_or(0, |m| m.followers_count),
            location: author.location.clone(),
        }
    }
}
