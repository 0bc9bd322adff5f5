//! Integration tests for `TwitterClient` using wiremock HTTP mocks.

use ssdc_harvest::{ClientOptions, HarvestError, Harvester, TwitterClient};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> TwitterClient {
    let options = ClientOptions {
        timeout_secs: 5,
        max_retries: 2,
        backoff_base_ms: 0,
        ..ClientOptions::default()
    };
    TwitterClient::with_base_url("test-token", &options, base_url)
        .expect("client construction should not fail")
}

fn tweets(ids: std::ops::Range<u32>) -> Vec<serde_json::Value> {
    ids.map(|i| {
        serde_json::json!({
            "id": format!("{i}"),
            "text": format!("post number {i} #city"),
            "created_at": "2024-05-01T12:00:00.000Z",
            "entities": {"hashtags": [{"start": 15, "end": 20, "tag": "city"}]}
        })
    })
    .collect()
}

async fn mount_user(server: &MockServer, username: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/2/users/by/username/{username}")))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "id": id,
                "name": "Avery Chen",
                "username": username,
                "location": "Springfield",
                "public_metrics": {"followers_count": 15200}
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn collects_timeline_across_pages() {
    let server = MockServer::start().await;
    mount_user(&server, "averychen", "42").await;

    Mock::given(method("GET"))
        .and(path("/2/users/42/tweets"))
        .and(query_param("max_results", "100"))
        .and(query_param_is_missing("pagination_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": tweets(0..3),
            "meta": {"result_count": 3, "next_token": "page-2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/2/users/42/tweets"))
        .and(query_param("pagination_token", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": tweets(3..5),
            "meta": {"result_count": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let posts = client
        .user_timeline("averychen", None)
        .await
        .expect("timeline should be collected");

    assert_eq!(posts.len(), 5);
    assert_eq!(posts[0].id, "0");
    assert_eq!(posts[4].id, "4");
    assert_eq!(posts[0].username, "averychen");
    assert_eq!(posts[0].followers_count, 15200);
    assert_eq!(posts[0].hashtags, vec!["city"]);
    assert_eq!(posts[0].location.as_deref(), Some("Springfield"));
}

#[tokio::test]
async fn limit_stops_paging_and_truncates() {
    let server = MockServer::start().await;
    mount_user(&server, "averychen", "42").await;

    Mock::given(method("GET"))
        .and(path("/2/users/42/tweets"))
        .and(query_param("max_results", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": tweets(0..5),
            "meta": {"result_count": 5, "next_token": "more"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let posts = client.user_timeline("averychen", Some(3)).await.unwrap();

    assert_eq!(posts.len(), 3);
}

#[tokio::test]
async fn empty_timeline_returns_no_posts() {
    let server = MockServer::start().await;
    mount_user(&server, "quiet", "7").await;

    Mock::given(method("GET"))
        .and(path("/2/users/7/tweets"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"meta": {"result_count": 0}})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let posts = client.user_timeline("quiet", Some(10)).await.unwrap();
    assert!(posts.is_empty());
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/users/by/username/ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errors": [{
                "title": "Not Found Error",
                "detail": "Could not find user with username: [ghost]."
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.user_timeline("ghost", None).await.unwrap_err();

    assert!(
        matches!(err, HarvestError::NotFound { ref account, ref detail }
            if account == "ghost" && detail.contains("Could not find user")),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/users/by/username/averychen"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.user_timeline("averychen", None).await.unwrap_err();

    assert!(matches!(
        err,
        HarvestError::UnexpectedStatus { status: 401, .. }
    ));
}

#[tokio::test]
async fn server_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/users/by/username/averychen"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_user(&server, "averychen", "42").await;
    Mock::given(method("GET"))
        .and(path("/2/users/42/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": tweets(0..1),
            "meta": {"result_count": 1}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let posts = client.user_timeline("averychen", None).await.unwrap();
    assert_eq!(posts.len(), 1);
}

#[tokio::test]
async fn rate_limit_surfaces_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/users/by/username/averychen"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "15"))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.user_timeline("averychen", None).await.unwrap_err();

    assert!(matches!(
        err,
        HarvestError::RateLimited {
            retry_after_secs: 15
        }
    ));
}

#[tokio::test]
async fn malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/users/by/username/averychen"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.user_timeline("averychen", None).await.unwrap_err();
    assert!(matches!(err, HarvestError::Deserialize { .. }));
}

async fn harvest_through_trait<H: Harvester>(harvester: &H) -> usize {
    harvester
        .collect_user_timeline("averychen", Some(2))
        .await
        .map(|posts| posts.len())
        .unwrap_or_default()
}

#[tokio::test]
async fn client_is_usable_as_harvester() {
    let server = MockServer::start().await;
    mount_user(&server, "averychen", "42").await;
    Mock::given(method("GET"))
        .and(path("/2/users/42/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": tweets(0..5),
            "meta": {"result_count": 5}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    assert_eq!(harvest_through_trait(&client).await, 2);
}
