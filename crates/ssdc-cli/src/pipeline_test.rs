use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use serde_json::json;
use ssdc_harvest::HarvestError;

use super::*;

fn post(account: &str, n: usize) -> Post {
    Post {
        id: format!("{account}-{n}"),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single(),
        text: format!("post {n}"),
        username: account.to_owned(),
        hashtags: vec![],
        followers_count: 100,
        location: None,
    }
}

/// Returns `per_account` posts for every account not listed in `failing`, and
/// records the calls it sees.
struct FakeHarvester {
    per_account: usize,
    failing: HashSet<&'static str>,
    calls: Mutex<Vec<(String, Option<usize>)>>,
}

impl FakeHarvester {
    fn new(per_account: usize, failing: &[&'static str]) -> Self {
        Self {
            per_account,
            failing: failing.iter().copied().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl Harvester for FakeHarvester {
    fn collect_user_timeline(
        &self,
        account: &str,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Post>, HarvestError>> + Send {
        self.calls
            .lock()
            .unwrap()
            .push((account.to_owned(), limit));
        let result = if self.failing.contains(account) {
            Err(HarvestError::NotFound {
                account: account.to_owned(),
                detail: "no such user".to_owned(),
            })
        } else {
            let count = limit.map_or(self.per_account, |l| l.min(self.per_account));
            Ok((0..count).map(|n| post(account, n)).collect())
        };
        async move { result }
    }
}

fn source() -> SourceList {
    SourceList::from_value(json!({
        "name": "officials",
        "version": 1,
        "references": [
            {
                "name": "Avery Chen",
                "followers_count": 15200,
                "platforms": {
                    "Twitter": {"main": "averychen", "office": "mayor_office"},
                    "Facebook": {"page": "averychen.page"}
                }
            },
            {
                "name": "Blake Moreno",
                "followers_count": 480,
                "platforms": {"Twitter": {"main": "blakem"}}
            },
            {
                "name": "Dana Okafor",
                "followers_count": 2300,
                "platforms": {"Facebook": {"page": "dana.okafor"}}
            }
        ]
    }))
    .unwrap()
}

// -----------------------------------------------------------------------
// selection
// -----------------------------------------------------------------------

#[test]
fn select_without_filter_sieves_every_reference() {
    let sieve = Sieve::parse(r#"{"Twitter": "main"}"#).unwrap();
    let selected = select_references(&source(), None, &sieve).unwrap();

    assert_eq!(selected.len(), 2);
    assert_eq!(twitter_accounts(&selected), vec!["averychen", "blakem"]);
}

#[test]
fn select_applies_filter_before_sieve() {
    let filter = Filter::parse(r#"{"$and": [{"followers_count": {"$gte": 1000}}]}"#).unwrap();
    let sieve = Sieve::parse(r#"{"Twitter": ["main", "office"]}"#).unwrap();

    let selected = select_references(&source(), Some(&filter), &sieve).unwrap();

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0]["name"], "Avery Chen");
    assert_eq!(twitter_accounts(&selected), vec!["averychen", "mayor_office"]);
}

#[test]
fn select_surfaces_type_mismatch() {
    let filter = Filter::parse(r#"{"$or": [{"followers_count": {"$regex": "1"}}]}"#).unwrap();
    let sieve = Sieve::parse(r#"{"Twitter": "main"}"#).unwrap();

    let err = select_references(&source(), Some(&filter), &sieve).unwrap_err();
    assert!(err.to_string().starts_with("failed to apply filter"));
}

#[test]
fn accounts_skip_non_string_ids_and_repeats() {
    let records = vec![
        json!({"platforms": {"Twitter": {"main": "dup", "alt": 42}}}),
        json!({"platforms": {"Twitter": {"main": "dup"}}}),
        json!({"platforms": {"Facebook": {"page": "ignored"}}}),
    ];
    assert_eq!(twitter_accounts(&records), vec!["dup"]);
}

// -----------------------------------------------------------------------
// harvesting
// -----------------------------------------------------------------------

fn accounts(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_owned()).collect()
}

#[tokio::test]
async fn harvest_accumulates_across_accounts() {
    let harvester = FakeHarvester::new(3, &[]);
    let posts = harvest_timelines(&harvester, &accounts(&["a", "b"]), Some(2))
        .await
        .unwrap();

    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a-0", "a-1", "b-0", "b-1"]);
    assert_eq!(
        *harvester.calls.lock().unwrap(),
        vec![("a".to_owned(), Some(2)), ("b".to_owned(), Some(2))]
    );
}

#[tokio::test]
async fn harvest_skips_failed_accounts() {
    let harvester = FakeHarvester::new(1, &["ghost"]);
    let posts = harvest_timelines(&harvester, &accounts(&["ghost", "real"]), None)
        .await
        .unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].username, "real");
}

#[tokio::test]
async fn harvest_fails_when_every_account_fails() {
    let harvester = FakeHarvester::new(1, &["x", "y"]);
    let err = harvest_timelines(&harvester, &accounts(&["x", "y"]), None)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to harvest any of the 2 selected accounts"
    );
}

#[tokio::test]
async fn harvest_with_no_accounts_is_empty() {
    let harvester = FakeHarvester::new(1, &[]);
    let posts = harvest_timelines(&harvester, &[], None).await.unwrap();
    assert!(posts.is_empty());
}

// -----------------------------------------------------------------------
// output
// -----------------------------------------------------------------------

#[test]
fn output_is_pretty_json_array_of_posts() {
    let path = std::env::temp_dir().join(format!("ssdc-output-{}.json", std::process::id()));
    let posts = vec![post("averychen", 0)];

    write_output(&path, &posts).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(written.starts_with("[\n"));
    let decoded: Vec<Post> = serde_json::from_str(&written).unwrap();
    assert_eq!(decoded, posts);
}

#[test]
fn output_to_missing_directory_fails_with_path() {
    let path = std::env::temp_dir()
        .join("ssdc-no-such-dir")
        .join("nested")
        .join("out.json");
    let err = write_output(&path, &[]).unwrap_err();
    assert!(err.to_string().starts_with("failed to write output to"));
}
