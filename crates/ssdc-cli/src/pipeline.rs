//! The select-then-harvest run behind the `ssdc` binary.
//!
//! Filter and sieve text are validated before the source file is read. Per-account
//! harvest failures are logged and skipped so one bad account does not abort
//! the run; the run fails only when every account fails.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use ssdc_core::sieve::PLATFORMS_KEY;
use ssdc_core::{AppConfig, Filter, Sieve, SourceList};
use ssdc_harvest::{ClientOptions, Harvester, Post, TwitterClient};

use crate::options::{parse_options, ActionOptions};
use crate::Cli;

/// Platform whose labels name the accounts a timeline run harvests.
pub(crate) const TWITTER_PLATFORM: &str = "Twitter";

pub(crate) async fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let options = parse_options(cli.action, &cli.options)?;
    let filter = cli.filter.as_deref().map(Filter::parse).transpose()?;
    let sieve = Sieve::parse(&cli.select)?;

    let source = SourceList::load(&cli.source)?;
    tracing::info!(
        name = %source.name(),
        version = source.version(),
        references = source.references().len(),
        "source loaded"
    );

    let selected = select_references(&source, filter.as_ref(), &sieve)?;
    let accounts = twitter_accounts(&selected);
    tracing::info!(
        references = selected.len(),
        accounts = accounts.len(),
        "references selected"
    );

    if cli.dry_run {
        println!(
            "dry-run: would collect timelines for {} accounts: [{}]",
            accounts.len(),
            accounts.join(", ")
        );
        return Ok(());
    }

    match options {
        ActionOptions::Timeline { limit } => {
            let client = build_twitter_client(config)?;
            let posts = harvest_timelines(&client, &accounts, limit).await?;
            match &cli.output {
                Some(path) => {
                    write_output(path, &posts)?;
                    println!(
                        "collected {} posts from {} accounts into {}",
                        posts.len(),
                        accounts.len(),
                        path.display()
                    );
                }
                None => println!(
                    "collected {} posts from {} accounts",
                    posts.len(),
                    accounts.len()
                ),
            }
        }
    }

    Ok(())
}

/// Runs the optional filter over the source references, then projects the
/// survivors through the sieve.
///
/// # Errors
///
/// Returns an error if the filter hits a record whose value has the wrong type
/// for one of its conditions.
pub(crate) fn select_references(
    source: &SourceList,
    filter: Option<&Filter>,
    sieve: &Sieve,
) -> anyhow::Result<Vec<Value>> {
    let matched: Vec<&Value> = match filter {
        Some(filter) => filter.apply(source).context("failed to apply filter")?,
        None => source.references().iter().collect(),
    };
    Ok(sieve.apply(matched))
}

/// Account identifiers under the Twitter platform of every record, in record
/// order and without repeats. Non-string identifiers are skipped.
pub(crate) fn twitter_accounts(records: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut accounts = Vec::new();

    for record in records {
        let Some(labels) = record
            .get(PLATFORMS_KEY)
            .and_then(|platforms| platforms.get(TWITTER_PLATFORM))
            .and_then(Value::as_object)
        else {
            continue;
        };
        for (label, id) in labels {
            match id.as_str() {
                Some(account) => {
                    if seen.insert(account.to_owned()) {
                        accounts.push(account.to_owned());
                    }
                }
                None => tracing::warn!(label = %label, "skipping account: identifier is not a string"),
            }
        }
    }

    accounts
}

/// Collects the timeline of every account, accumulating posts in account order.
///
/// # Errors
///
/// Returns an error only when there was at least one account and every one of
/// them failed.
pub(crate) async fn harvest_timelines<H: Harvester>(
    harvester: &H,
    accounts: &[String],
    limit: Option<usize>,
) -> anyhow::Result<Vec<Post>> {
    let mut posts = Vec::new();
    let mut failed = 0usize;

    for account in accounts {
        match harvester.collect_user_timeline(account, limit).await {
            Ok(mut collected) => {
                tracing::info!(account = %account, posts = collected.len(), "timeline harvested");
                posts.append(&mut collected);
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(account = %account, error = %e, "skipping account: harvest failed");
            }
        }
    }

    if failed > 0 && failed == accounts.len() {
        anyhow::bail!("failed to harvest any of the {failed} selected accounts");
    }
    Ok(posts)
}

fn build_twitter_client(config: &AppConfig) -> anyhow::Result<TwitterClient> {
    let token = config.require_twitter_token()?;
    let options = ClientOptions {
        timeout_secs: config.harvest_request_timeout_secs,
        user_agent: config.harvest_user_agent.clone(),
        max_retries: config.harvest_max_retries,
        backoff_base_ms: config.harvest_retry_backoff_base_ms,
    };
    TwitterClient::with_base_url(token, &options, &config.twitter_api_base_url)
        .context("failed to build Twitter client")
}

pub(crate) fn write_output(path: &Path, posts: &[Post]) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(posts).context("failed to serialize posts")?;
    std::fs::write(path, body)
        .with_context(|| format!("failed to write output to '{}'", path.display()))
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
