//! `--option key[=value]` parsing, validated per action.

use anyhow::{anyhow, bail, Context};

use crate::Action;

/// Options accepted by an action, already parsed and range-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ActionOptions {
    Timeline { limit: Option<usize> },
}

/// Parse raw `--option` values for `action`.
///
/// # Errors
///
/// Returns an error for an option the action does not know, an option given
/// twice, a missing value, or a value that does not parse.
pub(crate) fn parse_options(action: Action, raw: &[String]) -> anyhow::Result<ActionOptions> {
    match action {
        Action::Timeline => {
            let mut limit = None;
            for entry in raw {
                let (key, value) = split_option(entry);
                match key {
                    "limit" => {
                        if limit.is_some() {
                            bail!("option 'limit' given more than once");
                        }
                        limit = Some(parse_limit(value)?);
                    }
                    other => bail!("unknown option '{other}' for action 'timeline'"),
                }
            }
            Ok(ActionOptions::Timeline { limit })
        }
    }
}

fn split_option(entry: &str) -> (&str, Option<&str>) {
    match entry.split_once('=') {
        Some((key, value)) => (key.trim(), Some(value.trim())),
        None => (entry.trim(), None),
    }
}

fn parse_limit(value: Option<&str>) -> anyhow::Result<usize> {
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("option 'limit' requires a value"))?;
    let limit: usize = value
        .parse()
        .with_context(|| format!("option 'limit' must be a positive integer, got '{value}'"))?;
    if limit == 0 {
        bail!("option 'limit' must be a positive integer, got '0'");
    }
    Ok(limit)
}
