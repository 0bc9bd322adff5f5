//! Projection of each reference's `platforms` map down to an allow-list.
//!
//! A sieve maps platform name → one account label or a list of labels:
//!
//! ```json
//! {"Twitter": ["main", "press"], "Facebook": "page"}
//! ```
//!
//! Applying it keeps only the listed platforms and labels of every record and
//! drops records left with no platform at all.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{ParseError, ValidationError};
use crate::input::decode_text;

/// Field of a reference that holds platform → label → account identifier.
pub const PLATFORMS_KEY: &str = "platforms";

/// A validated, immutable platform/label allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sieve {
    platforms: BTreeMap<String, BTreeSet<String>>,
}

impl Sieve {
    /// Parse and validate sieve text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the text is too short, not JSON, or fails
    /// [`Sieve::validate`].
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let value = decode_text("sieve", text)?;
        Self::from_value(&value).map_err(|error| ParseError::Invalid {
            kind: "sieve",
            error,
        })
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::Sieve`] wrapping the violated rule.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::validate(value)?;

        let mut platforms = BTreeMap::new();
        if let Value::Object(map) = value {
            for (platform, labels) in map {
                let allowed = match labels {
                    Value::String(label) => BTreeSet::from([label.clone()]),
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect(),
                    _ => BTreeSet::new(),
                };
                platforms.insert(platform.clone(), allowed);
            }
        }

        Ok(Self { platforms })
    }

    /// The top level must be a non-empty object whose values are strings or
    /// arrays of strings.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Sieve`] wrapping the violated rule.
    pub fn validate(value: &Value) -> Result<(), ValidationError> {
        check_shape(value).map_err(|reason| ValidationError::Sieve {
            reason: reason.boxed(),
        })
    }

    /// The allowed labels for `platform`, if the platform is listed.
    #[must_use]
    pub fn labels(&self, platform: &str) -> Option<&BTreeSet<String>> {
        self.platforms.get(platform)
    }

    /// Listed platform names, in sorted order.
    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }

    /// Project every record, in order, onto the allow-list.
    ///
    /// Each output is a fresh value; input records are never modified and no
    /// two outputs share nested containers. Records with no surviving
    /// platform, including records without a `platforms` object, are left out.
    pub fn apply<'a, I>(&self, records: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let projected = self.project(record);
                if projected.is_none() {
                    tracing::debug!(reference = index + 1, "reference dropped by sieve");
                }
                projected
            })
            .collect()
    }

    /// Project a single record, returning `None` when nothing survives.
    #[must_use]
    pub fn project(&self, record: &Value) -> Option<Value> {
        let Value::Object(fields) = record else {
            return None;
        };
        let Some(Value::Object(platforms)) = fields.get(PLATFORMS_KEY) else {
            return None;
        };

        let mut kept = Map::new();
        for (platform, labels) in platforms {
            let (Some(allowed), Value::Object(labels)) = (self.platforms.get(platform), labels)
            else {
                continue;
            };
            let surviving: Map<String, Value> = labels
                .iter()
                .filter(|(label, _)| allowed.contains(label.as_str()))
                .map(|(label, id)| (label.clone(), id.clone()))
                .collect();
            if !surviving.is_empty() {
                kept.insert(platform.clone(), Value::Object(surviving));
            }
        }

        if kept.is_empty() {
            return None;
        }

        let mut copy: Map<String, Value> = fields
            .iter()
            .filter(|(key, _)| key.as_str() != PLATFORMS_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        copy.insert(PLATFORMS_KEY.to_owned(), Value::Object(kept));
        Some(Value::Object(copy))
    }

    /// JSON form, with single labels written as a plain string.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let map = self
            .platforms
            .iter()
            .map(|(platform, labels)| {
                let value = match labels.iter().collect::<Vec<_>>().as_slice() {
                    [single] => Value::String((*single).clone()),
                    many => Value::Array(many.iter().map(|l| Value::String((*l).clone())).collect()),
                };
                (platform.clone(), value)
            })
            .collect();
        Value::Object(map)
    }
}

impl fmt::Display for Sieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl FromStr for Sieve {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn check_shape(value: &Value) -> Result<(), ValidationError> {
    let Value::Object(map) = value else {
        return Err(ValidationError::TopLevelNotObject);
    };
    if map.is_empty() {
        return Err(ValidationError::SieveEmpty);
    }

    for (platform, labels) in map {
        match labels {
            Value::String(_) => {}
            Value::Array(items) => {
                if !items.iter().all(Value::is_string) {
                    return Err(ValidationError::SieveLabelNotString(platform.clone()));
                }
            }
            _ => return Err(ValidationError::SieveLabelsShape(platform.clone())),
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sieve_test.rs"]
mod tests;
