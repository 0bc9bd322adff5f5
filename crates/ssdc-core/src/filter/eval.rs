use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::number::compare;
use super::{Bound, Condition, Logical, LogicalNode, Node, Range, Terminal};
use crate::error::TypeMismatchError;

impl LogicalNode {
    /// `$and` stops at the first child that fails, `$or` at the first that
    /// matches. Validation guarantees at least one child.
    pub(super) fn evaluate(&self, record: &Value) -> Result<bool, TypeMismatchError> {
        match self.op {
            Logical::And => {
                for child in &self.children {
                    if !child.matches(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Logical::Or => {
                for child in &self.children {
                    if child.matches(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl Node {
    fn matches(&self, record: &Value) -> Result<bool, TypeMismatchError> {
        match self {
            Node::Logical(node) => node.evaluate(record),
            Node::Condition(condition) => condition.matches(record),
        }
    }
}

impl Condition {
    /// Match this condition against one value of a record.
    ///
    /// A path condition needs `value` to be an object holding every named
    /// field; a missing field or a non-object value is a plain non-match.
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatchError`] when a terminal meets a value of the wrong
    /// type.
    pub fn matches(&self, value: &Value) -> Result<bool, TypeMismatchError> {
        match self {
            Condition::Path(fields) => {
                let Value::Object(map) = value else {
                    return Ok(false);
                };
                for (key, condition) in fields {
                    match map.get(key) {
                        Some(nested) if condition.matches(nested)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            Condition::Terminal(terminal) => terminal.matches(value),
        }
    }
}

impl Terminal {
    /// # Errors
    ///
    /// `$regex` requires a string and range operators require a number;
    /// anything else is a [`TypeMismatchError`]. `$eq` never errors.
    pub fn matches(&self, value: &Value) -> Result<bool, TypeMismatchError> {
        match self {
            Terminal::Eq(expected) => Ok(matches!(
                value,
                Value::Number(actual) if compare(actual, expected) == Some(Ordering::Equal)
            )),
            Terminal::Regex(pattern) => match value {
                Value::String(s) => Ok(pattern.is_match(s)),
                other => Err(TypeMismatchError::NotAString(other.clone())),
            },
            Terminal::Range(range) => match value {
                Value::Number(actual) => Ok(range.contains(actual)),
                other => Err(TypeMismatchError::NotANumber(other.clone())),
            },
        }
    }
}

impl Range {
    #[must_use]
    pub fn contains(&self, n: &Number) -> bool {
        let below_upper = match &self.upper {
            Some(Bound::Exclusive(limit)) => compare(n, limit) == Some(Ordering::Less),
            Some(Bound::Inclusive(limit)) => {
                matches!(compare(n, limit), Some(Ordering::Less | Ordering::Equal))
            }
            None => true,
        };
        let above_lower = match &self.lower {
            Some(Bound::Exclusive(limit)) => compare(n, limit) == Some(Ordering::Greater),
            Some(Bound::Inclusive(limit)) => {
                matches!(compare(n, limit), Some(Ordering::Greater | Ordering::Equal))
            }
            None => true,
        };
        below_upper && above_lower
    }
}
