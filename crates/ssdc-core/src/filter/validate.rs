//! Grammar checks that turn a decoded JSON value into the typed filter tree.
//!
//! Every check fails fast on the first violation. Errors from nested elements
//! are wrapped with their 1-based position (or field name) on the way out.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use super::number::compare;
use super::{Bound, Condition, Logical, LogicalNode, Node, Operator, Pattern, Range, Terminal};
use crate::error::ValidationError;

/// Validate the top-level object: exactly one key, and it must be `$and` or `$or`.
pub(super) fn validate_root(value: &Value) -> Result<LogicalNode, ValidationError> {
    let Value::Object(map) = value else {
        return Err(ValidationError::TopLevelNotObject);
    };

    let (key, children) = match single_key(map) {
        Some(entry) => entry,
        None => {
            return Err(ValidationError::TopLevelKeys {
                found: map.keys().cloned().collect(),
            })
        }
    };
    let Some(op) = Logical::from_token(key) else {
        return Err(ValidationError::TopLevelKeys {
            found: vec![key.clone()],
        });
    };

    Ok(LogicalNode {
        op,
        children: validate_operator(children)?,
    })
}

/// Validate the child list of a `$and` / `$or` node.
///
/// Each element is either a single-key nested logical node, validated by
/// recursing here, or a condition handed to [`validate_condition`]. The two
/// kinds may be mixed freely within one list.
///
/// # Errors
///
/// Returns a [`ValidationError`] when `children` is not a non-empty array of
/// objects, or when any element fails; element failures are wrapped in
/// [`ValidationError::Operator`] / [`ValidationError::Condition`] with the
/// element's 1-based index.
pub fn validate_operator(children: &Value) -> Result<Vec<Node>, ValidationError> {
    let Value::Array(items) = children else {
        return Err(ValidationError::OperatorNotArray);
    };
    if items.is_empty() {
        return Err(ValidationError::OperatorEmpty);
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| validate_element(i + 1, item))
        .collect()
}

fn validate_element(index: usize, item: &Value) -> Result<Node, ValidationError> {
    let Value::Object(map) = item else {
        return Err(ValidationError::ElementNotObject { index });
    };

    if !map.keys().any(|k| Logical::from_token(k).is_some()) {
        return validate_condition(item)
            .map(Node::Condition)
            .map_err(|reason| ValidationError::Condition {
                index,
                reason: reason.boxed(),
            });
    }

    let wrap = |reason: ValidationError| ValidationError::Operator {
        index,
        reason: reason.boxed(),
    };

    // A logical element is a single-key wrapper; anything alongside the
    // `$and` / `$or` key makes it ambiguous.
    let Some((key, inner)) = single_key(map) else {
        return Err(wrap(ValidationError::AmbiguousOperator {
            found: map.keys().cloned().collect(),
        }));
    };
    let Some(op) = Logical::from_token(key) else {
        return Err(wrap(ValidationError::AmbiguousOperator {
            found: vec![key.clone()],
        }));
    };

    let children = validate_operator(inner).map_err(wrap)?;
    Ok(Node::Logical(LogicalNode { op, children }))
}

/// Validate a single condition node.
///
/// A node with any `$`-prefixed key is terminal and may only contain operator
/// keys. Otherwise it is a path node and every value is validated recursively
/// as a condition on the named field.
///
/// # Errors
///
/// Returns the first violated rule. Violations inside a path node are wrapped
/// in [`ValidationError::Field`] naming the key they sit under.
pub fn validate_condition(node: &Value) -> Result<Condition, ValidationError> {
    let Value::Object(map) = node else {
        return Err(ValidationError::ConditionNotObject(node.clone()));
    };

    if !map.keys().any(|k| is_operator_key(k)) {
        return map
            .iter()
            .map(|(key, child)| {
                validate_condition(child)
                    .map(|condition| (key.clone(), condition))
                    .map_err(|reason| ValidationError::Field {
                        key: key.clone(),
                        reason: reason.boxed(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Condition::Path);
    }

    if let Some(key) = map.keys().find(|k| !is_operator_key(k)) {
        return Err(ValidationError::MixedTerminal(key.clone()));
    }

    validate_terminal(map).map(Condition::Terminal)
}

/// Checks run in a fixed order: unknown key, value types, conflicting
/// operators, duplicate bounds, then range sanity.
fn validate_terminal(map: &Map<String, Value>) -> Result<Terminal, ValidationError> {
    let mut ops = Vec::with_capacity(map.len());
    for (key, value) in map {
        let op = Operator::from_token(key)
            .ok_or_else(|| ValidationError::UnknownOperator(key.clone()))?;
        ops.push((op, value));
    }

    for (op, value) in &ops {
        match op {
            Operator::Regex if !value.is_string() => {
                return Err(ValidationError::NonStringPattern((*value).clone()));
            }
            Operator::Regex => {}
            _ if !value.is_number() => {
                return Err(ValidationError::NonNumeric {
                    op: op.token(),
                    value: (*value).clone(),
                });
            }
            _ => {}
        }
    }

    let has = |wanted: Operator| ops.iter().any(|(op, _)| *op == wanted);
    let number = |wanted: Operator| {
        ops.iter().find_map(|(op, value)| match value {
            Value::Number(n) if *op == wanted => Some(n.clone()),
            _ => None,
        })
    };

    let comparator = [Operator::Lt, Operator::Gt, Operator::Lte, Operator::Gte]
        .into_iter()
        .any(has);
    if comparator && has(Operator::Eq) {
        return Err(ValidationError::EqWithComparator);
    }
    if has(Operator::Regex) && (comparator || has(Operator::Eq)) {
        return Err(ValidationError::RegexWithNumeric);
    }
    if has(Operator::Lt) && has(Operator::Lte) {
        return Err(ValidationError::DuplicateUpperBound);
    }
    if has(Operator::Gt) && has(Operator::Gte) {
        return Err(ValidationError::DuplicateLowerBound);
    }

    if let Some((_, Value::String(source))) = ops.iter().find(|(op, _)| *op == Operator::Regex) {
        let pattern = Pattern::new(source).map_err(|e| ValidationError::InvalidPattern {
            pattern: source.clone(),
            reason: e.to_string(),
        })?;
        return Ok(Terminal::Regex(pattern));
    }

    if let Some(n) = number(Operator::Eq) {
        return Ok(Terminal::Eq(n));
    }

    let upper = number(Operator::Lt)
        .map(Bound::Exclusive)
        .or_else(|| number(Operator::Lte).map(Bound::Inclusive));
    let lower = number(Operator::Gt)
        .map(Bound::Exclusive)
        .or_else(|| number(Operator::Gte).map(Bound::Inclusive));

    if let (Some(upper), Some(lower)) = (&upper, &lower) {
        check_range(upper, lower)?;
    }

    Ok(Terminal::Range(Range { upper, lower }))
}

/// The interval between the two bounds must be non-empty, and a closed pair
/// must not collapse to a single point.
fn check_range(upper: &Bound, lower: &Bound) -> Result<(), ValidationError> {
    let ordering = compare(upper.value(), lower.value());

    if let (Bound::Inclusive(point), Bound::Inclusive(_)) = (upper, lower) {
        if ordering == Some(Ordering::Equal) {
            return Err(ValidationError::DegenerateRange(number_value(point)));
        }
    }

    if ordering == Some(Ordering::Greater) {
        return Ok(());
    }

    Err(ValidationError::EmptyRange {
        upper_op: upper.upper_operator().token(),
        upper: number_value(upper.value()),
        lower_op: lower.lower_operator().token(),
        lower: number_value(lower.value()),
    })
}

fn number_value(n: &Number) -> Value {
    Value::Number(n.clone())
}

fn is_operator_key(key: &str) -> bool {
    key.starts_with('$')
}

fn single_key(map: &Map<String, Value>) -> Option<(&String, &Value)> {
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Some(entry),
        _ => None,
    }
}
