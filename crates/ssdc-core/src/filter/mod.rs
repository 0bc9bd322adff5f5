//! Structured filter language for selecting references out of a source list.
//!
//! A filter is a boolean tree rooted at exactly one of `$and` / `$or`. Leaves
//! are conditions: either a path that descends into nested record fields, or a
//! terminal built from the closed operator set `$eq`, `$lt`, `$gt`, `$lte`,
//! `$gte`, `$regex`.
//!
//! ```json
//! {"$and": [
//!   {"followers_count": {"$gte": 100, "$lt": 5000}},
//!   {"$or": [{"name": {"$regex": "Dr\\."}}, {"verified": {"$eq": 1}}]}
//! ]}
//! ```
//!
//! Filters are validated once, frozen into the typed tree below, and never
//! re-checked on evaluation. The only evaluation-time failure is a record whose
//! shape disagrees with a terminal condition ([`TypeMismatchError`]).

mod eval;
mod number;
mod validate;

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::error::{ParseError, TypeMismatchError, ValidationError};
use crate::input::decode_text;
use crate::source::SourceList;

pub use validate::{validate_condition, validate_operator};

/// The two boolean combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logical {
    And,
    Or,
}

impl Logical {
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Logical::And => "$and",
            Logical::Or => "$or",
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "$and" => Some(Logical::And),
            "$or" => Some(Logical::Or),
            _ => None,
        }
    }
}

/// The closed vocabulary of terminal operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
    Regex,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Lt,
        Operator::Gt,
        Operator::Lte,
        Operator::Gte,
        Operator::Regex,
    ];

    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Lt => "$lt",
            Operator::Gt => "$gt",
            Operator::Lte => "$lte",
            Operator::Gte => "$gte",
            Operator::Regex => "$regex",
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }
}

/// A `$and` / `$or` node and its (non-empty) ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalNode {
    op: Logical,
    children: Vec<Node>,
}

impl LogicalNode {
    #[must_use]
    pub fn op(&self) -> Logical {
        self.op
    }

    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

/// One element of a logical node's child list.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Logical(LogicalNode),
    Condition(Condition),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field name → nested condition, in the order they were written.
    Path(Vec<(String, Condition)>),
    Terminal(Terminal),
}

/// A leaf predicate. Each variant is one of the operator combinations that
/// survive validation, so contradictory mixes cannot be represented.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Eq(Number),
    Regex(Pattern),
    Range(Range),
}

/// A `$regex` pattern, compiled once and anchored at the start of the input.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Regex,
}

impl Pattern {
    /// # Errors
    ///
    /// Returns the `regex` compile error when `source` is not a valid pattern.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let compiled = Regex::new(&format!("^(?:{source})"))?;
        Ok(Self {
            source: source.to_owned(),
            compiled,
        })
    }

    /// The pattern as written in the filter, without the added anchor.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Prefix match: the pattern must match starting at the first character,
    /// but need not consume the whole string.
    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.compiled.is_match(haystack)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// At most one upper and one lower bound; never both absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    upper: Option<Bound>,
    lower: Option<Bound>,
}

impl Range {
    #[must_use]
    pub fn upper(&self) -> Option<&Bound> {
        self.upper.as_ref()
    }

    #[must_use]
    pub fn lower(&self) -> Option<&Bound> {
        self.lower.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Exclusive(Number),
    Inclusive(Number),
}

impl Bound {
    #[must_use]
    pub fn value(&self) -> &Number {
        match self {
            Bound::Exclusive(n) | Bound::Inclusive(n) => n,
        }
    }

    fn upper_operator(&self) -> Operator {
        match self {
            Bound::Exclusive(_) => Operator::Lt,
            Bound::Inclusive(_) => Operator::Lte,
        }
    }

    fn lower_operator(&self) -> Operator {
        match self {
            Bound::Exclusive(_) => Operator::Gt,
            Bound::Inclusive(_) => Operator::Gte,
        }
    }
}

/// A validated, immutable filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    root: LogicalNode,
}

impl Filter {
    /// Parse and validate filter text such as `{"$or": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::TooShort`] for inputs under 2 characters,
    /// [`ParseError::Json`] when the text is not JSON, and
    /// [`ParseError::Invalid`] when the decoded value fails validation.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let value = decode_text("filter", text)?;
        Self::from_value(&value).map_err(|error| ParseError::Invalid {
            kind: "filter",
            error,
        })
    }

    /// Validate an already-decoded value and freeze it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Filter`] wrapping the first rule violated.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        validate::validate_root(value)
            .map(|root| Self { root })
            .map_err(|reason| ValidationError::Filter {
                reason: reason.boxed(),
            })
    }

    /// Check a value against the filter grammar without keeping the result.
    ///
    /// # Errors
    ///
    /// Same as [`Filter::from_value`].
    pub fn validate(value: &Value) -> Result<(), ValidationError> {
        Self::from_value(value).map(|_| ())
    }

    #[must_use]
    pub fn root(&self) -> &LogicalNode {
        &self.root
    }

    /// Evaluate the filter against one record.
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatchError`] when a `$regex` condition meets a
    /// non-string value or a numeric condition meets a non-number.
    pub fn matches(&self, record: &Value) -> Result<bool, TypeMismatchError> {
        self.root.evaluate(record)
    }

    /// Select the matching references of a source list, in their original order.
    ///
    /// # Errors
    ///
    /// Aborts on the first [`TypeMismatchError`]; no partial result is returned.
    pub fn apply<'a>(&self, source: &'a SourceList) -> Result<Vec<&'a Value>, TypeMismatchError> {
        self.select(source.references())
    }

    /// Like [`Filter::apply`] but over any sequence of records.
    ///
    /// # Errors
    ///
    /// Aborts on the first [`TypeMismatchError`].
    pub fn select<'a, I>(&self, records: I) -> Result<Vec<&'a Value>, TypeMismatchError>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut selected = Vec::new();
        for record in records {
            if self.matches(record)? {
                selected.push(record);
            }
        }
        Ok(selected)
    }

    /// Rebuild the JSON form of the filter. Parsing the result yields an equal
    /// filter.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.root.to_value()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl FromStr for Filter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Serialization back to JSON
// ---------------------------------------------------------------------------

impl LogicalNode {
    fn to_value(&self) -> Value {
        let children = self.children.iter().map(Node::to_value).collect();
        single_entry(self.op.token(), Value::Array(children))
    }
}

impl Node {
    fn to_value(&self) -> Value {
        match self {
            Node::Logical(node) => node.to_value(),
            Node::Condition(condition) => condition.to_value(),
        }
    }
}

impl Condition {
    fn to_value(&self) -> Value {
        match self {
            Condition::Path(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_value()))
                    .collect(),
            ),
            Condition::Terminal(terminal) => terminal.to_value(),
        }
    }
}

impl Terminal {
    fn to_value(&self) -> Value {
        match self {
            Terminal::Eq(n) => single_entry(Operator::Eq.token(), Value::Number(n.clone())),
            Terminal::Regex(pattern) => single_entry(
                Operator::Regex.token(),
                Value::String(pattern.as_str().to_owned()),
            ),
            Terminal::Range(range) => {
                let mut map = Map::new();
                if let Some(bound) = &range.upper {
                    map.insert(
                        bound.upper_operator().token().to_owned(),
                        Value::Number(bound.value().clone()),
                    );
                }
                if let Some(bound) = &range.lower {
                    map.insert(
                        bound.lower_operator().token().to_owned(),
                        Value::Number(bound.value().clone()),
                    );
                }
                Value::Object(map)
            }
        }
    }
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_owned(), value);
    Value::Object(map)
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
