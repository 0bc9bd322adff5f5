use serde_json::Value;
use thiserror::Error;

/// A filter, sieve, or source-list envelope failed a shape or consistency rule.
///
/// Nested wrapper variants carry the inner violation in their message so the
/// whole chain reads outer-to-inner from a single `Display`.
#[derive(Debug, Error)]
pub enum ValidationError {
    // -- layered context -------------------------------------------------
    #[error("failed to validate filter: {reason}")]
    Filter { reason: Box<ValidationError> },

    #[error("failed to validate sieve: {reason}")]
    Sieve { reason: Box<ValidationError> },

    #[error("failed to validate operator number {index}: {reason}")]
    Operator {
        index: usize,
        reason: Box<ValidationError>,
    },

    #[error("failed to validate condition number {index}: {reason}")]
    Condition {
        index: usize,
        reason: Box<ValidationError>,
    },

    #[error("in field '{key}': {reason}")]
    Field {
        key: String,
        reason: Box<ValidationError>,
    },

    // -- filter grammar ---------------------------------------------------
    #[error("top-level type must be an object")]
    TopLevelNotObject,

    #[error("top-level object must contain one of ['$and', '$or'] as its only key (found {found:?})")]
    TopLevelKeys { found: Vec<String> },

    #[error("operator value must be an array")]
    OperatorNotArray,

    #[error("operator value must have at least 1 suboperator or condition")]
    OperatorEmpty,

    #[error("operator value number {index} must be an object")]
    ElementNotObject { index: usize },

    #[error("an operator must only contain one of ['$and', '$or'] (found {found:?})")]
    AmbiguousOperator { found: Vec<String> },

    #[error("condition must be an object, got '{0}'")]
    ConditionNotObject(Value),

    #[error("terminal options must not be present with other data; '{0}' is invalid as a terminal option is also present")]
    MixedTerminal(String),

    #[error("terminal option must be one of ['$eq', '$lt', '$gt', '$lte', '$gte', '$regex']; '{0}' is not a valid terminal option")]
    UnknownOperator(String),

    #[error("cannot specify a non-numerical value for numerical operator {op}; '{value}' is not a numerical value")]
    NonNumeric { op: &'static str, value: Value },

    #[error("$regex pattern must be a string; '{0}' is not a string")]
    NonStringPattern(Value),

    #[error("invalid $regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("cannot specify a numerical comparative operator ($lt, $gt, $lte, $gte) with $eq as it is redundant or invalid")]
    EqWithComparator,

    #[error("cannot specify a numerical operator ($eq, $lt, $gt, $lte, $gte) with $regex as they imply conflicting types (string and number)")]
    RegexWithNumeric,

    #[error("cannot specify $lte along with $lt (only one allowed)")]
    DuplicateUpperBound,

    #[error("cannot specify $gte along with $gt (only one allowed)")]
    DuplicateLowerBound,

    #[error("cannot specify {upper_op} with {lower_op} if ranges do not overlap: {upper_op} {upper}, {lower_op} {lower}")]
    EmptyRange {
        upper_op: &'static str,
        upper: Value,
        lower_op: &'static str,
        lower: Value,
    },

    #[error("cannot specify $lte with $gte if ranges overlap at a single value ({0}); use $eq instead")]
    DegenerateRange(Value),

    // -- sieve ------------------------------------------------------------
    #[error("top-level object must contain at least one platform")]
    SieveEmpty,

    #[error("platform '{0}' must map to a list of account labels or a single account label string")]
    SieveLabelsShape(String),

    #[error("each account label of platform '{0}' must be a string")]
    SieveLabelNotString(String),

    // -- source list envelope ---------------------------------------------
    #[error("source list must be an object")]
    SourceNotObject,

    #[error("unknown key in data: '{0}'; keys must be one of ['name', 'version', 'references']")]
    SourceUnknownKey(String),

    #[error("source list must contain '{0}'")]
    SourceMissingKey(&'static str),

    #[error("source list name must be a non-empty string")]
    SourceName,

    #[error("source list version must be a positive integer, got '{0}'")]
    SourceVersion(Value),

    #[error("source list references must be an array")]
    SourceReferencesNotArray,

    #[error("source list reference number {0} must be an object")]
    SourceReferenceNotObject(usize),
}

impl ValidationError {
    pub(crate) fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Walk through the layered context variants to the rule that was violated.
    #[must_use]
    pub fn root_cause(&self) -> &ValidationError {
        match self {
            ValidationError::Filter { reason }
            | ValidationError::Sieve { reason }
            | ValidationError::Operator { reason, .. }
            | ValidationError::Condition { reason, .. }
            | ValidationError::Field { reason, .. } => reason.root_cause(),
            other => other,
        }
    }
}

/// Text input could not be turned into a validated filter or sieve.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse {kind}: input string must be at least 2 characters long")]
    TooShort { kind: &'static str },

    #[error("failed to parse {kind}: input string must be a valid JSON object ({reason})")]
    Json { kind: &'static str, reason: String },

    #[error("failed to parse {kind}: {error}")]
    Invalid {
        kind: &'static str,
        error: ValidationError,
    },
}

/// A record's runtime value disagrees with what a terminal condition requires.
#[derive(Debug, Error, PartialEq)]
pub enum TypeMismatchError {
    #[error("data contains a non-string value being matched against a regex pattern: '{0}'")]
    NotAString(Value),

    #[error("data contains a non-numerical value being matched against numerical operators: '{0}'")]
    NotANumber(Value),
}

/// The dataset file could not be read or does not have the source-list shape.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to load data from source '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load data from source '{path}': not valid JSON ({reason})")]
    Json { path: String, reason: String },

    #[error("failed to load data from source '{path}': {error}")]
    Invalid {
        path: String,
        error: ValidationError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
