use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{SourceError, ValidationError};

/// The top-level envelope of a dataset file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceList {
    name: String,
    version: u64,
    references: Vec<Value>,
}

impl SourceList {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Every reference is a JSON object.
    #[must_use]
    pub fn references(&self) -> &[Value] {
        &self.references
    }

    /// Read, decode, and validate a source list file.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the file cannot be read, is not JSON, or does
    /// not have the `name` / `version` / `references` shape.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| SourceError::Io {
            path: display.clone(),
            source: e,
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| SourceError::Json {
            path: display.clone(),
            reason: e.to_string(),
        })?;

        Self::from_value(value).map_err(|error| SourceError::Invalid {
            path: display,
            error,
        })
    }

    /// Validate an already-decoded envelope and take ownership of its parts.
    ///
    /// # Errors
    ///
    /// Returns the first envelope rule the value violates.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        validate_source(&value)?;

        let Value::Object(mut map) = value else {
            return Err(ValidationError::SourceNotObject);
        };
        let name = match map.remove("name") {
            Some(Value::String(name)) => name,
            _ => return Err(ValidationError::SourceName),
        };
        let version = match map.get("version") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or_default(),
            _ => 0,
        };
        let references = match map.remove("references") {
            Some(Value::Array(items)) => items,
            _ => return Err(ValidationError::SourceReferencesNotArray),
        };

        Ok(Self {
            name,
            version,
            references,
        })
    }
}

/// Check the envelope shape without consuming it.
///
/// # Errors
///
/// Unknown keys are reported first, then missing keys, then per-field types.
pub fn validate_source(value: &Value) -> Result<(), ValidationError> {
    let Value::Object(map) = value else {
        return Err(ValidationError::SourceNotObject);
    };

    if let Some(key) = map
        .keys()
        .find(|k| !matches!(k.as_str(), "name" | "version" | "references"))
    {
        return Err(ValidationError::SourceUnknownKey(key.clone()));
    }

    let name = require(map, "name")?;
    let version = require(map, "version")?;
    let references = require(map, "references")?;

    match name {
        Value::String(s) if !s.is_empty() => {}
        _ => return Err(ValidationError::SourceName),
    }

    // Only integer literals count; `1.0` is rejected like any other float.
    match version {
        Value::Number(n) if n.as_u64().is_some_and(|v| v > 0) => {}
        other => return Err(ValidationError::SourceVersion(other.clone())),
    }

    let Value::Array(items) = references else {
        return Err(ValidationError::SourceReferencesNotArray);
    };
    if let Some(position) = items.iter().position(|item| !item.is_object()) {
        return Err(ValidationError::SourceReferenceNotObject(position + 1));
    }

    Ok(())
}

fn require<'a>(map: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value, ValidationError> {
    map.get(key).ok_or(ValidationError::SourceMissingKey(key))
}
