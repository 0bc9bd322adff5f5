use serde_json::Value;

use crate::error::ParseError;

/// Decode filter or sieve text into a JSON value. Shape checks are left to the
/// caller's validator.
pub(crate) fn decode_text(kind: &'static str, text: &str) -> Result<Value, ParseError> {
    if text.chars().count() < 2 {
        return Err(ParseError::TooShort { kind });
    }
    serde_json::from_str(text).map_err(|e| ParseError::Json {
        kind,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_single_character() {
        assert!(matches!(
            decode_text("filter", "{"),
            Err(ParseError::TooShort { kind: "filter" })
        ));
    }

    #[test]
    fn rejects_non_json() {
        let err = decode_text("sieve", "Twitter").unwrap_err();
        assert!(matches!(err, ParseError::Json { kind: "sieve", .. }));
        assert!(err
            .to_string()
            .starts_with("failed to parse sieve: input string must be a valid JSON object"));
    }

    #[test]
    fn decodes_object() {
        let value = decode_text("sieve", r#"{"Twitter": "main"}"#).unwrap();
        assert_eq!(value, serde_json::json!({"Twitter": "main"}));
    }
}
