use anyhow::{Context, Result};
use ipapi_lib::LookupResult;

/// Placeholder for fields which were not part of the result
const MISSING: &str = "-";

pub(crate) trait ResultFormatter {
    /// Format a single lookup result as one line of output
    fn format(&self, result: &LookupResult) -> Result<String>;
}

/// One JSON object per result, absent fields omitted
pub(crate) struct Json;

impl ResultFormatter for Json {
    fn format(&self, result: &LookupResult) -> Result<String> {
        serde_json::to_string(result).context("Cannot format lookup result as JSON")
    }
}

/// `<query> <status> <country> <city>`, followed by ` (<message>)` for
/// failed results
pub(crate) struct Compact;

impl ResultFormatter for Compact {
    fn format(&self, result: &LookupResult) -> Result<String> {
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .unwrap_or(MISSING)
                .to_string()
        };

        let line = [
            field(&result.query),
            field(&result.status),
            field(&result.country),
            field(&result.city),
        ]
        .join(" ");

        match &result.message {
            Some(message) if result.is_fail() => Ok(format!("{line} ({message})")),
            _ => Ok(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ashburn() -> LookupResult {
        LookupResult {
            query: Some("8.8.8.8".into()),
            status: Some("success".into()),
            country: Some("United States".into()),
            city: Some("Ashburn".into()),
            ..LookupResult::default()
        }
    }

    #[test]
    fn test_json() {
        assert_eq!(
            Json.format(&ashburn()).unwrap(),
            r#"{"query":"8.8.8.8","status":"success","country":"United States","city":"Ashburn"}"#
        );
    }

    #[test]
    fn test_compact() {
        assert_eq!(
            Compact.format(&ashburn()).unwrap(),
            "8.8.8.8 success United States Ashburn"
        );
    }

    #[test]
    fn test_compact_fail() {
        let result = LookupResult::fail("192.168.0.1", "private range");
        assert_eq!(
            Compact.format(&result).unwrap(),
            "192.168.0.1 fail - - (private range)"
        );
    }
}
