//! JSON rendering for outline results.

use crate::error::{Error, Result};
use crate::model::OutlineResult;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert an outline result to JSON. Non-ASCII text is written as-is.
pub fn to_json(result: &OutlineResult, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(result),
        JsonFormat::Compact => serde_json::to_string(result),
    };

    json.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Outline result as a JSON value, for embedding into larger reports.
pub fn to_json_value(result: &OutlineResult) -> Result<serde_json::Value> {
    serde_json::to_value(result)
        .map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutlineEntry;

    fn sample() -> OutlineResult {
        OutlineResult {
            title: "Über Überschriften".to_string(),
            outline: vec![OutlineEntry {
                level: "H1".to_string(),
                text: "概要".to_string(),
                page: 2,
            }],
        }
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&sample(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\""));
        assert!(json.contains("Über Überschriften"));
        assert!(json.contains("概要"));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&OutlineResult::empty(), JsonFormat::Compact).unwrap();
        assert_eq!(
            json,
            r#"{"title":"Document Title Not Found","outline":[]}"#
        );
    }

    #[test]
    fn test_to_json_value_shape() {
        let value = to_json_value(&sample()).unwrap();
        assert_eq!(value["outline"][0]["level"], "H1");
        assert_eq!(value["outline"][0]["page"], 2);
    }
}
