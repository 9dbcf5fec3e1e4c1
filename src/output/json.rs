//! JSON envelope
//!
//! Every query response uses the same shape:
//! `{ "command": ..., "results": ..., "total_count"?: ..., "error"?: ... }`.
//! The field names are a documented contract; consumers parse them.

use serde::Serialize;
use serde_json::json;

/// Successful response with unpaginated results
pub fn envelope(command: &str, results: impl Serialize) -> String {
    let value = json!({
        "command": command,
        "results": results,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|e| fallback(command, &e.to_string()))
}

/// Successful paginated response carrying the pre-pagination total
pub fn paged_envelope(command: &str, results: impl Serialize, total_count: u64) -> String {
    let value = json!({
        "command": command,
        "results": results,
        "total_count": total_count,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|e| fallback(command, &e.to_string()))
}

/// Error response; written to stdout with a non-zero exit
pub fn error_envelope(command: &str, message: &str) -> String {
    let value = json!({
        "command": command,
        "error": message,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|e| fallback(command, &e.to_string()))
}

fn fallback(command: &str, message: &str) -> String {
    format!(
        r#"{{"command": "{}", "error": "failed to serialize results: {}"}}"#,
        command, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let out = envelope("symbols", vec!["a", "b"]);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["command"], "symbols");
        assert_eq!(value["results"][0], "a");
        assert!(value.get("error").is_none());
        assert!(value.get("total_count").is_none());
    }

    #[test]
    fn test_paged_envelope_has_total() {
        let out = paged_envelope("symbols", Vec::<String>::new(), 42);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["total_count"], 42);
    }

    #[test]
    fn test_error_envelope() {
        let out = error_envelope("definition", "file not indexed");
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["error"], "file not indexed");
        assert!(value.get("results").is_none());
    }
}
