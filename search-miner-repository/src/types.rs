//! Result types for bulk operations.

use serde_json::Value;

use crate::errors::SearchError;

/// One bulk item the engine refused.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemFailure {
    /// Identifier the item was submitted under.
    pub id: String,
    /// HTTP status reported for the item.
    pub status: u16,
    /// Engine-supplied reason, e.g. a mapper parsing message.
    pub reason: String,
}

/// Summary of a bulk request, built from the per-item results the engine
/// returns.
///
/// A bulk call can succeed as a whole while individual items fail; those
/// items are listed in `failures` instead of being folded into success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkIndexSummary {
    /// Number of documents submitted.
    pub total: usize,
    /// Number of items the engine accepted.
    pub succeeded: usize,
    /// Number of items the engine rejected.
    pub failed: usize,
    /// Details for each rejected item.
    pub failures: Vec<BulkItemFailure>,
}

impl BulkIndexSummary {
    /// Summary for a batch with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether any item was rejected.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Build a summary from a bulk response body.
    ///
    /// Each entry of `items` is `{"<action>": {"_id", "status", "error"?}}`.
    /// An item counts as failed when it carries an `error` or a status of 300
    /// or above.
    pub fn from_response(response: &Value) -> Result<Self, SearchError> {
        let items = response
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::parse("Bulk response is missing 'items'"))?;

        let mut summary = Self {
            total: items.len(),
            ..Self::default()
        };

        for item in items {
            let result = item
                .as_object()
                .and_then(|actions| actions.values().next())
                .ok_or_else(|| SearchError::parse("Bulk item has no action result"))?;

            let status = result
                .get("status")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u16;
            let error = result.get("error");

            if error.is_none() && status < 300 {
                summary.succeeded += 1;
                continue;
            }

            summary.failed += 1;
            summary.failures.push(BulkItemFailure {
                id: result
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                status,
                reason: error.map(error_reason).unwrap_or_default(),
            });
        }

        Ok(summary)
    }
}

fn error_reason(error: &Value) -> String {
    match error {
        Value::String(reason) => reason.clone(),
        other => {
            let kind = other.get("type").and_then(Value::as_str).unwrap_or("error");
            let reason = other.get("reason").and_then(Value::as_str).unwrap_or("");
            format!("{}: {}", kind, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_items_succeed() {
        let response = json!({
            "took": 4,
            "errors": false,
            "items": [
                {"index": {"_index": "p", "_id": "0", "status": 201, "result": "created"}},
                {"index": {"_index": "p", "_id": "1", "status": 200, "result": "updated"}}
            ]
        });

        let summary = BulkIndexSummary::from_response(&response).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_partial_failure_is_reported() {
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "0", "status": 201}},
                {"index": {
                    "_id": "1",
                    "status": 400,
                    "error": {"type": "mapper_parsing_exception", "reason": "failed to parse field [price]"}
                }}
            ]
        });

        let summary = BulkIndexSummary::from_response(&response).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.failures[0],
            BulkItemFailure {
                id: "1".to_string(),
                status: 400,
                reason: "mapper_parsing_exception: failed to parse field [price]".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_items_is_a_parse_error() {
        let err = BulkIndexSummary::from_response(&json!({"errors": false})).unwrap_err();
        assert!(matches!(err, SearchError::ParseError(_)));
    }
}
