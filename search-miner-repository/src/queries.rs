//! Request body builders.
//!
//! Query bodies are opaque to this tool; these helpers only place them under
//! the keys the search API expects.

use serde_json::{json, Value};

/// Keep-alive used for scroll contexts opened by a scan.
pub const SCROLL_KEEP_ALIVE: &str = "1m";

/// The `match_all` clause.
pub fn match_all() -> Value {
    json!({ "match_all": {} })
}

/// Wrap a bare query clause as `{"query": clause}`.
///
/// A body that already has a top-level `query` key is returned unchanged, so
/// callers may pass either form.
pub fn wrap_query(body: Value) -> Value {
    if body.get("query").is_some() {
        body
    } else {
        json!({ "query": body })
    }
}

/// A match-all request bounded by `size`.
pub fn match_all_request(size: usize) -> Value {
    json!({
        "query": match_all(),
        "size": size
    })
}

/// A zero-hit request carrying only aggregations.
pub fn aggregation_request(aggs: Value) -> Value {
    json!({
        "size": 0,
        "aggs": aggs
    })
}

/// Restrict the returned `_source` to `fields`.
pub fn with_source_fields(mut body: Value, fields: &[String]) -> Value {
    if let Some(object) = body.as_object_mut() {
        object.insert("_source".to_string(), json!(fields));
    }
    body
}

/// Prepare a body for scrolling, sorted by `_doc` unless a sort is given.
pub fn scan_request(body: Value) -> Value {
    let mut body = wrap_query(body);
    if let Some(object) = body.as_object_mut() {
        object
            .entry("sort")
            .or_insert_with(|| json!(["_doc"]));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_bare_clause() {
        let wrapped = wrap_query(json!({"term": {"category": "Books"}}));
        assert_eq!(wrapped, json!({"query": {"term": {"category": "Books"}}}));
    }

    #[test]
    fn test_wrap_leaves_wrapped_body_alone() {
        let body = json!({"query": {"match_all": {}}, "size": 3});
        assert_eq!(wrap_query(body.clone()), body);
    }

    #[test]
    fn test_aggregation_request_has_zero_size() {
        let request = aggregation_request(json!({"by_category": {"terms": {"field": "category"}}}));
        assert_eq!(request["size"], 0);
        assert!(request["aggs"]["by_category"].is_object());
    }

    #[test]
    fn test_source_fields() {
        let fields = vec!["name".to_string(), "price".to_string()];
        let body = with_source_fields(wrap_query(match_all()), &fields);
        assert_eq!(body["_source"], json!(["name", "price"]));
    }

    #[test]
    fn test_scan_request_defaults_sort() {
        let body = scan_request(match_all());
        assert_eq!(body["sort"], json!(["_doc"]));

        let body = scan_request(json!({"query": {"match_all": {}}, "sort": ["price"]}));
        assert_eq!(body["sort"], json!(["price"]));
    }
}
