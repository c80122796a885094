//! Index settings and mappings for the sample product index.

use serde_json::{json, Map, Value};

/// Field names and engine types of the sample product schema.
pub const PRODUCT_INDEX_FIELDS: &[(&str, &str)] = &[
    ("product_id", "keyword"),
    ("name", "text"),
    ("category", "keyword"),
    ("price", "float"),
    ("in_stock", "boolean"),
    ("rating", "float"),
    ("created_at", "date"),
];

/// Get the create-index body for the sample product index.
///
/// Only mappings are declared; shard and replica counts are left to the
/// cluster defaults.
pub fn product_index_settings() -> Value {
    let properties: Map<String, Value> = PRODUCT_INDEX_FIELDS
        .iter()
        .map(|(field, kind)| (field.to_string(), json!({ "type": kind })))
        .collect();

    json!({
        "mappings": {
            "properties": properties
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_mapping_structure() {
        let settings = product_index_settings();
        let properties = &settings["mappings"]["properties"];

        assert_eq!(properties["product_id"]["type"], "keyword");
        assert_eq!(properties["name"]["type"], "text");
        assert_eq!(properties["category"]["type"], "keyword");
        assert_eq!(properties["price"]["type"], "float");
        assert_eq!(properties["in_stock"]["type"], "boolean");
        assert_eq!(properties["rating"]["type"], "float");
        assert_eq!(properties["created_at"]["type"], "date");
        assert_eq!(properties.as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_no_settings_block() {
        assert!(product_index_settings().get("settings").is_none());
    }
}
