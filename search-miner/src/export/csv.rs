//! CSV export.
//!
//! Columns are either the requested fields, in order, or every key seen
//! across the exported sources in first-seen order.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::MinerError;
use search_miner_shared::Document;

/// Column list for `sources`.
pub fn csv_columns(sources: &[Document], fields: Option<&[String]>) -> Vec<String> {
    if let Some(fields) = fields {
        return fields.to_vec();
    }

    let mut columns: Vec<String> = Vec::new();
    for source in sources {
        for key in source.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Render one cell. Missing and null values are empty; strings are raw;
/// arrays and objects are compact JSON.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write a header and one row per source. Returns the number of sources
/// exported.
///
/// With no columns nothing is written, but the sources still count as
/// exported.
pub fn write_csv<W: Write>(
    writer: W,
    sources: &[Document],
    columns: &[String],
) -> Result<usize, MinerError> {
    if columns.is_empty() {
        if !sources.is_empty() {
            warn!(count = sources.len(), "No fields to write; CSV output is empty");
        }
        return Ok(sources.len());
    }

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(columns)?;
    for source in sources {
        writer.write_record(columns.iter().map(|column| cell_text(source.get(column))))?;
    }
    writer.flush().map_err(csv::Error::from)?;

    Ok(sources.len())
}

/// Export `sources` to a CSV file at `path`.
pub fn write_csv_file(
    path: &Path,
    sources: &[Document],
    fields: Option<&[String]>,
) -> Result<usize, MinerError> {
    let file = File::create(path).map_err(|e| MinerError::io(path, e))?;
    let columns = csv_columns(sources, fields);
    write_csv(file, sources, &columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn render(sources: &[Document], fields: Option<&[String]>) -> String {
        let mut buffer = Vec::new();
        let columns = csv_columns(sources, fields);
        write_csv(&mut buffer, sources, &columns).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_union_of_keys_in_first_seen_order() {
        let sources = vec![
            doc(json!({"name": "Lamp", "price": 25.5})),
            doc(json!({"name": "Desk", "in_stock": true})),
        ];

        assert_eq!(render(&sources, None), "name,price,in_stock\nLamp,25.5,\nDesk,,true\n");
    }

    #[test]
    fn test_fields_select_and_order_columns() {
        let sources = vec![doc(json!({"name": "Lamp", "price": 25.5, "category": "Home"}))];
        let fields = vec!["price".to_string(), "name".to_string(), "missing".to_string()];

        assert_eq!(render(&sources, Some(&fields)), "price,name,missing\n25.5,Lamp,\n");
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&Value::Null)), "");
        assert_eq!(cell_text(Some(&json!("plain, text"))), "plain, text");
        assert_eq!(cell_text(Some(&json!(3))), "3");
        assert_eq!(cell_text(Some(&json!(false))), "false");
        assert_eq!(cell_text(Some(&json!(["a", 1]))), r#"["a",1]"#);
        assert_eq!(cell_text(Some(&json!({"k": "v"}))), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_embedded_commas_are_quoted() {
        let sources = vec![doc(json!({"category": "Home & Kitchen, Outdoor"}))];
        assert_eq!(render(&sources, None), "category\n\"Home & Kitchen, Outdoor\"\n");
    }

    #[test]
    fn test_nothing_to_write() {
        assert_eq!(render(&[], None), "");
    }

    #[test]
    fn test_sources_without_fields_still_count() {
        let sources = vec![doc(json!({})), doc(json!({}))];
        let columns = csv_columns(&sources, None);
        assert!(columns.is_empty());

        let mut buffer = Vec::new();
        let rows = write_csv(&mut buffer, &sources, &columns).unwrap();
        assert_eq!(rows, 2);
        assert!(buffer.is_empty());
    }
}
