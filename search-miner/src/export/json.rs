//! JSON export.

use std::path::Path;

use crate::MinerError;
use search_miner_shared::Document;

/// Write `sources` as a pretty-printed JSON array. Returns the element count.
pub fn write_json_file(path: &Path, sources: &[Document]) -> Result<usize, MinerError> {
    let mut contents = serde_json::to_string_pretty(sources)?;
    contents.push('\n');
    std::fs::write(path, contents).map_err(|e| MinerError::io(path, e))?;
    Ok(sources.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    #[test]
    fn test_writes_pretty_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        let sources = vec![json!({"a": 1}).as_object().cloned().unwrap()];

        assert_eq!(write_json_file(&path, &sources).unwrap(), 1);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("[\n  {\n"));
        let parsed: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, json!([{"a": 1}]));
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let err = write_json_file(Path::new("/no/such/dir/out.json"), &[]).unwrap_err();
        assert!(matches!(err, MinerError::IoError { .. }));
    }
}
