//! Document store access for ingestion.

use crate::error::{Result, SegmentError, Stage};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// One exported document.
pub type Document = Map<String, Value>;

/// Read access to an upstream document store.
pub trait DocumentStore: Send + Sync {
    /// Export every document of `database.collection`.
    fn export_collection(&self, database: &str, collection: &str) -> Result<Vec<Document>>;

    /// Short human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Document store backed by JSON Lines files: `<root>/<database>/<collection>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlDocumentStore {
    pub root: PathBuf,
}

impl JsonlDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn collection_path(&self, database: &str, collection: &str) -> PathBuf {
        self.root.join(database).join(format!("{collection}.jsonl"))
    }
}

impl DocumentStore for JsonlDocumentStore {
    fn export_collection(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let path = self.collection_path(database, collection);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| SegmentError::from_io(Stage::Ingestion, &path, e))?;

        let mut docs = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|e| {
                SegmentError::serialization(
                    Stage::Ingestion,
                    format!("parsing {} line {}", path.display(), line_no + 1),
                    e,
                )
            })?;
            match value {
                Value::Object(map) => docs.push(map),
                other => {
                    return Err(SegmentError::invalid_input(
                        Stage::Ingestion,
                        format!(
                            "{} line {} is not a JSON object (found {})",
                            path.display(),
                            line_no + 1,
                            type_name(&other)
                        ),
                    ));
                }
            }
        }
        Ok(docs)
    }

    fn describe(&self) -> String {
        format!("jsonl:{}", self.root.display())
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Open a document store from its connection string.
///
/// Supported: `file://<dir>` (JSON Lines export directory).
pub fn connect(url: &str) -> Result<Box<dyn DocumentStore>> {
    let url = url.trim();
    if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            return Err(SegmentError::config(
                "file:// connection string has no directory",
            ));
        }
        return Ok(Box::new(JsonlDocumentStore::new(path)));
    }
    let scheme = url.split("://").next().unwrap_or(url);
    Err(SegmentError::config(format!(
        "unsupported document store scheme '{scheme}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_collection() {
        let dir = TempDir::new().unwrap();
        let store = JsonlDocumentStore::new(dir.path());
        let path = store.collection_path("ineuron", "customers");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "{\"_id\": \"a\", \"Age\": \"58\"}\n\n{\"_id\": \"b\", \"Age\": 61}\n",
        )
        .unwrap();

        let docs = store.export_collection("ineuron", "customers").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["Age"], serde_json::json!(61));
    }

    #[test]
    fn test_export_missing_collection_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = JsonlDocumentStore::new(dir.path());
        let err = store.export_collection("db", "nope").unwrap_err();
        assert!(matches!(
            err,
            SegmentError::NotFound {
                stage: Stage::Ingestion,
                ..
            }
        ));
    }

    #[test]
    fn test_export_rejects_non_object_lines() {
        let dir = TempDir::new().unwrap();
        let store = JsonlDocumentStore::new(dir.path());
        let path = store.collection_path("db", "c");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2]\n").unwrap();
        assert!(store.export_collection("db", "c").is_err());
    }

    #[test]
    fn test_connect_schemes() {
        assert!(connect("file:///tmp/docs").is_ok());
        let err = connect("mongodb+srv://user@cluster0").err().unwrap();
        assert!(matches!(err, SegmentError::Config { .. }));
        assert!(err.to_string().contains("mongodb+srv"));
    }
}
