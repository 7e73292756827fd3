//! JSON snapshot store
//!
//! Reads an exported copy of the user tree for offline runs:
//!
//! ```json
//! {"users": {"u1": {"stimmungen": [
//!     {"id": "a", "fields": {"wert": 3, "zeit": {"$timestamp": "2024-03-01T08:00:00Z"}}}
//! ]}}}
//! ```
//!
//! Plain JSON scalars map to scalars; `{"$timestamp": ...}` marks a
//! store-native timestamp; other objects and arrays are kept as text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{CollectionPath, DocumentStore, MemoryStore, StoreError};
use crate::table::{Document, Scalar};

const TIMESTAMP_MARKER: &str = "$timestamp";

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    users: HashMap<String, HashMap<String, Vec<SnapshotDocument>>>,
}

#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    id: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

/// Document store loaded from a JSON snapshot file
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl SnapshotStore {
    /// Load a snapshot file
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        let store = Self::from_json(&content)?;
        tracing::info!("Loaded snapshot from {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            ..store
        })
    }

    /// Build a store from snapshot JSON text
    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        let file: SnapshotFile = serde_json::from_str(content).map_err(|e| StoreError::Decode {
            path: "snapshot".to_string(),
            message: e.to_string(),
        })?;

        let mut inner = MemoryStore::new();
        for (user_id, collections) in file.users {
            for (subcollection, docs) in collections {
                let path = CollectionPath::new(user_id.clone(), subcollection.clone());
                let documents = docs
                    .into_iter()
                    .map(|doc| decode_document(doc, &path))
                    .collect::<Result<Vec<_>, _>>()?;
                inner = inner.with_documents(&user_id, &subcollection, documents);
            }
        }

        Ok(Self {
            path: PathBuf::new(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn decode_document(doc: SnapshotDocument, path: &CollectionPath) -> Result<Document, StoreError> {
    let mut document = Document::new(doc.id);
    for (name, value) in doc.fields {
        let scalar = json_to_scalar(value).map_err(|message| StoreError::Decode {
            path: format!("{}/{}", path, document.id),
            message: format!("field '{}': {}", name, message),
        })?;
        document.set(name, scalar);
    }
    Ok(document)
}

fn json_to_scalar(value: Value) -> Result<Scalar, String> {
    Ok(match value {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Scalar::Int(i),
            None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Scalar::Text(s),
        Value::Object(map) if map.len() == 1 && map.contains_key(TIMESTAMP_MARKER) => {
            match map.get(TIMESTAMP_MARKER) {
                Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                    .map(|dt| Scalar::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|e| format!("invalid timestamp '{}': {}", s, e))?,
                other => return Err(format!("invalid timestamp marker {:?}", other)),
            }
        }
        other => Scalar::Text(other.to_string()),
    })
}

#[async_trait]
impl DocumentStore for SnapshotStore {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn health_check(&self, user_id: &str) -> Result<(), StoreError> {
        self.inner.health_check(user_id).await
    }

    async fn list_documents(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        self.inner.list_documents(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SNAPSHOT: &str = r#"{
        "users": {
            "u1": {
                "stimmungen": [
                    {"id": "a", "fields": {"wert": 3, "zeit": {"$timestamp": "2024-03-01T08:00:00Z"}}},
                    {"id": "b", "fields": {"wert": 2.5, "notiz": null, "tags": ["müde", "gut"]}}
                ]
            }
        }
    }"#;

    #[tokio::test]
    async fn test_decode_snapshot() {
        let store = SnapshotStore::from_json(SNAPSHOT).unwrap();
        let docs = store
            .list_documents(&CollectionPath::new("u1", "stimmungen"))
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[0].get("wert"), Some(&Scalar::Int(3)));
        assert_eq!(
            docs[0].get("zeit"),
            Some(&Scalar::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()))
        );
        assert_eq!(docs[1].get("wert"), Some(&Scalar::Float(2.5)));
        assert_eq!(docs[1].get("notiz"), Some(&Scalar::Null));
        assert_eq!(docs[1].get("tags"), Some(&Scalar::from(r#"["müde","gut"]"#)));
    }

    #[test]
    fn test_bad_timestamp_is_decode_error() {
        let json = r#"{"users": {"u1": {"symptoms": [
            {"id": "x", "fields": {"zeit": {"$timestamp": "gestern"}}}
        ]}}}"#;
        let err = SnapshotStore::from_json(json).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
        assert!(err.to_string().contains("users/u1/symptoms/x"));
    }

    #[tokio::test]
    async fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        tokio::fs::write(&path, SNAPSHOT).await.unwrap();

        let store = SnapshotStore::open(&path).await.unwrap();
        assert_eq!(store.path(), path.as_path());
        assert_eq!(store.name(), "snapshot");

        let missing = SnapshotStore::open(&dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(StoreError::Io(_))));
    }
}
