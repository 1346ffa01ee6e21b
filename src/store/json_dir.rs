// src/store/json_dir.rs
//! File-backed store: each collection is `<data_dir>/<collection>.json`,
//! a JSON array of documents (mongoexport `--jsonArray` output works as-is).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::store::{DocumentStore, RawRecord};

pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.json"))
    }
}

fn parse_collection(collection: &str, content: &str) -> Result<Vec<RawRecord>, StoreError> {
    let decode_err = |reason: String| StoreError::Decode {
        collection: collection.to_string(),
        reason,
    };
    let docs: Vec<serde_json::Value> =
        serde_json::from_str(content).map_err(|e| decode_err(e.to_string()))?;
    docs.into_iter()
        .map(|d| RawRecord::from_json(d).map_err(decode_err))
        .collect()
}

#[async_trait::async_trait]
impl DocumentStore for JsonDirStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<RawRecord>, StoreError> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Err(StoreError::Connection(format!(
                "data directory {} not found",
                self.root.display()
            )));
        }
        let path = self.collection_path(collection);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            // Same as an empty collection in a real document store.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Query(format!(
                    "reading {}: {e}",
                    path.display()
                )))
            }
        };
        parse_collection(collection, &content)
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            StoreError::Connection(format!("listing {}: {e}", self.root.display()))
        })?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn name(&self) -> &'static str {
        "json_dir"
    }
}
