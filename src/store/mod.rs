// src/store/mod.rs
pub mod json_dir;
pub mod memory;
#[cfg(feature = "mongo")]
pub mod mongo;
pub mod record;

use std::sync::Arc;

use anyhow::Result;
use metrics::counter;

use crate::config::dashboard::StoreConfig;
use crate::error::StoreError;
use crate::source::Source;

pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;
pub use record::{RawRecord, RawValue};

/// Backing store holding one collection of raw documents per source.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of `collection`, in the store's natural order.
    async fn find_all(&self, collection: &str) -> Result<Vec<RawRecord>, StoreError>;

    /// Names of the collections the store holds, sorted ascending.
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    fn name(&self) -> &'static str;
}

/// Read all raw documents for `source`. No filtering, paging or ordering.
pub async fn read_source(
    store: &dyn DocumentStore,
    source: Source,
) -> Result<Vec<RawRecord>, StoreError> {
    match store.find_all(source.as_str()).await {
        Ok(docs) => {
            tracing::debug!(
                target: "store",
                store = store.name(),
                collection = source.as_str(),
                docs = docs.len(),
                "collection read"
            );
            Ok(docs)
        }
        Err(e) => {
            tracing::warn!(target: "store", error = %e, store = store.name(), "store error");
            counter!("store_errors_total").increment(1);
            Err(e)
        }
    }
}

/// Build the process-wide store handle from configuration.
pub fn build_store(cfg: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    match cfg {
        StoreConfig::JsonDir { data_dir } => Ok(Arc::new(JsonDirStore::new(data_dir.clone()))),
        #[cfg(feature = "mongo")]
        StoreConfig::Mongo { uri, database } => {
            Ok(Arc::new(mongo::MongoStore::new(uri.clone(), database.clone())))
        }
        #[cfg(not(feature = "mongo"))]
        StoreConfig::Mongo { .. } => {
            anyhow::bail!("store backend 'mongo' requires building with feature `mongo`")
        }
    }
}
