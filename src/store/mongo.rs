// src/store/mongo.rs
//! MongoDB backend (feature `mongo`). The client is created lazily on first
//! use and then reused for the life of the handle.

use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Database};
use tokio::sync::OnceCell;

use crate::error::StoreError;
use crate::store::{DocumentStore, RawRecord, RawValue};

pub struct MongoStore {
    uri: String,
    database: String,
    db: OnceCell<Database>,
}

impl MongoStore {
    pub fn new(uri: String, database: String) -> Self {
        Self {
            uri,
            database,
            db: OnceCell::new(),
        }
    }

    async fn db(&self) -> Result<&Database, StoreError> {
        self.db
            .get_or_try_init(|| async {
                let client = Client::with_uri_str(&self.uri)
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
                tracing::info!(target: "store", database = %self.database, "mongo client ready");
                Ok(client.database(&self.database))
            })
            .await
    }
}

fn bson_to_raw(value: Bson) -> RawValue {
    match value {
        Bson::Null | Bson::Undefined => RawValue::Null,
        Bson::Boolean(b) => RawValue::Bool(b),
        Bson::Double(n) => RawValue::Number(n),
        Bson::Int32(n) => RawValue::Number(f64::from(n)),
        Bson::Int64(n) => RawValue::Number(n as f64),
        Bson::String(s) => RawValue::Text(s),
        Bson::ObjectId(oid) => RawValue::Text(oid.to_hex()),
        Bson::DateTime(dt) => Utc
            .timestamp_millis_opt(dt.timestamp_millis())
            .single()
            .map_or(RawValue::Null, RawValue::DateTime),
        other => RawValue::Other(other.into_relaxed_extjson()),
    }
}

fn document_to_record(doc: Document) -> RawRecord {
    let mut rec = RawRecord::new();
    for (k, v) in doc {
        rec.insert(&k, bson_to_raw(v));
    }
    rec
}

#[async_trait::async_trait]
impl DocumentStore for MongoStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<RawRecord>, StoreError> {
        let db = self.db().await?;
        let mut cursor = db
            .collection::<Document>(collection)
            .find(doc! {})
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            out.push(document_to_record(doc));
        }
        Ok(out)
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let db = self.db().await?;
        let mut names = db
            .list_collection_names()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        names.sort();
        Ok(names)
    }

    fn name(&self) -> &'static str {
        "mongo"
    }
}
