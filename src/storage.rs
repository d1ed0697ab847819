use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::metrics::time_db_operation;
use crate::version::{VersionId, VersionRecord};

/// Persistence for the applied-version set.
///
/// Each flag flip is durable on its own so an interrupted run can be
/// resumed from whatever was committed.
#[async_trait]
pub trait VersionStorage: Send + Sync {
    /// Every version currently recorded as applied, in any order.
    async fn load_applied(&self) -> Result<Vec<VersionRecord>, StorageError>;

    /// Record one version as applied.
    async fn mark_applied(&self, record: &VersionRecord) -> Result<(), StorageError>;

    /// Remove one version from the applied set.
    async fn mark_unapplied(&self, version: VersionId) -> Result<(), StorageError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    version: i64,
    applied_at: BsonDateTime,
}

/// Applied-version set stored in a MongoDB collection, one document
/// per applied version.
pub struct MongoVersionStorage {
    collection: Collection<VersionDocument>,
    collection_name: String,
}

impl MongoVersionStorage {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        MongoVersionStorage {
            collection: db.collection::<VersionDocument>(collection_name),
            collection_name: collection_name.to_string(),
        }
    }

    /// Unique index on `version` so a version can never be recorded
    /// twice, even across concurrent runs.
    pub async fn ensure_index(&self) -> Result<(), StorageError> {
        let index = IndexModel::builder()
            .keys(doc! { "version": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        time_db_operation("create_index", &self.collection_name, async {
            self.collection.create_index(index, None).await
        })
        .await?;
        tracing::debug!(collection = %self.collection_name, "version index ensured");
        Ok(())
    }

    // Documents come from a collection operators may edit by hand, so
    // a bad version is a storage error, not a panic.
    fn decode(document: VersionDocument, collection: &str) -> Result<VersionRecord, StorageError> {
        if document.version < 0 {
            return Err(StorageError::Backend(format!(
                "corrupt record in {collection}: negative version {}",
                document.version
            )));
        }
        let applied_at =
            DateTime::<Utc>::from_timestamp_millis(document.applied_at.timestamp_millis())
                .unwrap_or_default();
        Ok(VersionRecord::applied_at(
            VersionId::new(document.version),
            applied_at,
        ))
    }
}

#[async_trait]
impl VersionStorage for MongoVersionStorage {
    async fn load_applied(&self) -> Result<Vec<VersionRecord>, StorageError> {
        let mut cursor = time_db_operation("find", &self.collection_name, async {
            self.collection.find(None, None).await
        })
        .await?;

        let mut records = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            records.push(Self::decode(document, &self.collection_name)?);
        }
        Ok(records)
    }

    async fn mark_applied(&self, record: &VersionRecord) -> Result<(), StorageError> {
        let applied_at = record.applied_at.unwrap_or_else(Utc::now);
        let document = VersionDocument {
            id: None,
            version: record.version.as_i64(),
            applied_at: BsonDateTime::from_millis(applied_at.timestamp_millis()),
        };
        time_db_operation("insert_one", &self.collection_name, async {
            self.collection.insert_one(document, None).await
        })
        .await?;
        Ok(())
    }

    async fn mark_unapplied(&self, version: VersionId) -> Result<(), StorageError> {
        time_db_operation("delete_one", &self.collection_name, async {
            self.collection
                .delete_one(doc! { "version": version.as_i64() }, None)
                .await
        })
        .await?;
        Ok(())
    }
}

/// In-memory applied-version set for tests and dry runs. Mirrors the
/// unique-index behaviour of the Mongo store.
#[derive(Debug, Default)]
pub struct MemoryVersionStorage {
    records: Mutex<BTreeMap<VersionId, VersionRecord>>,
    writes: AtomicUsize,
}

impl MemoryVersionStorage {
    pub fn new() -> Self {
        MemoryVersionStorage::default()
    }

    pub fn with_applied(versions: impl IntoIterator<Item = VersionId>) -> Self {
        let storage = MemoryVersionStorage::new();
        {
            let mut records = storage.lock_records();
            for version in versions {
                records.insert(version, VersionRecord::applied_at(version, Utc::now()));
            }
        }
        storage
    }

    pub fn applied_versions(&self) -> Vec<VersionId> {
        self.lock_records().keys().copied().collect()
    }

    /// Number of successful mark calls since construction.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, BTreeMap<VersionId, VersionRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl VersionStorage for MemoryVersionStorage {
    async fn load_applied(&self) -> Result<Vec<VersionRecord>, StorageError> {
        Ok(self.lock_records().values().cloned().collect())
    }

    async fn mark_applied(&self, record: &VersionRecord) -> Result<(), StorageError> {
        let mut records = self.lock_records();
        if records.contains_key(&record.version) {
            return Err(StorageError::Backend(format!(
                "duplicate version {}",
                record.version
            )));
        }
        let mut stored = record.clone();
        if stored.applied_at.is_none() {
            stored.applied_at = Some(Utc::now());
        }
        records.insert(stored.version, stored);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mark_unapplied(&self, version: VersionId) -> Result<(), StorageError> {
        self.lock_records().remove(&version);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
