use std::fmt;

use anyhow::{Context, Result};
use mongodb::bson::{doc, Bson, Document};
use mongodb::Database;

use crate::metrics::time_db_operation;

/// Size and index figures for one collection, as reported by the
/// server's `collStats` command.
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub namespace: String,
    pub count: i64,
    pub size: i64,
    pub avg_obj_size: i64,
    pub storage_size: i64,
    pub num_indexes: i64,
    pub total_index_size: i64,
}

impl CollectionStats {
    pub async fn for_collection(db: &Database, collection: &str) -> Result<Self> {
        let reply = time_db_operation("coll_stats", collection, async {
            db.run_command(doc! { "collStats": collection }, None).await
        })
        .await
        .with_context(|| format!("collStats failed for '{collection}'"))?;
        Ok(Self::from_document(&reply))
    }

    fn from_document(document: &Document) -> Self {
        CollectionStats {
            namespace: document.get_str("ns").unwrap_or_default().to_string(),
            count: numeric(document, "count"),
            size: numeric(document, "size"),
            avg_obj_size: numeric(document, "avgObjSize"),
            storage_size: numeric(document, "storageSize"),
            num_indexes: numeric(document, "nindexes"),
            total_index_size: numeric(document, "totalIndexSize"),
        }
    }
}

impl fmt::Display for CollectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} documents, {} bytes ({} on disk), {} indexes totalling {} bytes",
            self.namespace,
            self.count,
            self.size,
            self.storage_size,
            self.num_indexes,
            self.total_index_size
        )
    }
}

/// The server reports these as int32, int64 or double depending on
/// version and magnitude.
fn numeric(document: &Document, key: &str) -> i64 {
    match document.get(key) {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_mixed_numeric_types() {
        let reply = doc! {
            "ns": "app.currencies",
            "count": 42_i32,
            "size": 8_192_i64,
            "avgObjSize": 195.0,
            "storageSize": 16_384_i32,
            "nindexes": 2_i32,
            "totalIndexSize": 4_096_i64,
        };
        let stats = CollectionStats::from_document(&reply);
        assert_eq!(stats.namespace, "app.currencies");
        assert_eq!(stats.count, 42);
        assert_eq!(stats.size, 8_192);
        assert_eq!(stats.avg_obj_size, 195);
        assert_eq!(stats.storage_size, 16_384);
        assert_eq!(stats.num_indexes, 2);
        assert_eq!(stats.total_index_size, 4_096);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let stats = CollectionStats::from_document(&doc! { "ns": "app.empty" });
        assert_eq!(stats.count, 0);
        assert_eq!(stats.total_index_size, 0);
    }

    #[test]
    fn display_is_a_single_line() {
        let stats = CollectionStats::from_document(&doc! {
            "ns": "app.currencies",
            "count": 3_i32,
            "nindexes": 1_i32,
        });
        let line = stats.to_string();
        assert!(line.contains("app.currencies"));
        assert!(line.contains("3 documents"));
        assert!(!line.contains('\n'));
    }
}
