use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

use crate::script::MigrationScript;
use crate::version::VersionId;

/// Indexes the transactions collection for per-account history
/// queries.
pub struct TransactionIndexes;

#[async_trait]
impl MigrationScript for TransactionIndexes {
    fn version(&self) -> VersionId {
        VersionId::new(20240218142500)
    }

    fn description(&self) -> &str {
        "index transactions by account and recency"
    }

    async fn up(&self, db: &Database) -> Result<()> {
        let transactions = db.collection::<Document>("transactions");
        let account_index = IndexModel::builder()
            .keys(doc! { "account_id": 1 })
            .options(IndexOptions::builder().name("account_id_idx".to_string()).build())
            .build();
        transactions.create_index(account_index, None).await?;

        // newest-first history pages per account
        let recency_index = IndexModel::builder()
            .keys(doc! { "account_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("account_recency_idx".to_string())
                    .build(),
            )
            .build();
        transactions.create_index(recency_index, None).await?;
        Ok(())
    }

    async fn down(&self, db: &Database) -> Result<()> {
        let transactions = db.collection::<Document>("transactions");
        transactions.drop_index("account_recency_idx", None).await?;
        transactions.drop_index("account_id_idx", None).await?;
        Ok(())
    }
}
