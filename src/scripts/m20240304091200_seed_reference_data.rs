use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::Database;

use crate::script::MigrationScript;
use crate::stats::CollectionStats;
use crate::version::VersionId;

/// Seeds the currencies reference collection.
pub struct SeedReferenceData;

#[async_trait]
impl MigrationScript for SeedReferenceData {
    fn version(&self) -> VersionId {
        VersionId::new(20240304091200)
    }

    fn description(&self) -> &str {
        "seed currency reference data"
    }

    async fn up(&self, db: &Database) -> Result<()> {
        let currencies = db.collection::<Document>("currencies");
        let seed = vec![
            doc! { "code": "USD", "name": "US Dollar", "minor_units": 2, "seed": true },
            doc! { "code": "EUR", "name": "Euro", "minor_units": 2, "seed": true },
            doc! { "code": "JPY", "name": "Japanese Yen", "minor_units": 0, "seed": true },
        ];
        currencies.insert_many(seed, None).await?;

        let stats = CollectionStats::for_collection(db, "currencies").await?;
        tracing::info!(%stats, "currency reference data seeded");
        Ok(())
    }

    async fn down(&self, db: &Database) -> Result<()> {
        db.collection::<Document>("currencies")
            .delete_many(doc! { "seed": true }, None)
            .await?;
        Ok(())
    }
}
