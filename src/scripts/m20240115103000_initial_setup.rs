use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

use crate::script::MigrationScript;
use crate::version::VersionId;

/// Creates the accounts collection with a unique index on email.
pub struct InitialSetup;

#[async_trait]
impl MigrationScript for InitialSetup {
    fn version(&self) -> VersionId {
        VersionId::new(20240115103000)
    }

    fn description(&self) -> &str {
        "create accounts collection with unique email index"
    }

    async fn up(&self, db: &Database) -> Result<()> {
        db.create_collection("accounts", None).await?;
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        db.collection::<Document>("accounts")
            .create_index(email_index, None)
            .await?;
        Ok(())
    }

    async fn down(&self, db: &Database) -> Result<()> {
        db.collection::<Document>("accounts").drop(None).await?;
        Ok(())
    }
}
