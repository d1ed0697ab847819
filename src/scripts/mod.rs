//! Migration scripts compiled into this binary.
//!
//! `mongo-migrate generate <name>` writes a new stub into this
//! directory; declare its module below and push it onto `all()` to
//! register it.
use std::sync::Arc;

use crate::script::MigrationScript;

pub mod m20240115103000_initial_setup;
pub mod m20240218142500_transaction_indexes;
pub mod m20240304091200_seed_reference_data;

pub fn all() -> Vec<Arc<dyn MigrationScript>> {
    vec![
        Arc::new(m20240115103000_initial_setup::InitialSetup),
        Arc::new(m20240218142500_transaction_indexes::TransactionIndexes),
        Arc::new(m20240304091200_seed_reference_data::SeedReferenceData),
        // Add more migrations here as needed
    ]
}
