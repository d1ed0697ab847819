//! Versioned MongoDB schema migrations.
//!
//! A [`registry::Registry`] reconciles the scripts compiled into the
//! binary with the applied set persisted in a tracking collection. An
//! [`orchestrator::Orchestrator`] resolves a plan between the two and
//! runs it, persisting every version flip before moving to the next
//! script so an interrupted run can resume from recorded state.
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod output;
pub mod registry;
pub mod script;
pub mod scripts;
pub mod stats;
pub mod storage;
pub mod version;

pub use error::{MigrationError, StorageError, VersionState};
pub use orchestrator::{MigrationReport, Orchestrator};
pub use registry::{MigrationPlan, Registry, RegistryDetails, RegistrySettings};
pub use script::{Direction, MigrationScript, ScriptSource};
pub use storage::{MemoryVersionStorage, MongoVersionStorage, VersionStorage};
pub use version::{VersionId, VersionRecord};
