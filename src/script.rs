use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mongodb::Database;

use crate::version::VersionId;

/// One reversible schema change, compiled into the binary.
///
/// Implementations must be pure with respect to registration: the
/// registry may hold them for the lifetime of the process and invoke
/// `up`/`down` at most once per run.
#[async_trait]
pub trait MigrationScript: Send + Sync {
    /// Unique, stable version id. Two scripts must never share one.
    fn version(&self) -> VersionId;

    /// Short human-readable summary shown in status and run output.
    fn description(&self) -> &str;

    /// Apply the schema change.
    async fn up(&self, db: &Database) -> Result<()>;

    /// Reverse the schema change.
    async fn down(&self, db: &Database) -> Result<()>;
}

/// Which way a migration run moves the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Supplies the set of scripts a registry starts from.
///
/// The built-in implementation for `Vec<Arc<dyn MigrationScript>>`
/// covers the usual case of a compiled-in list.
pub trait ScriptSource {
    fn scripts(self) -> Vec<Arc<dyn MigrationScript>>;
}

impl ScriptSource for Vec<Arc<dyn MigrationScript>> {
    fn scripts(self) -> Vec<Arc<dyn MigrationScript>> {
        self
    }
}
