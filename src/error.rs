use std::fmt;

use thiserror::Error;

use crate::version::VersionId;

/// Applied-state that made a manual mark operation invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    Applied,
    NotApplied,
}

impl fmt::Display for VersionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionState::Applied => write!(f, "already applied"),
            VersionState::NotApplied => write!(f, "not applied"),
        }
    }
}

/// Failure talking to the backing version store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("MongoDB operation failed: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum MigrationError {
    /// Target or marked version has no registered script.
    #[error("could not find migration version {0}")]
    UnknownVersion(VersionId),

    /// A script declared a version another script already claimed.
    #[error("duplicate migration version {0}")]
    DuplicateVersion(VersionId),

    /// Running with no explicit target and nothing left to execute.
    #[error("no migrations to execute")]
    NoMigrationsToExecute,

    /// Manual mark rejected because the version is already in the
    /// requested state.
    #[error("version {version} is {state}")]
    InvalidState {
        version: VersionId,
        state: VersionState,
    },

    /// A script's up or down hook failed. Versions before this one in
    /// the plan stay committed.
    #[error("execution of migration {version} failed: {source}")]
    Execution {
        version: VersionId,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl MigrationError {
    pub fn execution(version: VersionId, source: anyhow::Error) -> Self {
        MigrationError::Execution { version, source }
    }
}
