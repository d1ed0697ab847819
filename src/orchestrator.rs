use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use mongodb::Database;

use crate::error::{MigrationError, VersionState};
use crate::metrics::Timer;
use crate::output::OutputSink;
use crate::registry::Registry;
use crate::script::Direction;
use crate::storage::VersionStorage;
use crate::version::{VersionId, VersionRecord};

/// What a finished run executed and how long it took.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub executed: Vec<VersionId>,
    pub elapsed: Duration,
}

impl MigrationReport {
    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }
}

/// Drives migration runs: resolves a plan against the registry, runs
/// each script, and persists every version flip before moving on.
///
/// Persistence is per step on purpose. When script k fails, versions
/// 1..k-1 stay committed and a rerun picks up from the recorded state.
/// A storage failure after a script succeeded leaves that script's
/// side effects applied with no record of them; the operator resolves
/// that window manually with the version mark operations.
pub struct Orchestrator {
    registry: Registry,
    db: Database,
    storage: Arc<dyn VersionStorage>,
    sink: Arc<dyn OutputSink>,
}

impl Orchestrator {
    pub fn new(
        registry: Registry,
        db: Database,
        storage: Arc<dyn VersionStorage>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Orchestrator {
            registry,
            db,
            storage,
            sink,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run to `target`, or to the latest available version when no
    /// target is given.
    pub async fn migrate(
        &mut self,
        target: Option<VersionId>,
    ) -> Result<MigrationReport, MigrationError> {
        let plan = self.registry.resolve(target)?;
        self.warn_unavailable();

        let Some(direction) = plan.direction else {
            self.sink.write_line(&format!(
                "Already at version {}, nothing to execute.",
                plan.to
            ));
            return Ok(MigrationReport::default());
        };

        self.sink.write_line(&format!(
            "Migrating {} to {} from {}",
            direction, plan.to, plan.from
        ));
        self.sink.write_line("");

        let timer = Timer::new("migration_run").with_thresholds(60_000, 300_000);
        let mut executed = Vec::with_capacity(plan.scripts.len());
        for script in &plan.scripts {
            let version = script.version();
            self.sink.write_line(&format!(
                "  ++ migrating {} ({})",
                version,
                script.description()
            ));
            let step_started = Instant::now();

            let result = match direction {
                Direction::Up => script.up(&self.db).await,
                Direction::Down => script.down(&self.db).await,
            };
            if let Err(source) = result {
                tracing::error!(
                    version = %version,
                    direction = %direction,
                    error = %format!("{source:#}"),
                    "migration step failed"
                );
                return Err(MigrationError::execution(version, source));
            }

            let persisted = match direction {
                Direction::Up => {
                    let at = Utc::now();
                    let result = self
                        .storage
                        .mark_applied(&VersionRecord::applied_at(version, at))
                        .await;
                    if result.is_ok() {
                        self.registry.note_applied(version, at);
                    }
                    result
                }
                Direction::Down => {
                    let result = self.storage.mark_unapplied(version).await;
                    if result.is_ok() {
                        self.registry.note_unapplied(version);
                    }
                    result
                }
            };
            if let Err(source) = persisted {
                tracing::error!(
                    version = %version,
                    error = %source,
                    "script ran but its version flip was not recorded"
                );
                return Err(source.into());
            }

            self.sink.write_line(&format!(
                "  ++ migrated {} in {:.3}s",
                version,
                step_started.elapsed().as_secs_f64()
            ));
            executed.push(version);
        }

        let elapsed = timer.elapsed();
        timer.log_elapsed(None);
        self.sink.write_line("");
        self.sink.write_line("  ------------------------");
        self.sink
            .write_line(&format!("  ++ finished in {:.3}s", elapsed.as_secs_f64()));
        self.sink
            .write_line(&format!("  ++ {} migrations executed", executed.len()));
        tracing::info!(
            executed = executed.len(),
            direction = %direction,
            from = %plan.from,
            to = %plan.to,
            "migration run complete"
        );
        Ok(MigrationReport { executed, elapsed })
    }

    /// Record `version` as applied without running its script.
    pub async fn mark_applied(&mut self, version: VersionId) -> Result<(), MigrationError> {
        if !self.registry.has_version(version) {
            return Err(MigrationError::UnknownVersion(version));
        }
        if self.registry.is_applied(version) {
            return Err(MigrationError::InvalidState {
                version,
                state: VersionState::Applied,
            });
        }
        let at = Utc::now();
        self.storage
            .mark_applied(&VersionRecord::applied_at(version, at))
            .await?;
        self.registry.note_applied(version, at);
        tracing::info!(version = %version, "version marked as applied");
        Ok(())
    }

    /// Remove `version` from the applied set without running its
    /// script.
    pub async fn mark_unapplied(&mut self, version: VersionId) -> Result<(), MigrationError> {
        if !self.registry.has_version(version) {
            return Err(MigrationError::UnknownVersion(version));
        }
        if !self.registry.is_applied(version) {
            return Err(MigrationError::InvalidState {
                version,
                state: VersionState::NotApplied,
            });
        }
        self.storage.mark_unapplied(version).await?;
        self.registry.note_unapplied(version);
        tracing::info!(version = %version, "version marked as unapplied");
        Ok(())
    }

    fn warn_unavailable(&self) {
        let unavailable = self.registry.unavailable_applied();
        if unavailable.is_empty() {
            return;
        }
        self.sink.write_line(&format!(
            "WARNING! You have {} previously executed migrations in the database that are not registered migrations.",
            unavailable.len()
        ));
        for version in &unavailable {
            self.sink.write_line(&format!(
                "    >> {} ({})",
                version.format_timestamp(),
                version
            ));
        }
        tracing::warn!(
            count = unavailable.len(),
            "applied versions without a registered script"
        );
    }
}
