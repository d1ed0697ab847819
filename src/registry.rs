use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound::{Excluded, Included};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::MigrationError;
use crate::script::{Direction, MigrationScript, ScriptSource};
use crate::storage::VersionStorage;
use crate::version::VersionId;

const DATABASE_DRIVER: &str = "MongoDB";

/// Identity and storage coordinates of one migration set.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub name: String,
    pub database: String,
    pub collection: String,
    pub namespace: String,
    pub directory: PathBuf,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        RegistrySettings {
            name: "Application Migrations".into(),
            database: "app".into(),
            collection: "migration_versions".into(),
            namespace: "mongo_migrate::scripts".into(),
            directory: PathBuf::from("src/scripts"),
        }
    }
}

/// Ordered set of scripts selected by [`Registry::resolve`], plus the
/// endpoints of the move.
pub struct MigrationPlan {
    /// `None` when there is nothing to do.
    pub direction: Option<Direction>,
    pub from: VersionId,
    pub to: VersionId,
    pub scripts: Vec<Arc<dyn MigrationScript>>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn versions(&self) -> Vec<VersionId> {
        self.scripts.iter().map(|s| s.version()).collect()
    }
}

// Not derivable: trait objects have no Debug bound. Render the
// selected versions instead of the scripts themselves.
impl fmt::Debug for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationPlan")
            .field("direction", &self.direction)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("versions", &self.versions())
            .finish()
    }
}

/// Point-in-time summary of a registry, for status output.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryDetails {
    pub name: String,
    pub database_driver: &'static str,
    pub database: String,
    pub collection: String,
    pub namespace: String,
    pub directory: String,
    pub current_version: VersionId,
    pub latest_version: VersionId,
    pub num_applied: usize,
    pub num_unavailable_applied: usize,
    pub num_available: usize,
    pub num_outstanding: usize,
}

/// Reconciles the scripts compiled into the binary with the applied
/// set persisted in the tracking collection.
///
/// `available` holds every registered script keyed by version;
/// `applied` holds every version the store says has run, including
/// versions with no matching script. Both maps stay ordered so range
/// queries come out in version order.
pub struct Registry {
    settings: RegistrySettings,
    available: BTreeMap<VersionId, Arc<dyn MigrationScript>>,
    applied: BTreeMap<VersionId, DateTime<Utc>>,
}

impl Registry {
    pub fn new(settings: RegistrySettings) -> Self {
        Registry {
            settings,
            available: BTreeMap::new(),
            applied: BTreeMap::new(),
        }
    }

    /// Build a registry from a script source and the persisted applied
    /// set, read once.
    pub async fn load(
        settings: RegistrySettings,
        source: impl ScriptSource,
        storage: &dyn VersionStorage,
    ) -> Result<Self, MigrationError> {
        let mut registry = Registry::new(settings);
        registry.register_all(source)?;
        for record in storage.load_applied().await? {
            registry
                .applied
                .insert(record.version, record.applied_at.unwrap_or_default());
        }
        tracing::debug!(
            available = registry.available.len(),
            applied = registry.applied.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    pub fn register(&mut self, script: Arc<dyn MigrationScript>) -> Result<(), MigrationError> {
        let version = script.version();
        debug_assert!(!version.is_zero(), "version 0 is reserved");
        if self.available.contains_key(&version) {
            return Err(MigrationError::DuplicateVersion(version));
        }
        self.available.insert(version, script);
        Ok(())
    }

    pub fn register_all(&mut self, source: impl ScriptSource) -> Result<(), MigrationError> {
        for script in source.scripts() {
            self.register(script)?;
        }
        Ok(())
    }

    pub(crate) fn note_applied(&mut self, version: VersionId, at: DateTime<Utc>) {
        self.applied.insert(version, at);
    }

    pub(crate) fn note_unapplied(&mut self, version: VersionId) {
        self.applied.remove(&version);
    }

    /// Highest applied version, `ZERO` when nothing has run.
    pub fn current_version(&self) -> VersionId {
        self.applied
            .keys()
            .next_back()
            .copied()
            .unwrap_or(VersionId::ZERO)
    }

    /// Highest registered version, `ZERO` when no scripts exist.
    pub fn latest_version(&self) -> VersionId {
        self.available
            .keys()
            .next_back()
            .copied()
            .unwrap_or(VersionId::ZERO)
    }

    pub fn available_versions(&self) -> Vec<VersionId> {
        self.available.keys().copied().collect()
    }

    pub fn applied_versions(&self) -> Vec<VersionId> {
        self.applied.keys().copied().collect()
    }

    /// Applied versions whose script is gone from the compiled set.
    /// These are reported, never pruned.
    pub fn unavailable_applied(&self) -> Vec<VersionId> {
        self.applied
            .keys()
            .filter(|version| !self.available.contains_key(version))
            .copied()
            .collect()
    }

    /// Registered versions not yet applied, regardless of position
    /// relative to the current version.
    pub fn outstanding(&self) -> Vec<VersionId> {
        self.available
            .keys()
            .filter(|version| !self.applied.contains_key(version))
            .copied()
            .collect()
    }

    pub fn has_version(&self, version: VersionId) -> bool {
        self.available.contains_key(&version)
    }

    pub fn is_applied(&self, version: VersionId) -> bool {
        self.applied.contains_key(&version)
    }

    pub fn script(&self, version: VersionId) -> Option<&Arc<dyn MigrationScript>> {
        self.available.get(&version)
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn details(&self) -> RegistryDetails {
        RegistryDetails {
            name: self.settings.name.clone(),
            database_driver: DATABASE_DRIVER,
            database: self.settings.database.clone(),
            collection: self.settings.collection.clone(),
            namespace: self.settings.namespace.clone(),
            directory: self.settings.directory.display().to_string(),
            current_version: self.current_version(),
            latest_version: self.latest_version(),
            num_applied: self.applied.len(),
            num_unavailable_applied: self.unavailable_applied().len(),
            num_available: self.available.len(),
            num_outstanding: self.outstanding().len(),
        }
    }

    /// Work out which scripts a run must execute and in which order.
    ///
    /// With no explicit target the latest available version is used,
    /// and a plan that comes out empty is an error because the caller
    /// asked for "everything outstanding" and there is none. With an
    /// explicit target an empty plan is a valid no-op.
    ///
    /// Up plans take unapplied versions in `(current, target]`
    /// ascending; down plans take applied versions in `(target,
    /// current]` descending. Applied versions without a script never
    /// enter a plan.
    pub fn resolve(&self, target: Option<VersionId>) -> Result<MigrationPlan, MigrationError> {
        let explicit = target.is_some();
        let to = target.unwrap_or_else(|| self.latest_version());
        if !to.is_zero() && !self.available.contains_key(&to) {
            return Err(MigrationError::UnknownVersion(to));
        }
        let from = self.current_version();

        let (direction, scripts) = if to > from {
            let scripts: Vec<Arc<dyn MigrationScript>> = self
                .available
                .range((Excluded(from), Included(to)))
                .filter(|(version, _)| !self.applied.contains_key(version))
                .map(|(_, script)| Arc::clone(script))
                .collect();
            (Some(Direction::Up), scripts)
        } else if to < from {
            let scripts: Vec<Arc<dyn MigrationScript>> = self
                .available
                .range((Excluded(to), Included(from)))
                .rev()
                .filter(|(version, _)| self.applied.contains_key(version))
                .map(|(_, script)| Arc::clone(script))
                .collect();
            (Some(Direction::Down), scripts)
        } else {
            (None, Vec::new())
        };

        if scripts.is_empty() {
            if explicit {
                return Ok(MigrationPlan {
                    direction: None,
                    from,
                    to,
                    scripts,
                });
            }
            return Err(MigrationError::NoMigrationsToExecute);
        }
        Ok(MigrationPlan {
            direction,
            from,
            to,
            scripts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use mongodb::Database;

    struct Stub {
        version: VersionId,
    }

    #[async_trait]
    impl MigrationScript for Stub {
        fn version(&self) -> VersionId {
            self.version
        }
        fn description(&self) -> &str {
            "stub migration"
        }
        async fn up(&self, _db: &Database) -> Result<()> {
            Ok(())
        }
        async fn down(&self, _db: &Database) -> Result<()> {
            Ok(())
        }
    }

    fn stub(version: i64) -> Arc<dyn MigrationScript> {
        Arc::new(Stub {
            version: VersionId::new(version),
        })
    }

    fn registry_with(available: &[i64], applied: &[i64]) -> Registry {
        let mut registry = Registry::new(RegistrySettings::default());
        for &version in available {
            registry.register(stub(version)).unwrap();
        }
        for &version in applied {
            registry.note_applied(VersionId::new(version), Utc::now());
        }
        registry
    }

    fn ids(raw: &[i64]) -> Vec<VersionId> {
        raw.iter().copied().map(VersionId::new).collect()
    }

    #[test]
    fn register_rejects_duplicate_versions() {
        let mut registry = Registry::new(RegistrySettings::default());
        registry.register(stub(10)).unwrap();
        let err = registry.register(stub(10)).unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateVersion(v) if v == VersionId::new(10)));
    }

    #[test]
    fn current_and_latest_track_both_sets() {
        let registry = registry_with(&[], &[]);
        assert_eq!(registry.current_version(), VersionId::ZERO);
        assert_eq!(registry.latest_version(), VersionId::ZERO);

        let registry = registry_with(&[10, 20, 30], &[10, 20]);
        assert_eq!(registry.current_version(), VersionId::new(20));
        assert_eq!(registry.latest_version(), VersionId::new(30));

        // applied versions beyond every available script still count
        let registry = registry_with(&[10], &[10, 90]);
        assert_eq!(registry.current_version(), VersionId::new(90));
        assert_eq!(registry.latest_version(), VersionId::new(10));
    }

    #[test]
    fn resolve_up_is_ascending_and_bounded() {
        let registry = registry_with(&[10, 20, 30], &[]);
        let plan = registry.resolve(Some(VersionId::new(30))).unwrap();
        assert_eq!(plan.direction, Some(Direction::Up));
        assert_eq!(plan.from, VersionId::ZERO);
        assert_eq!(plan.to, VersionId::new(30));
        assert_eq!(plan.versions(), ids(&[10, 20, 30]));

        let plan = registry.resolve(Some(VersionId::new(20))).unwrap();
        assert_eq!(plan.versions(), ids(&[10, 20]));
    }

    #[test]
    fn resolve_without_target_uses_latest() {
        let registry = registry_with(&[10, 20], &[10]);
        let plan = registry.resolve(None).unwrap();
        assert_eq!(plan.direction, Some(Direction::Up));
        assert_eq!(plan.to, VersionId::new(20));
        assert_eq!(plan.versions(), ids(&[20]));
    }

    #[test]
    fn resolve_down_is_descending_and_excludes_target() {
        let registry = registry_with(&[10, 20, 30], &[10, 20, 30]);
        let plan = registry.resolve(Some(VersionId::new(10))).unwrap();
        assert_eq!(plan.direction, Some(Direction::Down));
        assert_eq!(plan.from, VersionId::new(30));
        assert_eq!(plan.versions(), ids(&[30, 20]));
    }

    #[test]
    fn resolve_to_zero_unwinds_everything() {
        let registry = registry_with(&[10, 20, 30], &[10, 20, 30]);
        let plan = registry.resolve(Some(VersionId::ZERO)).unwrap();
        assert_eq!(plan.versions(), ids(&[30, 20, 10]));
    }

    #[test]
    fn resolve_rejects_unknown_target() {
        let registry = registry_with(&[10, 20], &[]);
        let err = registry.resolve(Some(VersionId::new(15))).unwrap_err();
        assert!(matches!(err, MigrationError::UnknownVersion(v) if v == VersionId::new(15)));
    }

    #[test]
    fn plans_debug_as_versions_not_scripts() {
        let registry = registry_with(&[10, 20], &[]);
        let plan = registry.resolve(None).unwrap();
        let rendered = format!("{plan:?}");
        assert!(rendered.contains("Up"));
        assert!(rendered.contains("VersionId(10)"));
        assert!(rendered.contains("VersionId(20)"));
    }

    #[test]
    fn resolve_explicit_target_at_current_is_a_noop() {
        let registry = registry_with(&[10, 20], &[10, 20]);
        let plan = registry.resolve(Some(VersionId::new(20))).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.direction, None);

        // fresh database, explicit zero target
        let registry = registry_with(&[10], &[]);
        let plan = registry.resolve(Some(VersionId::ZERO)).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn resolve_without_target_and_nothing_outstanding_errors() {
        let registry = registry_with(&[10, 20], &[10, 20]);
        assert!(matches!(
            registry.resolve(None),
            Err(MigrationError::NoMigrationsToExecute)
        ));

        let registry = registry_with(&[], &[]);
        assert!(matches!(
            registry.resolve(None),
            Err(MigrationError::NoMigrationsToExecute)
        ));

        // current sits beyond every available script; latest resolves
        // below current but the span holds nothing runnable
        let registry = registry_with(&[10], &[10, 90]);
        assert!(matches!(
            registry.resolve(None),
            Err(MigrationError::NoMigrationsToExecute)
        ));
    }

    #[test]
    fn resolve_down_skips_unavailable_applied_versions() {
        // 20 ran once but its script is gone; rolling back to 10 only
        // runs 30 and leaves 20 recorded.
        let registry = registry_with(&[10, 30], &[10, 20, 30]);
        let plan = registry.resolve(Some(VersionId::new(10))).unwrap();
        assert_eq!(plan.versions(), ids(&[30]));
        assert_eq!(registry.unavailable_applied(), ids(&[20]));
    }

    #[test]
    fn resolve_down_skips_versions_never_applied() {
        let registry = registry_with(&[10, 20, 30], &[10, 30]);
        let plan = registry.resolve(Some(VersionId::new(10))).unwrap();
        assert_eq!(plan.versions(), ids(&[30]));
    }

    #[test]
    fn resolve_up_starts_after_current_version() {
        // 10 was never applied but sits below the current version, so
        // it stays outside the plan window.
        let registry = registry_with(&[10, 20, 30], &[20]);
        let plan = registry.resolve(Some(VersionId::new(30))).unwrap();
        assert_eq!(plan.versions(), ids(&[30]));
    }

    #[test]
    fn outstanding_is_a_set_difference() {
        let registry = registry_with(&[10, 20, 30], &[20]);
        assert_eq!(registry.outstanding(), ids(&[10, 30]));
    }

    #[test]
    fn details_counts_reflect_both_sets() {
        let registry = registry_with(&[10, 20, 30], &[10, 40]);
        let details = registry.details();
        assert_eq!(details.database_driver, "MongoDB");
        assert_eq!(details.current_version, VersionId::new(40));
        assert_eq!(details.latest_version, VersionId::new(30));
        assert_eq!(details.num_applied, 2);
        assert_eq!(details.num_unavailable_applied, 1);
        assert_eq!(details.num_available, 3);
        assert_eq!(details.num_outstanding, 2);
    }

    #[test]
    fn details_serialize_for_json_status() {
        let registry = registry_with(&[10, 20, 30], &[10]);
        let value = serde_json::to_value(registry.details()).unwrap();
        assert_eq!(value["database_driver"], "MongoDB");
        assert_eq!(value["current_version"], 10);
        assert_eq!(value["latest_version"], 30);
        assert_eq!(value["num_outstanding"], 2);
    }

    #[tokio::test]
    async fn load_reads_the_applied_set_once() {
        use crate::storage::MemoryVersionStorage;

        let storage = MemoryVersionStorage::with_applied(ids(&[10, 40]));
        let registry = Registry::load(
            RegistrySettings::default(),
            vec![stub(10), stub(20)],
            &storage,
        )
        .await
        .unwrap();
        assert_eq!(registry.applied_versions(), ids(&[10, 40]));
        assert_eq!(registry.unavailable_applied(), ids(&[40]));
        assert!(registry.has_version(VersionId::new(20)));
        assert!(!registry.is_applied(VersionId::new(20)));
    }
}
