use std::env;
use std::path::PathBuf;

use crate::registry::RegistrySettings;

/// Runtime configuration, read from the environment with defaults.
/// `dotenvy` loads a `.env` file before this runs, so local overrides
/// live there.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongodb_uri: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub max_idle_time_ms: u64,
    pub connect_timeout_ms: u64,
    pub name: String,
    pub database: String,
    pub collection: String,
    pub namespace: String,
    pub directory: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        AppConfig {
            mongodb_uri: lookup("MONGODB_URI")
                .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            max_pool_size: lookup("MONGODB_MAX_POOL_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            min_pool_size: lookup("MONGODB_MIN_POOL_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            max_idle_time_ms: lookup("MONGODB_MAX_IDLE_TIME_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(300000),
            connect_timeout_ms: lookup("MONGODB_CONNECT_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10000),
            name: lookup("MIGRATIONS_NAME")
                .unwrap_or_else(|| "Application Migrations".to_string()),
            database: lookup("MIGRATIONS_DATABASE").unwrap_or_else(|| "app".to_string()),
            collection: lookup("MIGRATIONS_COLLECTION")
                .unwrap_or_else(|| "migration_versions".to_string()),
            namespace: lookup("MIGRATIONS_NAMESPACE")
                .unwrap_or_else(|| "mongo_migrate::scripts".to_string()),
            directory: lookup("MIGRATIONS_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("src/scripts")),
        }
    }

    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            name: self.name.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
            namespace: self.namespace.clone(),
            directory: self.directory.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
        assert_eq!(config.max_pool_size, 20);
        assert_eq!(config.min_pool_size, 0);
        assert_eq!(config.database, "app");
        assert_eq!(config.collection, "migration_versions");
        assert_eq!(config.directory, PathBuf::from("src/scripts"));
    }

    #[test]
    fn overrides_win_and_bad_numbers_fall_back() {
        let config = AppConfig::from_lookup(|key| match key {
            "MONGODB_URI" => Some("mongodb://db:27017".to_string()),
            "MONGODB_MAX_POOL_SIZE" => Some("not-a-number".to_string()),
            "MIGRATIONS_DATABASE" => Some("ledger".to_string()),
            _ => None,
        });
        assert_eq!(config.mongodb_uri, "mongodb://db:27017");
        assert_eq!(config.max_pool_size, 20);
        assert_eq!(config.database, "ledger");
    }

    #[test]
    fn settings_carry_the_storage_coordinates() {
        let config = AppConfig::from_lookup(|key| match key {
            "MIGRATIONS_NAME" => Some("Ledger Migrations".to_string()),
            "MIGRATIONS_COLLECTION" => Some("schema_versions".to_string()),
            _ => None,
        });
        let settings = config.registry_settings();
        assert_eq!(settings.name, "Ledger Migrations");
        assert_eq!(settings.collection, "schema_versions");
        assert_eq!(settings.database, "app");
    }
}
