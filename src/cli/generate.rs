use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;

use crate::registry::RegistrySettings;

/// Write a timestamped migration stub into the scripts directory.
/// Registration stays manual: the stub must be declared as a module
/// and added to `scripts::all()`.
pub fn run(settings: &RegistrySettings, name: &str) -> Result<()> {
    let version = Utc::now().format("%Y%m%d%H%M%S").to_string();
    let path = write_stub(&settings.directory, &version, name)?;
    println!("Created {}", path.display());
    println!("Declare the module in src/scripts/mod.rs and add it to all() to register it.");
    Ok(())
}

fn write_stub(directory: &Path, version: &str, name: &str) -> Result<PathBuf> {
    validate_name(name)?;
    fs::create_dir_all(directory)
        .with_context(|| format!("could not create {}", directory.display()))?;
    let path = directory.join(format!("m{version}_{name}.rs"));
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    fs::write(&path, render_stub(version, name))
        .with_context(|| format!("could not write {}", path.display()))?;
    Ok(path)
}

fn validate_name(name: &str) -> Result<()> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        bail!("migration names are snake_case identifiers, got '{name}'");
    }
    Ok(())
}

fn struct_name(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn render_stub(version: &str, name: &str) -> String {
    let type_name = struct_name(name);
    let description = name.replace('_', " ");
    format!(
        r#"use anyhow::Result;
use async_trait::async_trait;
use mongodb::Database;

use crate::script::MigrationScript;
use crate::version::VersionId;

pub struct {type_name};

#[async_trait]
impl MigrationScript for {type_name} {{
    fn version(&self) -> VersionId {{
        VersionId::new({version})
    }}

    fn description(&self) -> &str {{
        "{description}"
    }}

    async fn up(&self, db: &Database) -> Result<()> {{
        // this migration is auto-generated; implement the change
        let _ = db;
        Ok(())
    }}

    async fn down(&self, db: &Database) -> Result<()> {{
        // this migration is auto-generated; implement the rollback
        let _ = db;
        Ok(())
    }}
}}
"#
    )
}
