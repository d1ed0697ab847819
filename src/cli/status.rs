use anyhow::Result;
use colored::Colorize;

use crate::registry::Registry;
use crate::version::VersionId;

use super::print_header;

pub fn run(registry: &Registry, show_versions: bool, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&registry.details())?);
        return Ok(());
    }
    print_header(&registry.settings().name);
    for line in render(registry, show_versions) {
        println!("{line}");
    }
    Ok(())
}

fn render(registry: &Registry, show_versions: bool) -> Vec<String> {
    let details = registry.details();
    let mut lines = Vec::new();

    push_info(&mut lines, "Name", &details.name);
    push_info(&mut lines, "Database Driver", details.database_driver);
    push_info(&mut lines, "Database Name", &details.database);
    push_info(&mut lines, "Version Collection Name", &details.collection);
    push_info(&mut lines, "Migrations Namespace", &details.namespace);
    push_info(&mut lines, "Migrations Directory", &details.directory);
    push_info(
        &mut lines,
        "Current Version",
        &version_label(details.current_version),
    );
    push_info(
        &mut lines,
        "Latest Version",
        &version_label(details.latest_version),
    );
    push_info(
        &mut lines,
        "Executed Migrations",
        &details.num_applied.to_string(),
    );
    let unavailable = details.num_unavailable_applied.to_string();
    push_info(
        &mut lines,
        "Executed Unavailable Migrations",
        &if details.num_unavailable_applied > 0 {
            unavailable.red().to_string()
        } else {
            unavailable
        },
    );
    push_info(
        &mut lines,
        "Available Migrations",
        &details.num_available.to_string(),
    );
    let outstanding = details.num_outstanding.to_string();
    push_info(
        &mut lines,
        "New Migrations",
        &if details.num_outstanding > 0 {
            outstanding.yellow().to_string()
        } else {
            outstanding
        },
    );

    if show_versions {
        let available = registry.available_versions();
        if !available.is_empty() {
            lines.push(String::new());
            lines.push(format!(" {} Available Migration Versions", "==".green()));
            for version in available {
                let marker = if registry.is_applied(version) {
                    "migrated".green().to_string()
                } else {
                    "not migrated".red().to_string()
                };
                let description = registry
                    .script(version)
                    .map(|script| script.description().to_string())
                    .unwrap_or_default();
                lines.push(format!(
                    "    >> {} ({})  {}  {}",
                    version.format_timestamp(),
                    version,
                    marker,
                    description
                ));
            }
        }

        let unavailable = registry.unavailable_applied();
        if !unavailable.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                " {} Previously Executed Unavailable Migration Versions",
                "==".green()
            ));
            for version in unavailable {
                lines.push(format!(
                    "    >> {} ({})",
                    version.format_timestamp(),
                    version
                ));
            }
        }
    }
    lines
}

fn version_label(version: VersionId) -> String {
    if version.is_zero() {
        "0".to_string()
    } else {
        format!("{} ({})", version.format_timestamp(), version)
    }
}

fn push_info(lines: &mut Vec<String>, label: &str, value: &str) {
    // pad before colouring so ANSI codes do not skew the columns
    let padded = format!("{:<37}", format!("{label}:"));
    lines.push(format!("    {}{}", padded.green(), value));
}
