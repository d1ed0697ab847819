use anyhow::{bail, Result};
use colored::Colorize;

use crate::orchestrator::Orchestrator;
use crate::version::VersionId;

use super::{confirm, print_header};

/// Interactive gate in front of [`Orchestrator::migrate`]. Both
/// prompts default to no; `--no-interaction` skips them.
pub async fn run(
    orchestrator: &mut Orchestrator,
    target: Option<VersionId>,
    no_interaction: bool,
) -> Result<()> {
    print_header(&orchestrator.registry().settings().name);

    if !no_interaction {
        let unavailable = orchestrator.registry().unavailable_applied();
        if !unavailable.is_empty() {
            let question = format!(
                "You have {} previously executed migrations in the database that are not registered migrations. Are you sure you wish to continue?",
                unavailable.len()
            );
            if !confirm(&question.yellow().to_string())? {
                bail!("migration cancelled");
            }
        }
        let question =
            "WARNING! You are about to execute a database migration that could result in schema changes and data loss. Are you sure you wish to continue?";
        if !confirm(&question.yellow().to_string())? {
            bail!("migration cancelled");
        }
    }

    orchestrator.migrate(target).await?;
    Ok(())
}
