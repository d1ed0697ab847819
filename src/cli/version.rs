use anyhow::{bail, Result};
use colored::Colorize;

use crate::orchestrator::Orchestrator;
use crate::version::VersionId;

/// Manually flip one version's applied flag. The script itself never
/// runs; this exists to reconcile drift.
pub async fn run(
    orchestrator: &mut Orchestrator,
    version: VersionId,
    add: bool,
    delete: bool,
) -> Result<()> {
    // clap rejects --add together with --delete; neither lands here
    if add == delete {
        bail!("pass exactly one of --add or --delete");
    }
    if add {
        orchestrator.mark_applied(version).await?;
        println!(
            "{}",
            format!("Version {version} marked as applied.").green()
        );
    } else {
        orchestrator.mark_unapplied(version).await?;
        println!(
            "{}",
            format!("Version {version} marked as unapplied.").green()
        );
    }
    Ok(())
}
