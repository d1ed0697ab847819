//! Command-line surface: argument definitions plus one module per
//! subcommand.
pub mod generate;
pub mod migrate;
pub mod status;
pub mod version;

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::version::VersionId;

#[derive(Parser)]
#[command(name = "mongo-migrate", version, about = "MongoDB schema migration runner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute migrations up or down to a target version
    Migrate {
        /// Target version id; defaults to the latest available
        version: Option<VersionId>,
        /// Answer yes to all confirmation prompts
        #[arg(short = 'n', long)]
        no_interaction: bool,
    },
    /// Show configuration and the state of every known version
    Status {
        /// List individual versions, not just totals
        #[arg(long)]
        show_versions: bool,
        /// Emit the details snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a single version as applied or unapplied without running it
    Version {
        /// Version id to mark
        version: VersionId,
        /// Record the version as applied
        #[arg(long, conflicts_with = "delete")]
        add: bool,
        /// Remove the version from the applied set
        #[arg(long)]
        delete: bool,
    },
    /// Write a migration script stub into the scripts directory
    Generate {
        /// Snake_case name, e.g. add_account_indexes
        name: String,
    },
}

/// Banner printed before interactive commands.
pub(crate) fn print_header(name: &str) {
    let padded = format!("                    {name}                    ");
    println!("{}", " ".repeat(padded.len()).on_cyan());
    println!("{}", padded.black().on_cyan());
    println!("{}", " ".repeat(padded.len()).on_cyan());
    println!();
}

/// Ask a yes/no question and read one line from stdin. An empty
/// answer means no.
pub(crate) fn confirm(question: &str) -> io::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_answers_parse_conservatively() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer("YES\n"));
        assert!(parse_answer("  yes  "));
        assert!(!parse_answer("\n"));
        assert!(!parse_answer("n\n"));
        assert!(!parse_answer("yep\n"));
    }
}
