use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::Path;

use crate::commands::create_test_channels::{self, CreateTestChannelsOptions};
use crate::commands::sweep::{self, SweepOptions};
use crate::commands::{CommandReport, status};
use crate::env_loader;
use crate::logging;
use crate::reaper::fixtures::{DEFAULT_COUNT, DEFAULT_PREFIX};

#[derive(Parser)]
#[command(name = "channel-reaper", version, about = "Archive inactive Slack channels")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect every channel and archive the disused ones.
    Sweep {
        /// Report decisions without archiving anything.
        #[arg(long, conflicts_with = "live")]
        dry_run: bool,
        /// Archive for real, overriding DRY_RUN.
        #[arg(long)]
        live: bool,
        /// Days without activity before a channel counts as disused.
        #[arg(long)]
        days: Option<u64>,
    },
    /// Create empty channels in a test workspace to try a sweep against.
    CreateTestChannels {
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,
        #[arg(long, default_value_t = DEFAULT_COUNT)]
        count: u32,
    },
    /// Show the effective settings.
    Status,
}

fn dry_run_flag(dry_run: bool, live: bool) -> Option<bool> {
    match (dry_run, live) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    let state = if report.ok { "ok" } else { "issues" };
    println!("{}: {state}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  ! {issue}");
    }
    Ok(())
}

pub fn run(env_file: Option<&Path>) -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    tracing::debug!(env_file = %env_loader::describe(env_file), "environment loaded");

    let report = match cli.command {
        Command::Sweep {
            dry_run,
            live,
            days,
        } => sweep::run(&SweepOptions {
            dry_run: dry_run_flag(dry_run, live),
            days_inactive: days,
        })?,
        Command::CreateTestChannels { prefix, count } => {
            create_test_channels::run(&CreateTestChannelsOptions { prefix, count })?
        }
        Command::Status => status::run(env_file)?,
    };

    render(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!(
            "{} finished with {} issue(s)",
            report.command,
            report.issues.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn dry_run_flags_resolve() {
        assert_eq!(dry_run_flag(true, false), Some(true));
        assert_eq!(dry_run_flag(false, true), Some(false));
        assert_eq!(dry_run_flag(false, false), None);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dry_run_and_live_conflict() {
        let parsed = Cli::try_parse_from(["channel-reaper", "sweep", "--dry-run", "--live"]);
        assert!(parsed.is_err());
    }
}
