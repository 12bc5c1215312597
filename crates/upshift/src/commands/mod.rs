//! Command implementations
//!
//! Every subcommand follows the same shape: turn its flags into
//! [`RunOptions`], build a [`Context`] with the real git and shell
//! collaborators, run the operation's pipeline and report.

pub mod bump;

pub mod changelog;

pub mod release;

pub mod tag;

use anyhow::Context as _;
use camino::Utf8Path;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::debug;

use upshift_core::config::Config;
use upshift_core::context::{Context, ContextInit, RunOptions, RunOutcome};
use upshift_core::git::GitCli;
use upshift_core::hooks::ShellExecutor;
use upshift_core::task::{ExecutionReport, StepStatus, TaskEvent};
use upshift_core::version::PrereleaseMode;
use upshift_core::workflow::{self, Operation};

/// Version flags shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Prerelease identifier, optionally with build metadata (e.g. "rc.1+build.7")
    #[arg(long, value_name = "PRERELEASE")]
    pub prerelease: Option<String>,

    /// How prerelease versions are produced
    #[arg(long, value_enum, default_value_t)]
    pub prerelease_mode: PrereleaseMode,

    /// Extra commit type that triggers a patch (repeatable)
    #[arg(long, value_name = "TYPE")]
    pub patch_type: Vec<String>,

    /// Tag without the leading "v"
    #[arg(long)]
    pub no_prefix: bool,

    /// Calculate from the release version, ignoring an existing prerelease
    #[arg(long)]
    pub ignore_existing_prerelease: bool,

    /// Only consider tags carrying the same prerelease identifier
    #[arg(long)]
    pub filter_on_prerelease: bool,

    /// Use VERSION as the current version instead of the latest tag
    #[arg(long, value_name = "VERSION")]
    pub current_version: Option<String>,

    /// Fetch tags from all remotes before calculating
    #[arg(long)]
    pub fetch_all: bool,

    /// Run without making changes (show what would happen)
    #[arg(long)]
    pub dry_run: bool,

    /// Print hook output
    #[arg(long)]
    pub debug: bool,
}

impl VersionArgs {
    /// Seed run options from the shared flags.
    pub fn into_options(self) -> RunOptions {
        RunOptions {
            prerelease: self.prerelease,
            mode: self.prerelease_mode,
            patch_types: self.patch_type,
            strip_prefix: self.no_prefix,
            ignore_existing_prerelease: self.ignore_existing_prerelease,
            filter_on_prerelease: self.filter_on_prerelease,
            fetch_tags: self.fetch_all,
            current_version: self.current_version,
            dry_run: self.dry_run,
            debug: self.debug,
            ..RunOptions::default()
        }
    }
}

/// JSON document printed with `--json`.
#[derive(Debug, Serialize)]
pub struct CommandOutput {
    /// The operation that ran.
    pub operation: Operation,
    /// What was decided and done.
    pub outcome: RunOutcome,
    /// Per-task status.
    pub report: ExecutionReport,
}

/// Build a context for `cwd` and run `operation` against it.
///
/// Progress goes to stderr unless `json` is set.
pub fn run_operation(
    operation: Operation,
    options: RunOptions,
    config: &Config,
    cwd: &Utf8Path,
    json: bool,
) -> anyhow::Result<(Context, ExecutionReport)> {
    let mut ctx = Context::new(ContextInit {
        root: cwd.to_path_buf(),
        config: config.clone(),
        repo: Box::new(GitCli::new(cwd)),
        hooks: Box::new(ShellExecutor::new(cwd)),
        options,
    })
    .context("invalid options")?;

    debug!(%operation, dry_run = ctx.dry_run, "running operation");
    if ctx.dry_run && !json {
        eprintln!("{}", "DRY RUN: no changes will be made".yellow().bold());
    }

    let report = workflow::run(operation, &mut ctx, &mut |event| {
        if !json {
            print_event(&event);
        }
    })
    .with_context(|| format!("{operation} failed"))?;

    Ok((ctx, report))
}

/// Print the final summary for a finished run.
pub fn print_summary(
    operation: Operation,
    ctx: &Context,
    report: ExecutionReport,
    json: bool,
) -> anyhow::Result<()> {
    let outcome = ctx.outcome();
    if json {
        let output = CommandOutput {
            operation,
            outcome,
            report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if outcome.no_version_changed {
        println!(
            "{} No releasable changes since {}",
            "–".yellow(),
            outcome
                .current_tag
                .as_deref()
                .unwrap_or("the first commit")
                .bold(),
        );
        return Ok(());
    }

    let next = outcome
        .next_version
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    println!(
        "{} {}: {} → {} ({} tasks, {} skipped)",
        "✓".green().bold(),
        operation.to_string().bold(),
        outcome.current_version.to_string().dimmed(),
        next.green().bold(),
        report.completed(),
        report.skipped(),
    );
    for file in &outcome.modified_files {
        println!("    {} {}", "modified".dimmed(), file);
    }
    if let Some(tag) = &outcome.tag {
        println!("    {} {}", "tag".dimmed(), tag.cyan());
    }
    Ok(())
}

fn print_event(event: &TaskEvent) {
    match event {
        TaskEvent::Started(task) => debug!(%task, "task started"),
        TaskEvent::Finished(record) => match record.status {
            StepStatus::Completed => {
                eprintln!("  {} {}", "✓".green(), record.task.bold());
            }
            StepStatus::Skipped => {
                eprintln!(
                    "  {} {} {}",
                    "–".yellow(),
                    record.task.bold(),
                    "skipped".dimmed()
                );
            }
        },
    }
}
