//! Changelog command: prepend a section for the next version.

use clap::Args;
use tracing::{debug, instrument};

use upshift_core::config::Config;
use upshift_core::workflow::Operation;

use super::VersionArgs;

/// Arguments for the `changelog` subcommand.
#[derive(Args, Debug, Default)]
pub struct ChangelogArgs {
    /// Version calculation flags.
    #[command(flatten)]
    pub version: VersionArgs,

    /// Print the new section to stdout instead of writing the file
    #[arg(long)]
    pub diff_only: bool,

    /// Entry order: "asc" (oldest first) or "desc"
    #[arg(long, value_name = "ORDER")]
    pub sort: Option<String>,

    /// Drop commits whose header matches REGEX (repeatable)
    #[arg(long, value_name = "REGEX")]
    pub exclude: Vec<String>,

    /// Keep only commits whose header matches REGEX (repeatable)
    #[arg(long, value_name = "REGEX")]
    pub include: Vec<String>,
}

/// Execute the changelog command.
#[instrument(name = "cmd_changelog", skip_all, fields(json_output))]
pub fn cmd_changelog(
    args: ChangelogArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(
        json_output = global_json,
        diff_only = args.diff_only,
        "executing changelog command"
    );

    let mut options = args.version.into_options();
    options.changelog_diff_only = args.diff_only;
    options.changelog_sort = args.sort;
    options.changelog_include = args.include;
    options.changelog_exclude = args.exclude;

    let (ctx, report) =
        super::run_operation(Operation::Changelog, options, config, cwd, global_json)?;

    if args.diff_only && !global_json {
        if let Some(section) = &ctx.changelog_section {
            print!("{section}");
        }
        return Ok(());
    }
    super::print_summary(Operation::Changelog, &ctx, report, global_json)
}
