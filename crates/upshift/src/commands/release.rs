//! Release command: bump, changelog, commit and tag in one pass.

use clap::Args;
use tracing::{debug, instrument};

use upshift_core::config::Config;
use upshift_core::workflow::Operation;

use super::VersionArgs;

/// Arguments for the `release` subcommand.
#[derive(Args, Debug, Default)]
pub struct ReleaseArgs {
    /// Version calculation flags.
    #[command(flatten)]
    pub version: VersionArgs,

    /// Commit and tag locally without pushing
    #[arg(long)]
    pub no_push: bool,

    /// Leave the changelog untouched
    #[arg(long)]
    pub skip_changelog: bool,

    /// Leave configured version files untouched
    #[arg(long)]
    pub skip_bumps: bool,
}

/// Execute the release command.
#[instrument(name = "cmd_release", skip_all, fields(json_output))]
pub fn cmd_release(
    args: ReleaseArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing release command");

    let mut options = args.version.into_options();
    options.no_push = args.no_push;
    options.skip_changelog = args.skip_changelog;
    options.skip_bumps = args.skip_bumps;

    let (ctx, report) = super::run_operation(Operation::Release, options, config, cwd, global_json)?;
    super::print_summary(Operation::Release, &ctx, report, global_json)
}
