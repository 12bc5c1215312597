//! Bump command: rewrite the version in configured files.

use clap::Args;
use tracing::{debug, instrument};

use upshift_core::config::Config;
use upshift_core::workflow::Operation;

use super::VersionArgs;

/// Arguments for the `bump` subcommand.
#[derive(Args, Debug, Default)]
pub struct BumpArgs {
    /// Version calculation flags.
    #[command(flatten)]
    pub version: VersionArgs,
}

/// Execute the bump command.
#[instrument(name = "cmd_bump", skip_all, fields(json_output))]
pub fn cmd_bump(
    args: BumpArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing bump command");

    if config.bumps.is_empty() {
        tracing::warn!("no [[bumps]] entries configured; nothing to rewrite");
    }

    let options = args.version.into_options();
    let (ctx, report) = super::run_operation(Operation::Bump, options, config, cwd, global_json)?;
    super::print_summary(Operation::Bump, &ctx, report, global_json)
}
