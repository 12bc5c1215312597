//! Tag command: tag HEAD with the next version, or just print it.

use clap::Args;
use tracing::{debug, instrument};

use upshift_core::config::Config;
use upshift_core::workflow::Operation;

use super::VersionArgs;

/// Arguments for the `tag` subcommand.
#[derive(Args, Debug, Default)]
pub struct TagArgs {
    /// Version calculation flags.
    #[command(flatten)]
    pub version: VersionArgs,

    /// Print the next tag and exit without tagging
    #[arg(long)]
    pub next: bool,

    /// Create the tag locally without pushing it
    #[arg(long)]
    pub no_push: bool,
}

/// Execute the tag command.
#[instrument(name = "cmd_tag", skip_all, fields(json_output))]
pub fn cmd_tag(
    args: TagArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, next = args.next, "executing tag command");

    let operation = if args.next {
        Operation::Next
    } else {
        Operation::Tag
    };
    let mut options = args.version.into_options();
    options.no_push = args.no_push;

    let (ctx, report) = super::run_operation(operation, options, config, cwd, global_json)?;

    if args.next && !global_json {
        let tag = ctx.next_tag().unwrap_or_else(|| ctx.current_version.raw());
        println!("{tag}");
        return Ok(());
    }
    super::print_summary(operation, &ctx, report, global_json)
}
