use tracing::info;

use super::{Task, TaskResult};
use crate::context::Context;

/// Fetch tags from every remote so the latest release is visible.
pub struct FetchTags;

impl Task for FetchTags {
    fn describe(&self) -> String {
        "fetch tags".to_string()
    }

    fn skip(&self, ctx: &Context) -> bool {
        !ctx.git.fetch_tags || ctx.dry_run
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        ctx.repo.fetch_tags()?;
        info!("fetched tags");
        Ok(())
    }
}
