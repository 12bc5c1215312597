use tracing::info;

use super::{Task, TaskResult};
use crate::context::Context;

/// Record the configured committer identity in the repository.
pub struct GitIdentity;

impl Task for GitIdentity {
    fn describe(&self) -> String {
        "configure git identity".to_string()
    }

    fn skip(&self, ctx: &Context) -> bool {
        ctx.dry_run || ctx.config.commit_author.is_none()
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        if let Some(author) = &ctx.config.commit_author {
            ctx.repo.set_identity(author)?;
            info!(name = %author.name, email = %author.email, "configured git identity");
        }
        Ok(())
    }
}
