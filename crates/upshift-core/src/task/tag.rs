use tracing::info;

use super::{Task, TaskError, TaskResult};
use crate::context::Context;

/// Tag HEAD with the next version and push the tag.
pub struct CreateTag;

impl Task for CreateTag {
    fn describe(&self) -> String {
        "create tag".to_string()
    }

    fn skip(&self, ctx: &Context) -> bool {
        ctx.no_version_changed
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        let tag = ctx
            .next_tag()
            .ok_or_else(|| TaskError::Precondition("next version not calculated".into()))?;

        if ctx.dry_run {
            info!(%tag, annotated = ctx.git.annotated, "dry run: would create tag");
        } else {
            ctx.repo.tag(&tag, ctx.git.annotated)?;
            info!(%tag, "created tag");
            if !ctx.git.no_push {
                ctx.repo.push(Some(&tag), &ctx.git.push_options)?;
                info!(%tag, "pushed tag");
            }
        }

        ctx.tag_created = Some(tag);
        Ok(())
    }
}
