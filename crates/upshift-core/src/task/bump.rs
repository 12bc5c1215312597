use tracing::debug;

use super::{Task, TaskError, TaskResult};
use crate::bump::bump_file;
use crate::context::Context;

/// Rewrite the version in every configured file.
pub struct BumpFiles;

impl Task for BumpFiles {
    fn describe(&self) -> String {
        "bump files".to_string()
    }

    fn skip(&self, ctx: &Context) -> bool {
        ctx.no_version_changed || ctx.skip_bumps || ctx.config.bumps.is_empty()
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        let next = ctx
            .next_version
            .clone()
            .ok_or_else(|| TaskError::Precondition("next version not calculated".into()))?;

        for target in &ctx.config.bumps {
            if bump_file(&ctx.root, target, &next, ctx.dry_run)? {
                let file = target.file.to_string();
                if !ctx.modified_files.contains(&file) {
                    ctx.modified_files.push(file);
                }
            } else {
                debug!(file = %target.file, "already at target version");
            }
        }
        Ok(())
    }
}
