use tracing::info;

use super::{Task, TaskError, TaskResult};
use crate::context::{Context, DEFAULT_COMMIT_MESSAGE, ReleaseCommit};

/// Prepare the release commit message and author.
pub struct PrepareCommit;

impl Task for PrepareCommit {
    fn describe(&self) -> String {
        "prepare release commit".to_string()
    }

    fn skip(&self, ctx: &Context) -> bool {
        ctx.no_version_changed
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        let tag = ctx
            .next_tag()
            .ok_or_else(|| TaskError::Precondition("next version not calculated".into()))?;
        let template = ctx
            .config
            .commit_message
            .as_deref()
            .unwrap_or(DEFAULT_COMMIT_MESSAGE);

        ctx.commit = Some(ReleaseCommit {
            message: template.replace("{tag}", &tag),
            author: ctx.config.commit_author.clone(),
        });
        Ok(())
    }
}

/// Stage modified files, commit them and push.
pub struct CommitRelease;

impl Task for CommitRelease {
    fn describe(&self) -> String {
        "commit release".to_string()
    }

    fn skip(&self, ctx: &Context) -> bool {
        ctx.no_version_changed || ctx.modified_files.is_empty()
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        let commit = ctx
            .commit
            .clone()
            .ok_or_else(|| TaskError::Precondition("release commit not prepared".into()))?;

        if ctx.dry_run {
            info!(
                message = %commit.message,
                files = ?ctx.modified_files,
                "dry run: would commit"
            );
            return Ok(());
        }

        ctx.repo.stage(&ctx.modified_files)?;
        let hash = ctx.repo.commit(&commit.message, commit.author.as_ref())?;
        info!(%hash, "committed release");

        if !ctx.git.no_push {
            ctx.repo.push(None, &ctx.git.push_options)?;
            info!("pushed release commit");
        }
        ctx.commit_hash = Some(hash);
        Ok(())
    }
}
