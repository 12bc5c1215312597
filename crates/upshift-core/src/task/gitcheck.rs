use tracing::debug;

use super::{Task, TaskError, TaskResult};
use crate::context::Context;
use crate::git::GitError;

/// Verify the repository is in a state a release can start from.
pub struct GitCheck;

impl Task for GitCheck {
    fn describe(&self) -> String {
        "check git repository".to_string()
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        ctx.repo.ensure_available()?;

        if !ctx.repo.is_inside_repo()? {
            return Err(GitError::NotARepo.into());
        }
        if !ctx.git.ignore_detached && ctx.repo.is_detached()? {
            return Err(TaskError::Precondition(
                "HEAD is detached (set git.ignore_detached to continue)".into(),
            ));
        }
        if !ctx.git.ignore_shallow && ctx.repo.is_shallow()? {
            return Err(TaskError::Precondition(
                "repository is a shallow clone (set git.ignore_shallow to continue)".into(),
            ));
        }

        debug!("repository ok");
        Ok(())
    }
}
