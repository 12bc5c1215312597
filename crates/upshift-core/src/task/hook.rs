use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::{Task, TaskResult};
use crate::config::HooksConfig;
use crate::context::Context;

/// Workflow stages that carry hook commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
    /// Before anything else.
    Before,
    /// Before bumping files.
    BeforeBump,
    /// After bumping files.
    AfterBump,
    /// Before writing the changelog.
    BeforeChangelog,
    /// After writing the changelog.
    AfterChangelog,
    /// Before creating the tag.
    BeforeTag,
    /// After creating the tag.
    AfterTag,
    /// Once the workflow is complete.
    After,
}

impl HookStage {
    /// The configured commands for this stage.
    pub fn commands(self, hooks: &HooksConfig) -> &[String] {
        match self {
            Self::Before => &hooks.before,
            Self::BeforeBump => &hooks.before_bump,
            Self::AfterBump => &hooks.after_bump,
            Self::BeforeChangelog => &hooks.before_changelog,
            Self::AfterChangelog => &hooks.after_changelog,
            Self::BeforeTag => &hooks.before_tag,
            Self::AfterTag => &hooks.after_tag,
            Self::After => &hooks.after,
        }
    }

    /// Whether a stage-specific condition rules the stage out.
    fn gated(self, ctx: &Context) -> bool {
        match self {
            Self::Before => false,
            Self::BeforeBump | Self::AfterBump => ctx.no_version_changed || ctx.skip_bumps,
            Self::BeforeChangelog | Self::AfterChangelog => {
                ctx.no_version_changed || ctx.changelog.skip
            }
            Self::BeforeTag | Self::AfterTag | Self::After => ctx.no_version_changed,
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "before",
            Self::BeforeBump => "before_bump",
            Self::AfterBump => "after_bump",
            Self::BeforeChangelog => "before_changelog",
            Self::AfterChangelog => "after_changelog",
            Self::BeforeTag => "before_tag",
            Self::AfterTag => "after_tag",
            Self::After => "after",
        };
        f.write_str(name)
    }
}

/// Run the hook commands configured for one stage.
pub struct Hook(pub HookStage);

impl Task for Hook {
    fn describe(&self) -> String {
        format!("run {} hooks", self.0)
    }

    fn skip(&self, ctx: &Context) -> bool {
        self.0.commands(&ctx.config.hooks).is_empty() || self.0.gated(ctx)
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        let commands = self.0.commands(&ctx.config.hooks);
        let outputs = ctx.hooks.execute(commands, &ctx.hook_options())?;
        debug!(stage = %self.0, ran = outputs.len(), "hooks finished");
        Ok(())
    }
}
