//! Fixed task sequences per operation.

use std::fmt;

use serde::Serialize;
use tracing::instrument;

use crate::context::Context;
use crate::task::{
    BumpFiles, CommitRelease, CreateTag, ExecutionReport, FetchTags, GitCheck, GitIdentity, Hook,
    HookStage, NextVersion, Pipeline, PipelineError, PrepareCommit, TaskEvent, UpdateChangelog,
    execute,
};

/// A workflow the CLI can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Rewrite versions in configured files.
    Bump,
    /// Prepend a changelog section.
    Changelog,
    /// Tag HEAD with the next version.
    Tag,
    /// Calculate the next version only.
    Next,
    /// Bump, changelog, commit and tag.
    Release,
}

impl Operation {
    /// The ordered task list for this operation.
    pub fn pipeline(self) -> Pipeline {
        match self {
            Self::Bump => vec![
                Box::new(GitCheck),
                Box::new(Hook(HookStage::Before)),
                Box::new(FetchTags),
                Box::new(NextVersion),
                Box::new(Hook(HookStage::BeforeBump)),
                Box::new(BumpFiles),
                Box::new(Hook(HookStage::AfterBump)),
                Box::new(Hook(HookStage::After)),
            ],
            Self::Changelog => vec![
                Box::new(GitCheck),
                Box::new(Hook(HookStage::Before)),
                Box::new(FetchTags),
                Box::new(NextVersion),
                Box::new(Hook(HookStage::BeforeChangelog)),
                Box::new(UpdateChangelog),
                Box::new(Hook(HookStage::AfterChangelog)),
                Box::new(Hook(HookStage::After)),
            ],
            Self::Tag => vec![
                Box::new(GitCheck),
                Box::new(Hook(HookStage::Before)),
                Box::new(FetchTags),
                Box::new(NextVersion),
                Box::new(Hook(HookStage::BeforeTag)),
                Box::new(CreateTag),
                Box::new(Hook(HookStage::AfterTag)),
                Box::new(Hook(HookStage::After)),
            ],
            Self::Next => vec![Box::new(GitCheck), Box::new(FetchTags), Box::new(NextVersion)],
            Self::Release => vec![
                Box::new(GitCheck),
                Box::new(Hook(HookStage::Before)),
                Box::new(GitIdentity),
                Box::new(FetchTags),
                Box::new(NextVersion),
                Box::new(PrepareCommit),
                Box::new(Hook(HookStage::BeforeBump)),
                Box::new(BumpFiles),
                Box::new(Hook(HookStage::AfterBump)),
                Box::new(Hook(HookStage::BeforeChangelog)),
                Box::new(UpdateChangelog),
                Box::new(Hook(HookStage::AfterChangelog)),
                Box::new(CommitRelease),
                Box::new(Hook(HookStage::BeforeTag)),
                Box::new(CreateTag),
                Box::new(Hook(HookStage::AfterTag)),
                Box::new(Hook(HookStage::After)),
            ],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bump => write!(f, "bump"),
            Self::Changelog => write!(f, "changelog"),
            Self::Tag => write!(f, "tag"),
            Self::Next => write!(f, "next"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// Run an operation's pipeline against `ctx`.
#[instrument(skip(ctx, on_event))]
pub fn run(
    operation: Operation,
    ctx: &mut Context,
    on_event: &mut impl FnMut(TaskEvent),
) -> Result<ExecutionReport, PipelineError> {
    execute(&operation.pipeline(), ctx, on_event)
}
