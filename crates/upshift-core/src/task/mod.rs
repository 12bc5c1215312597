//! Tasks and the pipeline executor.
//!
//! A [`Task`] is a stateless step with three capabilities: a label, a skip
//! predicate and a body. A [`Pipeline`] is an ordered list of tasks that
//! [`execute`] runs against one [`Context`], stopping at the first error.
//! Nothing is rolled back: side effects of completed tasks stay applied.

mod bump;
mod changelog;
mod commit;
mod fetch;
mod gitcheck;
mod hook;
mod identity;
mod tag;
mod version;

pub use bump::BumpFiles;
pub use changelog::UpdateChangelog;
pub use commit::{CommitRelease, PrepareCommit};
pub use fetch::FetchTags;
pub use gitcheck::GitCheck;
pub use hook::{Hook, HookStage};
pub use identity::GitIdentity;
pub use tag::CreateTag;
pub use version::NextVersion;

use camino::Utf8PathBuf;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::context::Context;

/// Errors a task can fail with.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Git error.
    #[error(transparent)]
    Git(#[from] crate::git::GitError),

    /// Hook error.
    #[error(transparent)]
    Hook(#[from] crate::hooks::HookError),

    /// Version error.
    #[error(transparent)]
    Version(#[from] crate::version::VersionError),

    /// File bump error.
    #[error(transparent)]
    Bump(#[from] crate::bump::BumpError),

    /// Reading or writing a file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The file involved.
        path: Utf8PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The repository or context is not in a state the task can act on.
    #[error("{0}")]
    Precondition(String),
}

/// Result alias for task bodies.
pub type TaskResult<T> = Result<T, TaskError>;

/// A pipeline failure, prefixed with the task that failed.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A task returned an error.
    #[error("{task} failed")]
    Task {
        /// The failing task's label.
        task: String,
        /// What went wrong.
        source: TaskError,
    },
}

/// One step of a workflow.
pub trait Task {
    /// Short label used in logs, reports and errors.
    fn describe(&self) -> String;

    /// Whether the task should be passed over for this run.
    fn skip(&self, _ctx: &Context) -> bool {
        false
    }

    /// Do the work.
    fn run(&self, ctx: &mut Context) -> TaskResult<()>;
}

/// An ordered list of tasks.
pub type Pipeline = Vec<Box<dyn Task>>;

/// What happened to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The task ran to completion.
    Completed,
    /// The skip predicate held.
    Skipped,
}

/// One entry in an [`ExecutionReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// The task label.
    pub task: String,
    /// What happened.
    pub status: StepStatus,
}

/// Per-task record of a successful pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// Tasks in execution order.
    pub steps: Vec<StepRecord>,
}

impl ExecutionReport {
    /// Number of tasks that ran.
    pub fn completed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    /// Number of tasks that were skipped.
    pub fn skipped(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Skipped)
            .count()
    }
}

/// Progress events emitted while a pipeline runs.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A task is about to run.
    Started(String),
    /// A task finished or was skipped.
    Finished(StepRecord),
}

/// Run `pipeline` in order against `ctx`.
///
/// Each task's skip predicate is evaluated first; a skipped task is logged
/// and recorded but never blocks the tasks after it. The first error stops
/// the run.
#[instrument(skip_all, fields(tasks = pipeline.len(), dry_run = ctx.dry_run))]
pub fn execute(
    pipeline: &[Box<dyn Task>],
    ctx: &mut Context,
    on_event: &mut impl FnMut(TaskEvent),
) -> Result<ExecutionReport, PipelineError> {
    let mut report = ExecutionReport::default();

    for task in pipeline {
        let label = task.describe();

        let status = if task.skip(ctx) {
            info!(task = %label, "skipping");
            StepStatus::Skipped
        } else {
            debug!(task = %label, "running");
            on_event(TaskEvent::Started(label.clone()));
            task.run(ctx).map_err(|source| PipelineError::Task {
                task: label.clone(),
                source,
            })?;
            StepStatus::Completed
        };

        let record = StepRecord {
            task: label,
            status,
        };
        on_event(TaskEvent::Finished(record.clone()));
        report.steps.push(record);
    }

    info!(
        completed = report.completed(),
        skipped = report.skipped(),
        "pipeline finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_record_serializes() {
        let record = StepRecord {
            task: "bump files".into(),
            status: StepStatus::Skipped,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"task":"bump files","status":"skipped"}"#);
    }

    #[test]
    fn report_counts() {
        let report = ExecutionReport {
            steps: vec![
                StepRecord {
                    task: "a".into(),
                    status: StepStatus::Completed,
                },
                StepRecord {
                    task: "b".into(),
                    status: StepStatus::Skipped,
                },
                StepRecord {
                    task: "c".into(),
                    status: StepStatus::Completed,
                },
            ],
        };
        assert_eq!(report.completed(), 2);
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn pipeline_error_names_task() {
        let err = PipelineError::Task {
            task: "create tag".into(),
            source: TaskError::Precondition("no next version".into()),
        };
        assert_eq!(err.to_string(), "create tag failed");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("no next version"));
    }
}
