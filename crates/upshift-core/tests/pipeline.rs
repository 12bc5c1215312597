//! Workflow integration tests against in-memory collaborators.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use upshift_core::config::{BumpFile, CommitAuthor, Config};
use upshift_core::context::{Context, ContextInit, RunOptions};
use upshift_core::git::{CommitRecord, GitResult, Repository, TagSort};
use upshift_core::hooks::{HookExecutor, HookOptions, HookOutput, HookResult};
use upshift_core::task::{
    ExecutionReport, PipelineError, StepStatus, Task, TaskError, TaskResult, execute,
};
use upshift_core::workflow::{self, Operation};
use upshift_core::{PrereleaseMode, Version};

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct FakeRepo {
    tags: Vec<String>,
    commits: Vec<String>,
    detached: bool,
    calls: Rc<RefCell<Vec<String>>>,
}

impl FakeRepo {
    fn new(tags: &[&str], commits: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(ToString::to_string).collect(),
            commits: commits.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Repository for FakeRepo {
    fn is_inside_repo(&self) -> GitResult<bool> {
        Ok(true)
    }

    fn is_detached(&self) -> GitResult<bool> {
        Ok(self.detached)
    }

    fn is_shallow(&self) -> GitResult<bool> {
        Ok(false)
    }

    fn tags(&self, _pattern: &str, _sort: TagSort) -> GitResult<Vec<String>> {
        Ok(self.tags.clone())
    }

    fn commits(&self, from: Option<&str>, to: &str) -> GitResult<Vec<CommitRecord>> {
        self.record(format!("log {}..{to}", from.unwrap_or("")));
        Ok(self
            .commits
            .iter()
            .enumerate()
            .map(|(i, message)| CommitRecord {
                hash: format!("c{i}"),
                author: "dev".into(),
                message: message.clone(),
            })
            .collect())
    }

    fn fetch_tags(&self) -> GitResult<()> {
        self.record("fetch".into());
        Ok(())
    }

    fn stage(&self, paths: &[String]) -> GitResult<()> {
        self.record(format!("add {}", paths.join(" ")));
        Ok(())
    }

    fn commit(&self, message: &str, _author: Option<&CommitAuthor>) -> GitResult<String> {
        self.record(format!("commit {message}"));
        Ok("abc1234".into())
    }

    fn tag(&self, name: &str, annotated: bool) -> GitResult<()> {
        self.record(format!("tag {name} annotated={annotated}"));
        Ok(())
    }

    fn push(&self, refspec: Option<&str>, _options: &[String]) -> GitResult<()> {
        self.record(format!("push {}", refspec.unwrap_or("HEAD")));
        Ok(())
    }

    fn set_identity(&self, author: &CommitAuthor) -> GitResult<()> {
        self.record(format!("identity {}", author.name));
        Ok(())
    }
}

#[derive(Default, Clone)]
struct RecordingExecutor {
    runs: Rc<RefCell<Vec<Vec<String>>>>,
}

impl HookExecutor for RecordingExecutor {
    fn execute(&self, commands: &[String], options: &HookOptions) -> HookResult<Vec<HookOutput>> {
        if options.dry_run {
            return Ok(Vec::new());
        }
        self.runs.borrow_mut().push(commands.to_vec());
        Ok(Vec::new())
    }
}

struct Harness {
    ctx: Context,
    git_calls: Rc<RefCell<Vec<String>>>,
    hook_runs: Rc<RefCell<Vec<Vec<String>>>>,
    _tmp: tempfile::TempDir,
}

impl Harness {
    fn root(&self) -> &Utf8Path {
        &self.ctx.root
    }

    fn run(&mut self, operation: Operation) -> Result<ExecutionReport, PipelineError> {
        workflow::run(operation, &mut self.ctx, &mut |_| {})
    }

    fn git_calls(&self) -> Vec<String> {
        self.git_calls.borrow().clone()
    }
}

fn harness(repo: FakeRepo, config: Config, options: RunOptions) -> Harness {
    let tmp = tempfile::TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
    let git_calls = Rc::clone(&repo.calls);
    let hooks = RecordingExecutor::default();
    let hook_runs = Rc::clone(&hooks.runs);

    let ctx = Context::new(ContextInit {
        root,
        config,
        repo: Box::new(repo),
        hooks: Box::new(hooks),
        options,
    })
    .unwrap();

    Harness {
        ctx,
        git_calls,
        hook_runs,
        _tmp: tmp,
    }
}

fn statuses(report: &ExecutionReport) -> Vec<(&str, StepStatus)> {
    report
        .steps
        .iter()
        .map(|s| (s.task.as_str(), s.status))
        .collect()
}

fn with_hooks() -> Config {
    let mut config = Config::default();
    config.hooks.before = vec!["echo before".into()];
    config.hooks.before_bump = vec!["echo before_bump".into()];
    config.hooks.after_tag = vec!["echo after_tag".into()];
    config.hooks.after = vec!["echo after".into()];
    config
}

// =============================================================================
// Version decisions through the pipeline
// =============================================================================

#[test]
fn feat_after_tag_releases_minor() {
    let mut h = harness(
        FakeRepo::new(&["v1.2.3"], &["feat: add X"]),
        Config::default(),
        RunOptions::default(),
    );
    h.run(Operation::Next).unwrap();

    assert!(!h.ctx.no_version_changed);
    assert_eq!(h.ctx.current_version, Version::parse("v1.2.3").unwrap());
    assert_eq!(h.ctx.next_tag().as_deref(), Some("v1.3.0"));
    assert_eq!(h.git_calls(), vec!["log v1.2.3..HEAD"]);
}

#[test]
fn release_tag_listed_after_its_candidate_is_current() {
    // git's version sort lists a prerelease ahead of its release.
    let mut h = harness(
        FakeRepo::new(&["v1.0.0-rc.1", "v1.0.0", "v0.9.0"], &["fix: c"]),
        Config::default(),
        RunOptions::default(),
    );
    h.run(Operation::Next).unwrap();

    assert_eq!(h.ctx.current_version, Version::parse("v1.0.0").unwrap());
    assert_eq!(h.ctx.next_tag().as_deref(), Some("v1.0.1"));
    assert_eq!(h.git_calls(), vec!["log v1.0.0..HEAD"]);
}

#[test]
fn no_tags_no_commits_skips_everything_downstream() {
    let mut config = with_hooks();
    config.bumps.push(BumpFile {
        file: "VERSION".into(),
        pattern: "$VERSION".into(),
        ..BumpFile::default()
    });
    let mut h = harness(FakeRepo::new(&[], &[]), config, RunOptions::default());

    let report = h.run(Operation::Release).unwrap();
    assert!(h.ctx.no_version_changed);

    let ran: Vec<&str> = report
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Completed)
        .map(|s| s.task.as_str())
        .collect();
    assert_eq!(
        ran,
        vec![
            "check git repository",
            "run before hooks",
            "calculate next version"
        ]
    );
    assert_eq!(*h.hook_runs.borrow(), vec![vec!["echo before".to_string()]]);
    assert_eq!(h.git_calls(), vec!["log ..HEAD"]);
}

#[test]
fn deterministic_across_runs() {
    let run = || {
        let mut h = harness(
            FakeRepo::new(&["v0.9.0-beta.2"], &["fix(beta): tweak", "feat: thing"]),
            Config::default(),
            RunOptions {
                mode: PrereleaseMode::Auto,
                prerelease: Some("beta".into()),
                ..RunOptions::default()
            },
        );
        h.run(Operation::Next).unwrap();
        h.ctx.next_tag()
    };
    let first = run();
    assert_eq!(first.as_deref(), Some("v0.9.0-beta.3"));
    assert_eq!(first, run());
}

#[test]
fn explicit_prerelease_and_metadata() {
    let mut h = harness(
        FakeRepo::new(&["v2.0.0"], &["fix: patch it"]),
        Config::default(),
        RunOptions {
            prerelease: Some("rc.1+build.7".into()),
            ..RunOptions::default()
        },
    );
    h.run(Operation::Next).unwrap();
    assert_eq!(h.ctx.next_tag().as_deref(), Some("v2.0.1-rc.1+build.7"));
}

// =============================================================================
// Executor semantics
// =============================================================================

struct Recorder {
    label: &'static str,
    skip: bool,
    fail: bool,
}

impl Task for Recorder {
    fn describe(&self) -> String {
        self.label.to_string()
    }

    fn skip(&self, _ctx: &Context) -> bool {
        self.skip
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        if self.fail {
            return Err(TaskError::Precondition("boom".into()));
        }
        ctx.modified_files.push(self.label.to_string());
        Ok(())
    }
}

fn recorder(label: &'static str, skip: bool, fail: bool) -> Box<dyn Task> {
    Box::new(Recorder { label, skip, fail })
}

#[test]
fn skipped_task_never_runs_and_never_blocks() {
    let mut h = harness(FakeRepo::default(), Config::default(), RunOptions::default());
    let pipeline = vec![
        recorder("first", false, false),
        recorder("skipped", true, true),
        recorder("last", false, false),
    ];

    let mut events = Vec::new();
    let report = execute(&pipeline, &mut h.ctx, &mut |e| events.push(e)).unwrap();

    assert_eq!(
        statuses(&report),
        vec![
            ("first", StepStatus::Completed),
            ("skipped", StepStatus::Skipped),
            ("last", StepStatus::Completed),
        ]
    );
    assert_eq!(h.ctx.modified_files, vec!["first", "last"]);
    // Started + Finished for each run task, Finished only for the skipped one.
    assert_eq!(events.len(), 5);
}

#[test]
fn first_error_stops_the_pipeline() {
    let mut h = harness(FakeRepo::default(), Config::default(), RunOptions::default());
    let pipeline = vec![
        recorder("first", false, false),
        recorder("broken", false, true),
        recorder("never", false, false),
    ];

    let err = execute(&pipeline, &mut h.ctx, &mut |_| {}).unwrap_err();
    let PipelineError::Task { task, source } = err;
    assert_eq!(task, "broken");
    assert!(matches!(source, TaskError::Precondition(_)));
    assert_eq!(h.ctx.modified_files, vec!["first"]);
}

#[test]
fn detached_head_fails_check() {
    let repo = FakeRepo {
        detached: true,
        ..FakeRepo::new(&[], &["feat: x"])
    };
    let mut h = harness(repo, Config::default(), RunOptions::default());
    let err = h.run(Operation::Next).unwrap_err();
    assert_eq!(err.to_string(), "check git repository failed");

    let mut config = Config::default();
    config.git.ignore_detached = true;
    let repo = FakeRepo {
        detached: true,
        ..FakeRepo::new(&[], &["feat: x"])
    };
    let mut h = harness(repo, config, RunOptions::default());
    h.run(Operation::Next).unwrap();
    assert_eq!(h.ctx.next_tag().as_deref(), Some("0.1.0"));
}

#[test]
fn invalid_tag_override_aborts() {
    let mut h = harness(
        FakeRepo::new(&["v1.0.0"], &["feat: x"]),
        Config::default(),
        RunOptions {
            current_version: Some("one.two".into()),
            ..RunOptions::default()
        },
    );
    let err = h.run(Operation::Tag).unwrap_err();
    let PipelineError::Task { task, source } = err;
    assert_eq!(task, "calculate next version");
    assert!(matches!(source, TaskError::Version(_)));
    assert!(h.ctx.tag_created.is_none());
}

// =============================================================================
// Full workflows
// =============================================================================

#[test]
fn release_bumps_writes_changelog_commits_and_tags() {
    let mut config = with_hooks();
    config.commit_author = Some(CommitAuthor {
        name: "bot".into(),
        email: "bot@example.com".into(),
    });
    config.bumps.push(BumpFile {
        file: "Cargo.toml".into(),
        pattern: r#"version = "$VERSION""#.into(),
        count: Some(1),
        semver: true,
    });
    config.changelog.exclude = vec!["^chore".into()];

    let mut h = harness(
        FakeRepo::new(&["v0.1.0"], &["feat: shiny", "chore: tidy", "fix: bug"]),
        config,
        RunOptions::default(),
    );
    fs::write(h.root().join("Cargo.toml"), "[package]\nversion = \"0.1.0\"\n").unwrap();

    let report = h.run(Operation::Release).unwrap();
    assert_eq!(report.skipped(), 5);

    assert_eq!(
        fs::read_to_string(h.root().join("Cargo.toml")).unwrap(),
        "[package]\nversion = \"0.2.0\"\n"
    );
    let changelog = fs::read_to_string(h.root().join("CHANGELOG.md")).unwrap();
    assert!(changelog.starts_with("# Changelog\n\n## v0.2.0 - "));
    assert!(changelog.contains("- `c0` feat: shiny\n- `c2` fix: bug\n"));
    assert!(!changelog.contains("tidy"));

    assert_eq!(
        h.git_calls(),
        vec![
            "identity bot".to_string(),
            "log v0.1.0..HEAD".to_string(),
            "add Cargo.toml CHANGELOG.md".to_string(),
            "commit chore(release): v0.2.0 [skip ci]".to_string(),
            "push HEAD".to_string(),
            "tag v0.2.0 annotated=false".to_string(),
            "push v0.2.0".to_string(),
        ]
    );
    assert_eq!(
        *h.hook_runs.borrow(),
        vec![
            vec!["echo before".to_string()],
            vec!["echo before_bump".to_string()],
            vec!["echo after_tag".to_string()],
            vec!["echo after".to_string()],
        ]
    );
    assert_eq!(h.ctx.commit_hash.as_deref(), Some("abc1234"));
    assert_eq!(h.ctx.tag_created.as_deref(), Some("v0.2.0"));
}

#[test]
fn dry_run_release_has_no_side_effects() {
    let mut config = with_hooks();
    config.bumps.push(BumpFile {
        file: "VERSION".into(),
        pattern: "$VERSION".into(),
        ..BumpFile::default()
    });

    let mut h = harness(
        FakeRepo::new(&["1.0.0"], &["fix: bug"]),
        config,
        RunOptions {
            dry_run: true,
            fetch_tags: true,
            ..RunOptions::default()
        },
    );
    fs::write(h.root().join("VERSION"), "1.0.0\n").unwrap();

    h.run(Operation::Release).unwrap();

    assert_eq!(h.ctx.next_tag().as_deref(), Some("1.0.1"));
    assert_eq!(fs::read_to_string(h.root().join("VERSION")).unwrap(), "1.0.0\n");
    assert!(!h.root().join("CHANGELOG.md").exists());
    assert!(h.ctx.changelog_section.is_some());
    assert!(h.hook_runs.borrow().is_empty());
    assert_eq!(h.git_calls(), vec!["log 1.0.0..HEAD"]);
}

#[test]
fn tag_without_push() {
    let mut config = Config::default();
    config.annotated_tags = true;
    let mut h = harness(
        FakeRepo::new(&["v3.1.4"], &["feat!: new api"]),
        config,
        RunOptions {
            no_push: true,
            ..RunOptions::default()
        },
    );
    h.run(Operation::Tag).unwrap();
    assert_eq!(
        h.git_calls(),
        vec!["log v3.1.4..HEAD", "tag v4.0.0 annotated=true"]
    );
}

#[test]
fn changelog_diff_only_keeps_section_in_memory() {
    let mut h = harness(
        FakeRepo::new(&["v1.0.0"], &["feat: a", "fix: b"]),
        Config::default(),
        RunOptions {
            changelog_diff_only: true,
            changelog_sort: Some("asc".into()),
            ..RunOptions::default()
        },
    );
    h.run(Operation::Changelog).unwrap();

    let section = h.ctx.changelog_section.clone().unwrap();
    assert!(section.starts_with("## v1.1.0 - "));
    assert!(section.ends_with("- `c1` fix: b\n- `c0` feat: a\n"));
    assert!(!h.root().join("CHANGELOG.md").exists());
    assert!(h.ctx.modified_files.is_empty());
}

#[test]
fn skip_prerelease_changelog() {
    let mut config = Config::default();
    config.changelog.skip_prerelease = true;
    let mut h = harness(
        FakeRepo::new(&["v1.0.0"], &["feat: a"]),
        config,
        RunOptions {
            prerelease: Some("beta".into()),
            ..RunOptions::default()
        },
    );
    let report = h.run(Operation::Changelog).unwrap();
    assert_eq!(h.ctx.next_tag().as_deref(), Some("v1.1.0-beta"));
    assert!(
        statuses(&report).contains(&("update changelog", StepStatus::Skipped))
    );
}

#[test]
fn outcome_serializes() {
    let mut h = harness(
        FakeRepo::new(&["v1.2.3"], &["fix: a"]),
        Config::default(),
        RunOptions::default(),
    );
    h.run(Operation::Next).unwrap();
    let json = serde_json::to_value(h.ctx.outcome()).unwrap();
    assert_eq!(json["current_version"], "v1.2.3");
    assert_eq!(json["next_version"], "v1.2.4");
    assert_eq!(json["increment"], "patch");
    assert_eq!(json["no_version_changed"], false);
}
