//! Shared state for one workflow run.
//!
//! A [`Context`] is built once from configuration and command-line options,
//! validated up front, then handed mutably to each task in turn. Tasks read
//! the option bags and record what they did in the result fields.

use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::changelog::{ChangelogOptions, SortOrder, compile_patterns};
use crate::config::{CommitAuthor, Config};
use crate::error::{ValidationError, ValidationResult};
use crate::git::{CommitRecord, Repository, TagSort};
use crate::hooks::{HookExecutor, HookOptions, HookVars};
use crate::version::classify::PatchTypes;
use crate::version::calculate::VersionOptions;
use crate::version::{Increment, PrereleaseMode, Version};

/// Default release commit message. `{tag}` is replaced with the new tag.
pub const DEFAULT_COMMIT_MESSAGE: &str = "chore(release): {tag} [skip ci]";

/// Options given on the command line for one run.
///
/// Anything left unset falls back to the configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Requested prerelease, optionally with `+metadata`.
    pub prerelease: Option<String>,
    /// Prerelease mode.
    pub mode: PrereleaseMode,
    /// Extra patch types.
    pub patch_types: Vec<String>,
    /// Drop a leading `v` from the next version.
    pub strip_prefix: bool,
    /// Calculate from the current version without its prerelease.
    pub ignore_existing_prerelease: bool,
    /// Pick the current tag by the requested prerelease.
    pub filter_on_prerelease: bool,
    /// Fetch tags from every remote before calculating.
    pub fetch_tags: bool,
    /// Use this as the current version instead of the latest tag.
    pub current_version: Option<String>,
    /// Do not push commits or tags.
    pub no_push: bool,
    /// Skip the changelog stage.
    pub skip_changelog: bool,
    /// Skip the bump stage.
    pub skip_bumps: bool,
    /// Render the changelog section without writing it.
    pub changelog_diff_only: bool,
    /// Changelog sort order override.
    pub changelog_sort: Option<String>,
    /// Changelog include patterns (replace the configured ones).
    pub changelog_include: Vec<String>,
    /// Changelog exclude patterns (replace the configured ones).
    pub changelog_exclude: Vec<String>,
    /// Report instead of acting.
    pub dry_run: bool,
    /// Verbose hook output.
    pub debug: bool,
}

/// Git behaviour for one run.
#[derive(Debug, Clone, Default)]
pub struct GitOptions {
    /// Run `git fetch --all --tags` first.
    pub fetch_tags: bool,
    /// Leave commits and tags local.
    pub no_push: bool,
    /// Allow a detached HEAD.
    pub ignore_detached: bool,
    /// Allow a shallow clone.
    pub ignore_shallow: bool,
    /// `--push-option` values.
    pub push_options: Vec<String>,
    /// Create annotated tags.
    pub annotated: bool,
}

/// The release commit prepared before files are touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseCommit {
    /// Commit message with `{tag}` resolved.
    pub message: String,
    /// Identity to commit as, when configured.
    #[serde(skip)]
    pub author: Option<CommitAuthor>,
}

/// Arguments for constructing a [`Context`].
pub struct ContextInit {
    /// Project root.
    pub root: Utf8PathBuf,
    /// Loaded configuration.
    pub config: Config,
    /// Git access.
    pub repo: Box<dyn Repository>,
    /// Hook runner.
    pub hooks: Box<dyn HookExecutor>,
    /// Command-line options.
    pub options: RunOptions,
}

/// Mutable state threaded through one pipeline run.
pub struct Context {
    /// Project root.
    pub root: Utf8PathBuf,
    /// Loaded configuration.
    pub config: Config,
    /// Git access.
    pub repo: Box<dyn Repository>,
    /// Hook runner.
    pub hooks: Box<dyn HookExecutor>,

    /// Version calculation inputs.
    pub version: VersionOptions,
    /// Changelog inputs.
    pub changelog: ChangelogOptions,
    /// Git inputs.
    pub git: GitOptions,
    /// Skip the bump stage.
    pub skip_bumps: bool,
    /// No persistent side effects.
    pub dry_run: bool,
    /// Verbose hook output.
    pub debug: bool,

    /// Version before this run. Zero until calculated.
    pub current_version: Version,
    /// Tag the current version was read from.
    pub current_tag: Option<String>,
    /// Version being released, once calculated.
    pub next_version: Option<Version>,
    /// Aggregated increment.
    pub increment: Increment,
    /// Nothing releasable since the current tag.
    pub no_version_changed: bool,
    /// Commits since the current tag, newest first.
    pub commits: Vec<CommitRecord>,
    /// Prepared release commit.
    pub commit: Option<ReleaseCommit>,
    /// Hash of the release commit, once made.
    pub commit_hash: Option<String>,
    /// Rendered changelog section.
    pub changelog_section: Option<String>,
    /// Files changed by bump and changelog stages.
    pub modified_files: Vec<String>,
    /// Tag created by the tag stage.
    pub tag_created: Option<String>,
}

impl Context {
    /// Build and validate a context.
    ///
    /// Malformed prerelease, metadata, sort orders and patterns are
    /// rejected here, before any task runs.
    pub fn new(init: ContextInit) -> ValidationResult<Self> {
        let ContextInit {
            root,
            config,
            repo,
            hooks,
            options,
        } = init;

        let (prerelease, metadata) = split_prerelease(options.prerelease.as_deref())?;

        let tag_sort = config
            .git
            .tag_sort
            .as_deref()
            .map(TagSort::from_str)
            .transpose()?
            .unwrap_or_default();

        let mut patch_types = PatchTypes::with_extra(&config.patch_types);
        patch_types.extend(&options.patch_types);

        let version = VersionOptions {
            prerelease,
            metadata,
            mode: options.mode,
            patch_types,
            trim_header: config.changelog.trim_header,
            strip_prefix: options.strip_prefix,
            ignore_existing_prerelease: options.ignore_existing_prerelease,
            filter_on_prerelease: options.filter_on_prerelease,
            tag_pattern: config
                .git
                .tag_pattern
                .clone()
                .unwrap_or_else(|| "*".to_string()),
            tag_sort,
            current_version: options.current_version,
        };

        let mut changelog = ChangelogOptions::from_config(&config.changelog)?;
        if let Some(sort) = options.changelog_sort.as_deref() {
            changelog.sort = SortOrder::from_str(sort)?;
        }
        if !options.changelog_include.is_empty() {
            changelog.include = compile_patterns(&options.changelog_include)?;
        }
        if !options.changelog_exclude.is_empty() {
            changelog.exclude = compile_patterns(&options.changelog_exclude)?;
        }
        changelog.diff_only = options.changelog_diff_only;
        changelog.skip = options.skip_changelog;

        let git = GitOptions {
            fetch_tags: options.fetch_tags,
            no_push: options.no_push,
            ignore_detached: config.git.ignore_detached,
            ignore_shallow: config.git.ignore_shallow,
            push_options: config.git.push_options.clone(),
            annotated: config.annotated_tags,
        };

        Ok(Self {
            root,
            config,
            repo,
            hooks,
            version,
            changelog,
            git,
            skip_bumps: options.skip_bumps,
            dry_run: options.dry_run,
            debug: options.debug,
            current_version: Version::zero(),
            current_tag: None,
            next_version: None,
            increment: Increment::None,
            no_version_changed: false,
            commits: Vec::new(),
            commit: None,
            commit_hash: None,
            changelog_section: None,
            modified_files: Vec::new(),
            tag_created: None,
        })
    }

    /// Hook settings for the current state of the run.
    pub fn hook_options(&self) -> HookOptions {
        HookOptions {
            dry_run: self.dry_run,
            debug: self.debug,
            env: self.config.env.clone(),
            vars: HookVars {
                current_version: self.current_version.raw(),
                next_version: self
                    .next_version
                    .as_ref()
                    .map(Version::raw)
                    .unwrap_or_default(),
                changelog_path: self.changelog.path.to_string(),
            },
        }
    }

    /// The tag name for the next version.
    pub fn next_tag(&self) -> Option<String> {
        self.next_version.as_ref().map(Version::raw)
    }

    /// Snapshot of what the run decided and did.
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            current_version: self.current_version.clone(),
            current_tag: self.current_tag.clone(),
            next_version: self.next_version.clone(),
            increment: self.increment,
            no_version_changed: self.no_version_changed,
            commit: self.commit.clone(),
            commit_hash: self.commit_hash.clone(),
            modified_files: self.modified_files.clone(),
            changelog: self.changelog_section.clone(),
            tag: self.tag_created.clone(),
            dry_run: self.dry_run,
        }
    }
}

/// Serializable summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Version before the run.
    pub current_version: Version,
    /// Tag the current version came from.
    pub current_tag: Option<String>,
    /// Version released (or that would be).
    pub next_version: Option<Version>,
    /// Aggregated increment.
    pub increment: Increment,
    /// Nothing releasable.
    pub no_version_changed: bool,
    /// Prepared release commit.
    pub commit: Option<ReleaseCommit>,
    /// Release commit hash.
    pub commit_hash: Option<String>,
    /// Files changed.
    pub modified_files: Vec<String>,
    /// Rendered changelog section.
    pub changelog: Option<String>,
    /// Created tag.
    pub tag: Option<String>,
    /// Whether side effects were suppressed.
    pub dry_run: bool,
}

/// Split `beta.1+build.5` into a validated prerelease and metadata.
fn split_prerelease(
    requested: Option<&str>,
) -> ValidationResult<(Option<String>, Option<String>)> {
    let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok((None, None));
    };
    let (pre, meta) = match requested.split_once('+') {
        Some((pre, meta)) => (pre, Some(meta)),
        None => (requested, None),
    };

    let prerelease = if pre.is_empty() {
        None
    } else {
        semver::Prerelease::new(pre).map_err(|e| ValidationError::Prerelease {
            value: pre.to_string(),
            reason: e.to_string(),
        })?;
        Some(pre.to_string())
    };

    let metadata = match meta {
        Some(meta) => {
            semver::BuildMetadata::new(meta).map_err(|e| ValidationError::Metadata {
                value: meta.to_string(),
                reason: e.to_string(),
            })?;
            Some(meta.to_string())
        }
        None => None,
    };

    Ok((prerelease, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChangelogConfig;
    use crate::git::GitResult;
    use crate::hooks::{HookOutput, HookResult};

    struct NoRepo;

    impl Repository for NoRepo {
        fn is_inside_repo(&self) -> GitResult<bool> {
            Ok(true)
        }
        fn is_detached(&self) -> GitResult<bool> {
            Ok(false)
        }
        fn is_shallow(&self) -> GitResult<bool> {
            Ok(false)
        }
        fn tags(&self, _pattern: &str, _sort: TagSort) -> GitResult<Vec<String>> {
            Ok(Vec::new())
        }
        fn commits(&self, _from: Option<&str>, _to: &str) -> GitResult<Vec<CommitRecord>> {
            Ok(Vec::new())
        }
        fn fetch_tags(&self) -> GitResult<()> {
            Ok(())
        }
        fn stage(&self, _paths: &[String]) -> GitResult<()> {
            Ok(())
        }
        fn commit(&self, _message: &str, _author: Option<&CommitAuthor>) -> GitResult<String> {
            Ok(String::new())
        }
        fn tag(&self, _name: &str, _annotated: bool) -> GitResult<()> {
            Ok(())
        }
        fn push(&self, _refspec: Option<&str>, _options: &[String]) -> GitResult<()> {
            Ok(())
        }
        fn set_identity(&self, _author: &CommitAuthor) -> GitResult<()> {
            Ok(())
        }
    }

    struct NoHooks;

    impl HookExecutor for NoHooks {
        fn execute(&self, _commands: &[String], _options: &HookOptions) -> HookResult<Vec<HookOutput>> {
            Ok(Vec::new())
        }
    }

    fn build(config: Config, options: RunOptions) -> ValidationResult<Context> {
        Context::new(ContextInit {
            root: Utf8PathBuf::from("."),
            config,
            repo: Box::new(NoRepo),
            hooks: Box::new(NoHooks),
            options,
        })
    }

    #[test]
    fn prerelease_with_metadata_is_split() {
        let ctx = build(
            Config::default(),
            RunOptions {
                prerelease: Some("beta.1+build.5".into()),
                ..RunOptions::default()
            },
        )
        .unwrap();
        assert_eq!(ctx.version.prerelease.as_deref(), Some("beta.1"));
        assert_eq!(ctx.version.metadata.as_deref(), Some("build.5"));
    }

    #[test]
    fn metadata_only() {
        assert_eq!(
            split_prerelease(Some("+sha.1")).unwrap(),
            (None, Some("sha.1".to_string()))
        );
        assert_eq!(split_prerelease(Some("  ")).unwrap(), (None, None));
    }

    #[test]
    fn malformed_prerelease_is_rejected() {
        let result = build(
            Config::default(),
            RunOptions {
                prerelease: Some("beta..1".into()),
                ..RunOptions::default()
            },
        );
        assert!(matches!(result, Err(ValidationError::Prerelease { .. })));

        let result = build(
            Config::default(),
            RunOptions {
                prerelease: Some("beta+bad..meta".into()),
                ..RunOptions::default()
            },
        );
        assert!(matches!(result, Err(ValidationError::Metadata { .. })));
    }

    #[test]
    fn malformed_sort_is_rejected() {
        let result = build(
            Config::default(),
            RunOptions {
                changelog_sort: Some("random".into()),
                ..RunOptions::default()
            },
        );
        assert!(matches!(result, Err(ValidationError::Sort(_))));

        let mut config = Config::default();
        config.git.tag_sort = Some("alphabetical".into());
        assert!(matches!(
            build(config, RunOptions::default()),
            Err(ValidationError::TagSort(_))
        ));
    }

    #[test]
    fn cli_overrides_config() {
        let config = Config {
            patch_types: vec!["refactor".into()],
            changelog: ChangelogConfig {
                sort: Some("asc".into()),
                exclude: vec!["^chore".into()],
                ..ChangelogConfig::default()
            },
            ..Config::default()
        };
        let ctx = build(
            config,
            RunOptions {
                patch_types: vec!["Build".into()],
                changelog_sort: Some("desc".into()),
                ..RunOptions::default()
            },
        )
        .unwrap();

        assert!(ctx.version.patch_types.contains("refactor"));
        assert!(ctx.version.patch_types.contains("build"));
        assert!(ctx.version.patch_types.contains("fix"));
        assert_eq!(ctx.changelog.sort, SortOrder::Desc);
        assert_eq!(ctx.changelog.exclude.len(), 1);
        assert_eq!(ctx.version.tag_pattern, "*");
    }

    #[test]
    fn hook_options_reflect_state() {
        let mut config = Config::default();
        config.env.insert("CI".into(), "1".into());
        let mut ctx = build(
            config,
            RunOptions {
                dry_run: true,
                ..RunOptions::default()
            },
        )
        .unwrap();
        ctx.current_version = Version::parse("v1.0.0").unwrap();
        ctx.next_version = Some(Version::parse("v1.1.0").unwrap());

        let opts = ctx.hook_options();
        assert!(opts.dry_run);
        assert_eq!(opts.env.get("CI").map(String::as_str), Some("1"));
        assert_eq!(opts.vars.current_version, "v1.0.0");
        assert_eq!(opts.vars.next_version, "v1.1.0");
        assert_eq!(opts.vars.changelog_path, "CHANGELOG.md");
        assert_eq!(ctx.next_tag().as_deref(), Some("v1.1.0"));
    }
}
