//! Git operations for release workflows.
//!
//! Tasks talk to git through the [`Repository`] trait so a run can be driven
//! against an in-memory fake. [`GitCli`] is the real implementation: it
//! shells out to `git`, which means the user's SSH keys, GPG signing and
//! hooks all apply.

use std::fmt;
use std::process::Command;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CommitAuthor;
use crate::error::ValidationError;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "status").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,

    /// The `git` binary is not on `PATH`.
    #[error("git executable not found on PATH")]
    NotInstalled,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// A commit as read from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    /// Abbreviated hash.
    pub hash: String,
    /// Author name.
    pub author: String,
    /// Full message (subject and body).
    pub message: String,
}

impl CommitRecord {
    /// A record with only a message, for callers that have nothing else.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            hash: String::new(),
            author: String::new(),
            message: message.into(),
        }
    }
}

/// Order in which tags are listed, newest first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TagSort {
    /// Highest version first.
    #[default]
    Version,
    /// Most recently created first.
    Date,
}

impl TagSort {
    const fn git_key(self) -> &'static str {
        match self {
            Self::Version => "--sort=-version:refname",
            Self::Date => "--sort=-creatordate",
        }
    }
}

impl fmt::Display for TagSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version => write!(f, "version"),
            Self::Date => write!(f, "date"),
        }
    }
}

impl FromStr for TagSort {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "version" | "semver" => Ok(Self::Version),
            "date" | "creatordate" => Ok(Self::Date),
            _ => Err(ValidationError::TagSort(s.to_string())),
        }
    }
}

/// The git operations a release pipeline needs.
pub trait Repository {
    /// Fail early when git itself is unusable.
    fn ensure_available(&self) -> GitResult<()> {
        Ok(())
    }

    /// Whether the working directory is inside a work tree.
    fn is_inside_repo(&self) -> GitResult<bool>;

    /// Whether HEAD is detached.
    fn is_detached(&self) -> GitResult<bool>;

    /// Whether the clone is shallow.
    fn is_shallow(&self) -> GitResult<bool>;

    /// Tags matching a glob, newest first by `sort`.
    fn tags(&self, pattern: &str, sort: TagSort) -> GitResult<Vec<String>>;

    /// Commits reachable from `to` but not from `from`, newest first.
    ///
    /// `from = None` means the whole history of `to`. A repository without
    /// any commits yields an empty list.
    fn commits(&self, from: Option<&str>, to: &str) -> GitResult<Vec<CommitRecord>>;

    /// Fetch all tags from every remote.
    fn fetch_tags(&self) -> GitResult<()>;

    /// Stage the given paths.
    fn stage(&self, paths: &[String]) -> GitResult<()>;

    /// Commit the index, returning the abbreviated hash.
    fn commit(&self, message: &str, author: Option<&CommitAuthor>) -> GitResult<String>;

    /// Create a tag at HEAD.
    fn tag(&self, name: &str, annotated: bool) -> GitResult<()>;

    /// Push the current branch (`refspec = None`) or a single ref.
    fn push(&self, refspec: Option<&str>, options: &[String]) -> GitResult<()>;

    /// Record the committer identity in the repository config.
    fn set_identity(&self, author: &CommitAuthor) -> GitResult<()>;
}

/// [`Repository`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: Utf8PathBuf,
}

impl GitCli {
    /// Run git commands from `root`.
    pub fn new(root: impl AsRef<Utf8Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Run a git command and return its stdout.
    fn git(&self, args: &[&str]) -> GitResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.root.as_std_path())
            .output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

            if stderr.contains("not a git repository") {
                return Err(GitError::NotARepo);
            }

            Err(GitError::Command {
                command: args.first().unwrap_or(&"").to_string(),
                stderr,
            })
        }
    }

    fn has_head(&self) -> GitResult<bool> {
        match self.git(&["rev-parse", "--verify", "--quiet", "HEAD"]) {
            Ok(_) => Ok(true),
            Err(GitError::Command { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// Field and record separators for `git log --format`.
const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

impl Repository for GitCli {
    fn ensure_available(&self) -> GitResult<()> {
        which::which("git").map_err(|_| GitError::NotInstalled)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn is_inside_repo(&self) -> GitResult<bool> {
        match self.git(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(output) => Ok(output.trim() == "true"),
            Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    fn is_detached(&self) -> GitResult<bool> {
        if !self.has_head()? {
            return Ok(false);
        }
        let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let detached = branch.trim() == "HEAD";
        debug!(detached, "head state");
        Ok(detached)
    }

    #[instrument(skip(self))]
    fn is_shallow(&self) -> GitResult<bool> {
        let output = self.git(&["rev-parse", "--is-shallow-repository"])?;
        Ok(output.trim() == "true")
    }

    #[instrument(skip(self))]
    fn tags(&self, pattern: &str, sort: TagSort) -> GitResult<Vec<String>> {
        let output = self.git(&["tag", "--list", pattern, sort.git_key()])?;
        let tags: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect();
        debug!(count = tags.len(), "listed tags");
        Ok(tags)
    }

    #[instrument(skip(self))]
    fn commits(&self, from: Option<&str>, to: &str) -> GitResult<Vec<CommitRecord>> {
        if !self.has_head()? {
            debug!("repository has no commits");
            return Ok(Vec::new());
        }
        let range = from.map_or_else(|| to.to_string(), |tag| format!("{tag}..{to}"));
        let format = format!("--format=%h{FIELD_SEP}%an{FIELD_SEP}%B{RECORD_SEP}");
        let output = self.git(&["log", &range, &format])?;

        let commits: Vec<CommitRecord> = output
            .split(RECORD_SEP)
            .map(|record| record.trim_start_matches('\n'))
            .filter(|record| !record.is_empty())
            .filter_map(|record| {
                let mut fields = record.splitn(3, FIELD_SEP);
                Some(CommitRecord {
                    hash: fields.next()?.to_string(),
                    author: fields.next()?.to_string(),
                    message: fields.next()?.trim_end().to_string(),
                })
            })
            .collect();

        debug!(count = commits.len(), %range, "read commits");
        Ok(commits)
    }

    #[instrument(skip(self))]
    fn fetch_tags(&self) -> GitResult<()> {
        self.git(&["fetch", "--all", "--tags"])?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn stage(&self, paths: &[String]) -> GitResult<()> {
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args)?;
        Ok(())
    }

    #[instrument(skip(self, message))]
    fn commit(&self, message: &str, author: Option<&CommitAuthor>) -> GitResult<String> {
        let mut args: Vec<String> = Vec::new();
        if let Some(author) = author {
            args.push("-c".into());
            args.push(format!("user.name={}", author.name));
            args.push("-c".into());
            args.push(format!("user.email={}", author.email));
        }
        args.extend(["commit".into(), "-m".into(), message.to_string()]);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.git(&args)?;

        let hash = self.git(&["rev-parse", "--short", "HEAD"])?.trim().to_string();
        debug!(%hash, "created commit");
        Ok(hash)
    }

    #[instrument(skip(self))]
    fn tag(&self, name: &str, annotated: bool) -> GitResult<()> {
        if annotated {
            self.git(&["tag", "-a", name, "-m", name])?;
        } else {
            self.git(&["tag", name])?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn push(&self, refspec: Option<&str>, options: &[String]) -> GitResult<()> {
        let push_options: Vec<String> = options.iter().map(|o| format!("--push-option={o}")).collect();
        let mut args = vec!["push"];
        args.extend(push_options.iter().map(String::as_str));
        if let Some(refspec) = refspec {
            args.extend(["origin", refspec]);
        }
        self.git(&args)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn set_identity(&self, author: &CommitAuthor) -> GitResult<()> {
        self.git(&["config", "user.name", &author.name])?;
        self.git(&["config", "user.email", &author.email])?;
        Ok(())
    }
}
