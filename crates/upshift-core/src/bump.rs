//! In-file version replacement.
//!
//! Each configured [`BumpFile`] names a file and a regex in which the literal
//! `$VERSION` marks where the version sits. Only the text captured at that
//! spot is replaced; the rest of every match is written back untouched.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::BumpFile;
use crate::version::Version;

/// Placeholder for the version inside a bump pattern.
pub const VERSION_TOKEN: &str = "$VERSION";

const VERSION_CAPTURE: &str =
    r"(?P<version>[0-9]+\.[0-9]+\.[0-9]+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)";

/// Errors from bump operations.
#[derive(Error, Debug)]
pub enum BumpError {
    /// The pattern is not a usable regex.
    #[error("invalid bump pattern '{pattern}': {reason}")]
    Pattern {
        /// The configured pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The pattern matched nothing in the file.
    #[error("pattern '{pattern}' matched nothing in {file}")]
    NoMatch {
        /// The file searched.
        file: Utf8PathBuf,
        /// The configured pattern.
        pattern: String,
    },

    /// Reading or writing the file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The file involved.
        path: Utf8PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result alias for bump operations.
pub type BumpResult<T> = Result<T, BumpError>;

/// Turn a `$VERSION` pattern into a regex with a `version` group.
pub fn compile_pattern(pattern: &str) -> BumpResult<Regex> {
    if !pattern.contains(VERSION_TOKEN) {
        return Err(BumpError::Pattern {
            pattern: pattern.to_string(),
            reason: format!("missing {VERSION_TOKEN} placeholder"),
        });
    }
    let source = pattern.replacen(VERSION_TOKEN, VERSION_CAPTURE, 1);
    Regex::new(&source).map_err(|e| BumpError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Replace the captured version in up to `limit` matches (`0` = all).
///
/// Returns the new content and the number of matches.
pub fn apply(content: &str, regex: &Regex, version: &str, limit: usize) -> (String, usize) {
    let mut matches = 0;
    let replaced = regex.replacen(content, limit, |caps: &Captures<'_>| {
        matches += 1;
        let whole = &caps[0];
        match (caps.get(0), caps.name("version")) {
            (Some(outer), Some(inner)) => {
                let start = inner.start() - outer.start();
                let end = inner.end() - outer.start();
                format!("{}{version}{}", &whole[..start], &whole[end..])
            }
            _ => whole.to_string(),
        }
    });
    (replaced.into_owned(), matches)
}

/// Rewrite one file. Returns whether its content changed.
///
/// Under `dry_run` the new content is computed and reported but not written.
#[instrument(skip(target, version), fields(file = %target.file))]
pub fn bump_file(
    root: &Utf8Path,
    target: &BumpFile,
    version: &Version,
    dry_run: bool,
) -> BumpResult<bool> {
    let path = root.join(&target.file);
    let regex = compile_pattern(&target.pattern)?;
    let content = fs::read_to_string(&path).map_err(|source| BumpError::Io {
        path: path.clone(),
        source,
    })?;

    let text = if target.semver {
        version.semver().to_string()
    } else {
        version.raw()
    };
    let (updated, matches) = apply(&content, &regex, &text, target.count.unwrap_or(0));
    if matches == 0 {
        return Err(BumpError::NoMatch {
            file: target.file.clone(),
            pattern: target.pattern.clone(),
        });
    }

    let changed = updated != content;
    debug!(matches, changed, "bump pattern applied");
    if !changed {
        return Ok(false);
    }

    if dry_run {
        info!(file = %target.file, version = %text, "dry run: would update file");
    } else {
        fs::write(&path, updated).map_err(|source| BumpError::Io { path, source })?;
        info!(file = %target.file, version = %text, "updated file");
    }
    Ok(true)
}
