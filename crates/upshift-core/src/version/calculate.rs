//! Next-version calculation against the repository.

use serde::Serialize;
use tracing::{debug, info, instrument};

use super::aggregate::aggregate;
use super::classify::{Classifier, PatchTypes};
use super::prerelease::{self, DEFAULT_IDENTIFIER};
use super::{BumpLevel, Increment, PrereleaseMode, Version, VersionResult};
use crate::git::{CommitRecord, Repository, TagSort};

/// Inputs that steer the calculation.
#[derive(Debug, Clone)]
pub struct VersionOptions {
    /// Requested prerelease (`beta`, `rc.2`).
    pub prerelease: Option<String>,
    /// Requested build metadata.
    pub metadata: Option<String>,
    /// Prerelease mode.
    pub mode: PrereleaseMode,
    /// Commit types that produce a patch.
    pub patch_types: PatchTypes,
    /// Allow the conventional header to follow leading lines.
    pub trim_header: bool,
    /// Drop a leading `v` from the emitted version.
    pub strip_prefix: bool,
    /// Compute from the current version without its prerelease and metadata.
    pub ignore_existing_prerelease: bool,
    /// Only consider tags whose prerelease matches the requested one.
    pub filter_on_prerelease: bool,
    /// Glob passed to the tag listing.
    pub tag_pattern: String,
    /// Tag listing order.
    pub tag_sort: TagSort,
    /// Use this text as the current version instead of the latest tag.
    pub current_version: Option<String>,
}

impl Default for VersionOptions {
    fn default() -> Self {
        Self {
            prerelease: None,
            metadata: None,
            mode: PrereleaseMode::Off,
            patch_types: PatchTypes::default(),
            trim_header: false,
            strip_prefix: false,
            ignore_existing_prerelease: false,
            filter_on_prerelease: false,
            tag_pattern: "*".to_string(),
            tag_sort: TagSort::Version,
            current_version: None,
        }
    }
}

/// Outcome of a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Calculation {
    /// The version the repository is at.
    pub current: Version,
    /// The tag `current` was read from, if any.
    pub current_tag: Option<String>,
    /// The version to release. Equal to `current` when nothing changed.
    pub next: Version,
    /// The aggregated increment.
    pub increment: Increment,
    /// Commits since `current_tag`, newest first.
    #[serde(skip)]
    pub commits: Vec<CommitRecord>,
}

impl Calculation {
    /// Whether the commits warrant a release.
    pub fn changed(&self) -> bool {
        self.increment != Increment::None
    }
}

/// Computes the next version from tags and commits.
pub struct VersionCalculator<'a> {
    repo: &'a dyn Repository,
    options: &'a VersionOptions,
}

impl<'a> VersionCalculator<'a> {
    /// Calculate against `repo` with the given options.
    pub const fn new(repo: &'a dyn Repository, options: &'a VersionOptions) -> Self {
        Self { repo, options }
    }

    /// Run the calculation.
    #[instrument(skip(self))]
    pub fn calculate(&self) -> VersionResult<Calculation> {
        let (latest, current_tag) = self.latest_tag()?;
        let current = match &self.options.current_version {
            Some(text) => Version::parse(text)?,
            None => latest,
        };
        debug!(%current, tag = ?current_tag, "current version");

        let commits = self.repo.commits(current_tag.as_deref(), "HEAD")?;
        let classifier = Classifier::new(self.options.patch_types.clone())
            .with_trim_header(self.options.trim_header);
        let increment = aggregate(
            &classifier,
            self.options.mode,
            commits.iter().map(|c| c.message.as_str()),
        );

        if increment == Increment::None {
            info!(commits = commits.len(), "no releasable commits");
            return Ok(Calculation {
                next: current.clone(),
                current,
                current_tag,
                increment,
                commits,
            });
        }

        let next = next_version(&current, increment, self.options)?;
        info!(%current, %next, %increment, "calculated next version");
        Ok(Calculation {
            current,
            current_tag,
            next,
            increment,
            commits,
        })
    }

    /// The latest matching version tag, or the zero value.
    ///
    /// Under [`TagSort::Version`] the highest semver wins regardless of the
    /// order git lists tags in (git puts `v1.0.0-rc.1` ahead of `v1.0.0`).
    /// Under [`TagSort::Date`] the first tag listed wins. The prefix is
    /// ignored when comparing.
    fn latest_tag(&self) -> VersionResult<(Version, Option<String>)> {
        let tags = self
            .repo
            .tags(&self.options.tag_pattern, self.options.tag_sort)?;

        let mut candidates = tags.into_iter().filter_map(|tag| match Version::parse(&tag) {
            Ok(version) if !self.options.filter_on_prerelease || self.matches_request(&version) => {
                Some((version, tag))
            }
            Ok(_) => None,
            Err(_) => {
                debug!(%tag, "skipping non-version tag");
                None
            }
        });

        let latest = match self.options.tag_sort {
            TagSort::Date => candidates.next(),
            TagSort::Version => candidates.reduce(|best, candidate| {
                if candidate.0.semver() > best.0.semver() {
                    candidate
                } else {
                    best
                }
            }),
        };

        Ok(latest.map_or((Version::zero(), None), |(version, tag)| {
            (version, Some(tag))
        }))
    }

    fn matches_request(&self, version: &Version) -> bool {
        let prerelease_ok = self.options.prerelease.as_deref().is_none_or(|wanted| {
            prerelease::identifier(version.prerelease())
                .eq_ignore_ascii_case(prerelease::identifier(wanted))
        });
        let metadata_ok = self
            .options
            .metadata
            .as_deref()
            .is_none_or(|wanted| version.metadata() == wanted);
        prerelease_ok && metadata_ok
    }
}

/// Apply an increment to a version.
///
/// Numeric increments move `X.Y.Z`. Under [`PrereleaseMode::Auto`] a version
/// that already carries a prerelease stays on the prerelease track, and
/// since the numeric move always changes `X.Y.Z` the counter restarts at 1.
/// A pure [`Increment::PreRelease`] keeps the triple unless it is `0.0.0`.
pub fn next_version(
    current: &Version,
    increment: Increment,
    options: &VersionOptions,
) -> VersionResult<Version> {
    let mut next = current.clone();
    if options.strip_prefix {
        next.strip_v_prefix();
    }
    if options.ignore_existing_prerelease {
        next.clear_suffixes();
    }

    let existing = next.prerelease().to_string();
    let increment = increment.for_mode(options.mode, !existing.is_empty());
    let before = next.triple();

    match increment.level() {
        Some(level) => next = next.bumped(level)?,
        None if increment == Increment::PreRelease && next.is_zero_triple() => {
            next = next.bumped(BumpLevel::Patch)?;
        }
        None => {}
    }
    let base_changed = next.triple() != before;

    if increment.is_prerelease() {
        let target = options
            .prerelease
            .as_deref()
            .map_or(DEFAULT_IDENTIFIER, prerelease::identifier);
        let evolved = prerelease::evolve(&existing, base_changed, target);
        next.set_prerelease(&evolved)?;
    } else if let Some(explicit) = options.prerelease.as_deref() {
        next.set_prerelease(explicit)?;
    }

    next.clear_metadata();
    if let Some(metadata) = options.metadata.as_deref() {
        next.set_metadata(metadata)?;
    }
    Ok(next)
}
