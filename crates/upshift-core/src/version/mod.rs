//! Version model and the version-decision engine.
//!
//! The engine is split into leaves that are pure functions over strings and
//! one orchestrator that talks to the repository:
//!
//! - [`classify`] turns a commit message into an increment contribution
//! - [`aggregate`] folds a commit list into one dominant [`Increment`]
//! - [`prerelease`] evolves a prerelease counter (`alpha.1` → `alpha.2`)
//! - [`calculate`] ties them to the latest tag and the commit range

pub mod aggregate;
pub mod calculate;
pub mod classify;
pub mod increment;
pub mod prerelease;

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub use increment::Increment;

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Text did not match `PREFIX? MAJOR.MINOR.PATCH[-PRE][+META]`.
    #[error("invalid version '{text}': {source}")]
    Parse {
        /// The rejected text.
        text: String,
        /// Underlying semver error.
        source: semver::Error,
    },

    /// Text contained no numeric version part at all.
    #[error("invalid version '{0}': no MAJOR.MINOR.PATCH found")]
    MissingNumber(String),

    /// A computed or requested prerelease was rejected by the grammar.
    #[error("invalid prerelease '{text}': {source}")]
    Prerelease {
        /// The rejected prerelease.
        text: String,
        /// Underlying semver error.
        source: semver::Error,
    },

    /// Requested build metadata was rejected by the grammar.
    #[error("invalid build metadata '{text}': {source}")]
    Metadata {
        /// The rejected metadata.
        text: String,
        /// Underlying semver error.
        source: semver::Error,
    },

    /// A numeric component is already at its maximum.
    #[error("cannot bump {level} of '{version}': component overflows")]
    Overflow {
        /// The version being bumped.
        version: String,
        /// The requested level.
        level: BumpLevel,
    },

    /// A git query failed while gathering tags or commits.
    #[error("git error: {0}")]
    Git(#[from] crate::git::GitError),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Numeric bump level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// How prerelease versions are produced.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PrereleaseMode {
    /// Never evolve prereleases from commits; an explicit prerelease is attached verbatim.
    #[default]
    Off,
    /// Evolve a prerelease when commits signal one (scope or body).
    Auto,
    /// Every run produces the next prerelease.
    Always,
}

/// A semantic version with an optional literal prefix such as `v`.
///
/// The prefix is everything before the first ASCII digit. The remainder is
/// parsed with [`semver::Version`], so `raw()` always parses back to the
/// same numeric fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    prefix: String,
    semver: semver::Version,
}

impl Version {
    /// The zero value used when a repository has no version tags.
    pub const fn zero() -> Self {
        Self {
            prefix: String::new(),
            semver: semver::Version::new(0, 0, 0),
        }
    }

    /// Parse version text, splitting off any leading non-digit prefix.
    pub fn parse(text: &str) -> VersionResult<Self> {
        let trimmed = text.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| VersionError::MissingNumber(text.to_string()))?;
        let (prefix, rest) = trimmed.split_at(split);
        let semver = semver::Version::parse(rest).map_err(|source| VersionError::Parse {
            text: text.to_string(),
            source,
        })?;
        Ok(Self {
            prefix: prefix.to_string(),
            semver,
        })
    }

    /// Major component.
    pub const fn major(&self) -> u64 {
        self.semver.major
    }

    /// Minor component.
    pub const fn minor(&self) -> u64 {
        self.semver.minor
    }

    /// Patch component.
    pub const fn patch(&self) -> u64 {
        self.semver.patch
    }

    /// The `X.Y.Z` triple, ignoring prerelease and metadata.
    pub const fn triple(&self) -> (u64, u64, u64) {
        (self.semver.major, self.semver.minor, self.semver.patch)
    }

    /// Prerelease text without the leading dash (empty when absent).
    pub fn prerelease(&self) -> &str {
        self.semver.pre.as_str()
    }

    /// Build metadata without the leading plus (empty when absent).
    pub fn metadata(&self) -> &str {
        self.semver.build.as_str()
    }

    /// The literal prefix (empty when absent).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The version without its prefix.
    pub const fn semver(&self) -> &semver::Version {
        &self.semver
    }

    /// Canonical text: prefix followed by the semver rendering.
    pub fn raw(&self) -> String {
        self.to_string()
    }

    /// Whether the numeric triple is exactly `0.0.0`.
    pub const fn is_zero_triple(&self) -> bool {
        self.semver.major == 0 && self.semver.minor == 0 && self.semver.patch == 0
    }

    /// Remove a leading `v` from the prefix, if present.
    pub fn strip_v_prefix(&mut self) {
        if let Some(rest) = self.prefix.strip_prefix('v') {
            self.prefix = rest.to_string();
        }
    }

    /// Drop prerelease and build metadata.
    pub fn clear_suffixes(&mut self) {
        self.semver.pre = semver::Prerelease::EMPTY;
        self.semver.build = semver::BuildMetadata::EMPTY;
    }

    /// Drop build metadata only.
    pub fn clear_metadata(&mut self) {
        self.semver.build = semver::BuildMetadata::EMPTY;
    }

    /// Replace the prerelease, validating it against the grammar.
    pub fn set_prerelease(&mut self, prerelease: &str) -> VersionResult<()> {
        self.semver.pre =
            semver::Prerelease::new(prerelease).map_err(|source| VersionError::Prerelease {
                text: prerelease.to_string(),
                source,
            })?;
        Ok(())
    }

    /// Replace the build metadata, validating it against the grammar.
    pub fn set_metadata(&mut self, metadata: &str) -> VersionResult<()> {
        self.semver.build =
            semver::BuildMetadata::new(metadata).map_err(|source| VersionError::Metadata {
                text: metadata.to_string(),
                source,
            })?;
        Ok(())
    }

    /// Apply a numeric bump. The result carries no prerelease or metadata.
    pub fn bumped(&self, level: BumpLevel) -> VersionResult<Self> {
        let semver = next_version(&self.semver, level).ok_or_else(|| VersionError::Overflow {
            version: self.to_string(),
            level,
        })?;
        Ok(Self {
            prefix: self.prefix.clone(),
            semver,
        })
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.semver)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Compute the next plain semver by applying a bump level.
///
/// Returns `None` when the bumped component would overflow.
pub fn next_version(current: &semver::Version, level: BumpLevel) -> Option<semver::Version> {
    let next = match level {
        BumpLevel::Patch => {
            semver::Version::new(current.major, current.minor, current.patch.checked_add(1)?)
        }
        BumpLevel::Minor => semver::Version::new(current.major, current.minor.checked_add(1)?, 0),
        BumpLevel::Major => semver::Version::new(current.major.checked_add(1)?, 0, 0),
    };
    Some(next)
}
