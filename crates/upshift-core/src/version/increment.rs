//! The increment lattice.

use std::fmt;

use serde::Serialize;

use super::{BumpLevel, PrereleaseMode};

/// How much a version moves.
///
/// Variants are declared in ascending order, so the derived `Ord` gives
/// `None < Patch < PrePatch < Minor < PreMinor < Major < PreMajor < PreRelease`.
/// Each prerelease-flavored variant outranks its numeric counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Increment {
    /// Nothing releasable.
    #[default]
    None,
    /// Bump the patch number.
    Patch,
    /// Bump the patch number and attach a prerelease.
    PrePatch,
    /// Bump the minor number.
    Minor,
    /// Bump the minor number and attach a prerelease.
    PreMinor,
    /// Bump the major number.
    Major,
    /// Bump the major number and attach a prerelease.
    PreMajor,
    /// Evolve the prerelease counter without touching `X.Y.Z`.
    PreRelease,
}

impl Increment {
    /// The numeric component, if any.
    pub const fn level(self) -> Option<BumpLevel> {
        match self {
            Self::Patch | Self::PrePatch => Some(BumpLevel::Patch),
            Self::Minor | Self::PreMinor => Some(BumpLevel::Minor),
            Self::Major | Self::PreMajor => Some(BumpLevel::Major),
            Self::None | Self::PreRelease => None,
        }
    }

    /// Whether this increment produces a prerelease.
    pub const fn is_prerelease(self) -> bool {
        matches!(
            self,
            Self::PrePatch | Self::PreMinor | Self::PreMajor | Self::PreRelease
        )
    }

    /// The prerelease-flavored counterpart of a numeric increment.
    ///
    /// `None` and already-flavored increments are returned unchanged.
    pub const fn flavored(self) -> Self {
        match self {
            Self::Patch => Self::PrePatch,
            Self::Minor => Self::PreMinor,
            Self::Major => Self::PreMajor,
            other => other,
        }
    }

    /// Flavor a numeric increment when the mode keeps a prerelease train going.
    ///
    /// Under [`PrereleaseMode::Auto`], a version that already carries a
    /// prerelease stays on the prerelease track.
    pub const fn for_mode(self, mode: PrereleaseMode, on_prerelease: bool) -> Self {
        match mode {
            PrereleaseMode::Auto if on_prerelease => self.flavored(),
            _ => self,
        }
    }
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Patch => "patch",
            Self::PrePatch => "prepatch",
            Self::Minor => "minor",
            Self::PreMinor => "preminor",
            Self::Major => "major",
            Self::PreMajor => "premajor",
            Self::PreRelease => "prerelease",
        };
        f.write_str(name)
    }
}
