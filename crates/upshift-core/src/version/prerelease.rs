//! Prerelease counter evolution.
//!
//! `alpha < beta < rc`; any other identifier is unordered and only ever
//! compared for equality.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Identifier used when no prerelease target is requested.
pub const DEFAULT_IDENTIFIER: &str = "alpha";

// Accepts `type.number`, `type-number`, `typeNumber` and a bare `type`.
static PRERELEASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>[A-Za-z]+(?:-[A-Za-z]+)*)(?:[.-]?(?P<number>\d+))?$")
        .expect("Invalid regex")
});

/// A prerelease split into its identifier and counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerelease {
    /// The identifier, e.g. `beta`.
    pub kind: String,
    /// The counter, `1` when the text had none.
    pub number: u64,
}

impl Prerelease {
    /// Parse `beta.2`, `beta-2`, `beta2` or `beta`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = PRERELEASE.captures(text)?;
        let number = match caps.name("number") {
            Some(m) => m.as_str().parse().ok()?,
            None => 1,
        };
        Some(Self {
            kind: caps["kind"].to_string(),
            number,
        })
    }

    /// Position in the `alpha < beta < rc` hierarchy.
    pub fn level(&self) -> Option<u8> {
        level(&self.kind)
    }
}

/// Position of a known identifier in the hierarchy.
pub fn level(kind: &str) -> Option<u8> {
    match kind.to_ascii_lowercase().as_str() {
        "alpha" => Some(1),
        "beta" => Some(2),
        "rc" => Some(3),
        _ => None,
    }
}

/// The identifier part of a requested prerelease (`beta.3` → `beta`).
///
/// Text that does not look like `identifier[.number]` is used as-is.
pub fn identifier(requested: &str) -> &str {
    PRERELEASE
        .captures(requested)
        .and_then(|caps| caps.name("kind"))
        .map_or(requested, |m| m.as_str())
}

/// Compute the next prerelease.
///
/// `base_changed` reports whether `X.Y.Z` moved; any movement restarts the
/// counter. The result always has the shape `identifier.N` with `N >= 1`.
pub fn evolve(current: &str, base_changed: bool, target: &str) -> String {
    let fresh = || format!("{target}.1");

    if current.is_empty() || base_changed {
        return fresh();
    }
    let Some(existing) = Prerelease::parse(current) else {
        debug!(%current, "unrecognised prerelease, restarting");
        return fresh();
    };

    let same_kind = existing.kind.eq_ignore_ascii_case(target);
    let next = match (level(target), existing.level()) {
        (None, _) if same_kind => existing.number + 1,
        (None, _) => 1,
        (Some(wanted), Some(have)) if wanted == have => existing.number + 1,
        (Some(_), _) => 1,
    };
    debug!(%current, %target, next, "evolved prerelease");
    format!("{target}.{next}")
}
