//! Conventional-commit classification.
//!
//! A message is classified only when it contains `": "` after a type token
//! of the form `type[(scope)][!]`. Everything else contributes
//! [`Increment::None`].

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{Increment, PrereleaseMode};

/// Identifiers that mark a commit as prerelease work when found in a scope
/// or in the message body.
pub const PRERELEASE_IDENTIFIERS: [&str; 7] =
    ["alpha", "beta", "rc", "dev", "canary", "preview", "snapshot"];

/// Commit types that produce a patch release out of the box.
pub const DEFAULT_PATCH_TYPES: [&str; 3] = ["fix", "perf", "security"];

static TYPE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z][A-Za-z0-9_-]*)(?:\((?P<scope>[^()\r\n]*)\))?(?P<bang>!)?$")
        .expect("Invalid regex")
});

static PRERELEASE_IN_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:alpha|beta|rc|dev|canary|preview|snapshot)\.?\d*")
        .expect("Invalid regex")
});

const BREAKING_MARKERS: [&str; 2] = ["BREAKING CHANGE: ", "BREAKING-CHANGE: "];

/// The set of commit types that map to a patch increment.
///
/// Types are stored lowercased, so lookups are case-insensitive and
/// duplicates collapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchTypes(BTreeSet<String>);

impl PatchTypes {
    /// The defaults plus any extra types.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut types = Self::default();
        types.extend(extra);
        types
    }

    /// Add more types, ignoring blanks.
    pub fn extend<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.0.extend(
            extra
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        );
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, commit_type: &str) -> bool {
        self.0.contains(&commit_type.to_lowercase())
    }

    /// Iterate the configured types in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for PatchTypes {
    fn default() -> Self {
        Self(DEFAULT_PATCH_TYPES.iter().map(|t| (*t).to_string()).collect())
    }
}

/// What a single commit contributes to the next version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// The type token, as written (e.g. `feat`).
    pub commit_type: Option<String>,
    /// The parenthesized scope, if any.
    pub scope: Option<String>,
    /// `!` suffix or a `BREAKING CHANGE: ` marker.
    pub breaking: bool,
    /// The increment this commit asks for on its own.
    pub increment: Increment,
    /// Scope or body signals prerelease work. Only evaluated under Auto mode.
    pub prerelease_context: bool,
}

/// Classifies commit messages.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    patch_types: PatchTypes,
    trim_header: bool,
}

impl Classifier {
    /// Create a classifier for the given patch types.
    pub const fn new(patch_types: PatchTypes) -> Self {
        Self {
            patch_types,
            trim_header: false,
        }
    }

    /// Allow the conventional header to follow leading lines.
    pub const fn with_trim_header(mut self, trim_header: bool) -> Self {
        self.trim_header = trim_header;
        self
    }

    /// The patch types this classifier recognises.
    pub const fn patch_types(&self) -> &PatchTypes {
        &self.patch_types
    }

    /// Classify one message.
    pub fn classify(&self, message: &str, mode: PrereleaseMode) -> Classification {
        let Some(header) = locate_header(message, self.trim_header) else {
            return Classification::default();
        };
        let Some(caps) = TYPE_TOKEN.captures(header.token) else {
            return Classification::default();
        };

        let commit_type = caps["type"].to_string();
        let scope = caps.name("scope").map(|m| m.as_str().to_string());
        let breaking = caps.name("bang").is_some()
            || BREAKING_MARKERS.iter().any(|marker| message.contains(marker));

        let increment = if breaking {
            Increment::Major
        } else if commit_type.eq_ignore_ascii_case("feat") {
            Increment::Minor
        } else if self.patch_types.contains(&commit_type) {
            Increment::Patch
        } else {
            Increment::None
        };

        let prerelease_context = mode == PrereleaseMode::Auto
            && (scope.as_deref().is_some_and(scope_signals_prerelease)
                || body_signals_prerelease(header.body));

        Classification {
            commit_type: Some(commit_type),
            scope,
            breaking,
            increment,
            prerelease_context,
        }
    }
}

/// The message starting at the line that holds the conventional header.
///
/// Leading lines before the header are dropped. Messages without a
/// colon-space are returned unchanged.
pub fn trim_header(message: &str) -> &str {
    message.find(": ").map_or(message, |colon| {
        let start = message[..colon].rfind('\n').map_or(0, |nl| nl + 1);
        &message[start..]
    })
}

struct Header<'a> {
    token: &'a str,
    body: &'a str,
}

fn locate_header(message: &str, trim: bool) -> Option<Header<'_>> {
    let colon = message.find(": ")?;
    let start = if trim {
        message[..colon].rfind('\n').map_or(0, |nl| nl + 1)
    } else {
        0
    };
    let after = &message[colon + 2..];
    let body = after.find('\n').map_or("", |nl| &after[nl + 1..]);
    Some(Header {
        token: message[start..colon].trim_end_matches('\r'),
        body,
    })
}

fn scope_signals_prerelease(scope: &str) -> bool {
    let scope = scope.to_lowercase();
    PRERELEASE_IDENTIFIERS.iter().any(|id| scope.contains(id))
}

fn body_signals_prerelease(body: &str) -> bool {
    if body.is_empty() {
        return false;
    }
    let lower = body.to_lowercase();
    lower.contains("pre-release") || lower.contains("prerelease") || PRERELEASE_IN_BODY.is_match(body)
}
