//! Folding classified commits into one increment.

use tracing::debug;

use super::classify::Classifier;
use super::{Increment, PrereleaseMode};

/// Reduce a commit list to its dominant increment.
///
/// - [`PrereleaseMode::Always`] returns [`Increment::PreRelease`] without
///   looking at the messages.
/// - The first breaking commit without prerelease context returns
///   [`Increment::Major`] on the spot. A breaking commit that does carry
///   prerelease context is accumulated like any other.
/// - Under [`PrereleaseMode::Auto`], any commit with prerelease context
///   forces [`Increment::PreRelease`] once the list is exhausted.
pub fn aggregate<'a, I>(classifier: &Classifier, mode: PrereleaseMode, messages: I) -> Increment
where
    I: IntoIterator<Item = &'a str>,
{
    if mode == PrereleaseMode::Always {
        return Increment::PreRelease;
    }

    let mut highest = Increment::None;
    let mut prerelease = false;

    for message in messages {
        let classification = classifier.classify(message, mode);
        if classification.breaking && !classification.prerelease_context {
            debug!(commit_type = ?classification.commit_type, "breaking change");
            return Increment::Major;
        }
        prerelease |= classification.prerelease_context;
        highest = highest.max(classification.increment);
    }

    if prerelease {
        debug!(%highest, "prerelease context found");
        return Increment::PreRelease;
    }
    highest
}
