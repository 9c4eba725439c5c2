use crate::types::ReleaseRecord;

/// Classification of a freshly fetched release against the stored latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// No prior state existed; this run establishes the baseline.
    FirstRun,
    /// The version identifier differs from the stored latest.
    NewVersion,
    /// Same version, but the title or body was edited after publishing.
    ContentUpdate,
    /// Nothing meaningful differs from the stored latest.
    NoChange,
}

/// Classifies `current` relative to `previous`.
///
/// Version comparison is exact string equality; no semantic version ordering
/// is attempted, so a lexicographically "lower" version appearing in the feed
/// is still a [`Change::NewVersion`]. Title and body are compared literally.
pub fn classify(previous: Option<&ReleaseRecord>, current: &ReleaseRecord) -> Change {
    let Some(previous) = previous else {
        return Change::FirstRun;
    };

    if current.version != previous.version {
        return Change::NewVersion;
    }

    if current.body != previous.body || current.title != previous.title {
        return Change::ContentUpdate;
    }

    Change::NoChange
}
