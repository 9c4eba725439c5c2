use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Maximum number of entries kept in the release history.
pub const MAX_HISTORY: usize = 50;

/// Configuration for the release monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Short name of the monitored project (used in titles and as the base
    /// notification tag, e.g. "n8n").
    pub project: String,
    /// The ntfy topic notifications are published to.
    pub topic: String,
    /// URL of the release feed (a JSON array of releases, newest first).
    pub feed_url: String,
    /// Directory where state files are persisted. Default is "data".
    pub data_dir: PathBuf,
    /// Retry policy for notification delivery.
    pub retry: RetryPolicy,
    /// Base URL of the push endpoint (for testing). Defaults to "https://ntfy.sh".
    pub(crate) ntfy_base_url: String,
}

impl MonitorConfig {
    /// Creates a new config for the given project, topic and feed URL.
    pub fn new(
        project: impl Into<String>,
        topic: impl Into<String>,
        feed_url: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            topic: topic.into(),
            feed_url: feed_url.into(),
            data_dir: PathBuf::from("data"),
            retry: RetryPolicy::default(),
            ntfy_base_url: "https://ntfy.sh".to_string(),
        }
    }

    /// Sets the data directory for persisted state.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets the notification retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets a custom push endpoint base URL (for testing).
    #[doc(hidden)]
    pub fn ntfy_base_url(mut self, url: impl Into<String>) -> Self {
        self.ntfy_base_url = url.into();
        self
    }
}

/// Bounded exponential backoff for notification delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total delivery attempts before giving up.
    pub attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: u32,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Returns the delay to wait after the given 1-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// A canonical release record. Two records describe the same release iff
/// their `version` strings are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// The canonical version identifier (e.g. a tag name like "n8n@1.104.2").
    pub version: String,
    /// When the release was published, if the feed provided it.
    pub published_at: Option<DateTime<Utc>>,
    /// The release title.
    pub title: String,
    /// Free-text release notes. May be empty.
    pub body: String,
    /// Canonical link to the release notes.
    pub url: String,
}

/// Wire shape of a single release as supplied by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRelease {
    pub tag_name: Option<String>,
    pub name: Option<String>,
    pub body: Option<String>,
    pub html_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawRelease> for ReleaseRecord {
    type Error = MonitorError;

    /// Normalizes a raw feed payload, substituting sentinels for missing
    /// optional fields. A payload without a usable version is rejected.
    fn try_from(raw: RawRelease) -> Result<Self, Self::Error> {
        let version = raw
            .tag_name
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(MonitorError::MissingVersion)?;

        let title = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| version.clone());

        Ok(Self {
            version,
            published_at: raw.published_at,
            title,
            body: raw.body.unwrap_or_default(),
            url: raw.html_url.unwrap_or_default(),
        })
    }
}

/// Persisted monitor state: the latest known release and a bounded history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorState {
    /// The latest known release. Absent only before the first successful run.
    pub latest: Option<ReleaseRecord>,
    /// Observed releases, newest first, at most [`MAX_HISTORY`] entries.
    pub history: Vec<ReleaseRecord>,
}

impl MonitorState {
    /// Records a release as the new latest. A content update to the version
    /// already at the head of the history overwrites it in place; a new
    /// version is prepended and the history truncated to its bound.
    pub fn apply(&mut self, record: ReleaseRecord) {
        let same_version = self
            .latest
            .as_ref()
            .is_some_and(|latest| latest.version == record.version);

        if same_version && !self.history.is_empty() {
            self.history[0] = record.clone();
        } else {
            self.history.insert(0, record.clone());
            self.history.truncate(MAX_HISTORY);
        }
        self.latest = Some(record);
    }
}
