use thiserror::Error;

/// Errors that can occur while running the release monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Error making an HTTP request to the release feed.
    #[error("Failed to fetch releases from the feed: {0}")]
    Http(#[from] reqwest::Error),

    /// The release feed returned an error status.
    #[error("Release feed error: {status} - {message}")]
    FeedApi { status: u16, message: String },

    /// The release feed returned no releases at all.
    #[error("Release feed returned no releases")]
    EmptyFeed,

    /// A fetched payload has no usable version identifier.
    #[error("Release payload is missing a usable version identifier")]
    MissingVersion,

    /// Error serializing or parsing JSON.
    #[error("Failed to encode or parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Persisting monitor state failed. This is the only error that makes
    /// a run fail hard: losing the state write means the same event would
    /// be re-reported on every subsequent run.
    #[error("Failed to persist monitor state: {0}")]
    StateSave(#[from] std::io::Error),

    /// The push endpoint rejected a notification.
    #[error("Push endpoint rejected the notification with status {0}")]
    PushRejected(u16),

    /// Invalid ntfy topic name.
    #[error("Invalid ntfy topic: '{0}'")]
    InvalidTopic(String),

    /// Invalid feed or push endpoint URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
