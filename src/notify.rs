use std::time::Duration;

use chrono::Utc;
use log::warn;
use reqwest::Client;

use crate::error::MonitorError;
use crate::types::{ReleaseRecord, RetryPolicy};

/// Maximum length of a rendered highlight line before truncation.
const HIGHLIGHT_MAX_LEN: usize = 80;

/// Timeout for a single delivery attempt.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// The kind of event a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    FirstRun,
    NewVersion,
    ContentUpdate,
    Error,
    Test,
}

impl EventKind {
    /// Fixed ntfy priority for this kind. Errors are maximally urgent, new
    /// releases high, everything else normal.
    pub fn priority(&self) -> u8 {
        match self {
            EventKind::Error => 5,
            EventKind::NewVersion => 4,
            EventKind::FirstRun | EventKind::ContentUpdate | EventKind::Test => 3,
        }
    }

    /// Kind-specific notification tag.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::FirstRun => "first-run",
            EventKind::NewVersion => "new-release",
            EventKind::ContentUpdate => "content-update",
            EventKind::Error => "error",
            EventKind::Test => "test",
        }
    }
}

/// A fully rendered notification, ready for delivery. Transient; never
/// persisted.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub record: Option<ReleaseRecord>,
    pub title: String,
    pub message: String,
    pub priority: u8,
    pub tags: Vec<String>,
}

impl NotificationEvent {
    /// Renders a notification for a classified release change.
    pub fn for_change(kind: EventKind, record: ReleaseRecord, project: &str) -> Self {
        let (title, message) = match kind {
            EventKind::FirstRun => (
                format!("Monitoring {project} releases"),
                format!(
                    "Baseline established at {}\n🔗 {}\n⏰ {}",
                    record.version,
                    record.url,
                    now_stamp()
                ),
            ),
            EventKind::NewVersion => (
                format!("New {project} release: {}", record.version),
                render_new_version(&record),
            ),
            EventKind::ContentUpdate => (
                format!("{project} release notes updated"),
                format!(
                    "Release notes for {} were updated\n🔗 {}\n⏰ {}",
                    record.version,
                    record.url,
                    now_stamp()
                ),
            ),
            // Error and Test events carry no record; use the dedicated
            // constructors instead.
            EventKind::Error | EventKind::Test => unreachable!("kind carries no record"),
        };

        Self {
            priority: kind.priority(),
            tags: tags_for(kind, project),
            kind,
            record: Some(record),
            title,
            message,
        }
    }

    /// Renders an error notification from a failure description.
    pub fn for_error(description: &str, project: &str) -> Self {
        Self {
            kind: EventKind::Error,
            record: None,
            title: format!("{project} monitor error"),
            message: format!("{description}\n⏰ {}", now_stamp()),
            priority: EventKind::Error.priority(),
            tags: tags_for(EventKind::Error, project),
        }
    }

    /// Renders a manual test notification.
    pub fn test(project: &str) -> Self {
        Self {
            kind: EventKind::Test,
            record: None,
            title: format!("{project} monitor test"),
            message: format!("Test from the {project} release monitor\n⏰ {}", now_stamp()),
            priority: EventKind::Test.priority(),
            tags: tags_for(EventKind::Test, project),
        }
    }
}

fn tags_for(kind: EventKind, project: &str) -> Vec<String> {
    vec![project.to_string(), kind.tag().to_string()]
}

fn now_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M UTC").to_string()
}

fn render_new_version(record: &ReleaseRecord) -> String {
    let mut message = format!("🎉 New release: {}", record.version);

    if let Some(published_at) = record.published_at {
        message.push_str(&format!("\n📅 {}", published_at.format("%Y-%m-%d")));
    }

    let highlights = highlights(&record.body);
    if !highlights.is_empty() {
        message.push_str("\n\n🔍 Highlights:\n");
        message.push_str(&highlights.join("\n"));
    }

    message.push_str(&format!("\n\n🔗 {}\n⏰ {}", record.url, now_stamp()));
    message
}

/// Picks up to two substantive lines from the release notes, truncated to a
/// notification-friendly length.
fn highlights(body: &str) -> Vec<String> {
    body.lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|line| line.len() > 10)
        .take(2)
        .map(|line| {
            if line.len() > HIGHLIGHT_MAX_LEN {
                let cut: String = line.chars().take(HIGHLIGHT_MAX_LEN - 3).collect();
                format!("• {cut}...")
            } else {
                format!("• {line}")
            }
        })
        .collect()
}

/// Result of a delivery attempt sequence.
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub success: bool,
    pub attempts_used: u32,
    pub last_error: Option<String>,
}

impl DeliveryResult {
    /// Delivery was short-circuited (notifications disabled); reported as
    /// success without touching the network.
    pub fn skipped() -> Self {
        Self {
            success: true,
            attempts_used: 0,
            last_error: None,
        }
    }
}

/// Delivers rendered notifications to an ntfy topic with bounded retries.
pub struct Notifier {
    client: Client,
    topic: String,
    base_url: String,
    retry: RetryPolicy,
}

impl Notifier {
    pub fn new(
        client: Client,
        topic: impl Into<String>,
        base_url: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            topic: topic.into(),
            base_url: base_url.into(),
            retry,
        }
    }

    /// Publishes the event to the configured topic. Failed attempts are
    /// retried with bounded exponential backoff; ultimate failure is
    /// reported in the result rather than as an error so a delivery problem
    /// can never block state persistence.
    pub async fn send(&self, event: &NotificationEvent) -> DeliveryResult {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), self.topic);

        let mut last_error = None;
        for attempt in 1..=self.retry.attempts {
            match self.post(&url, event).await {
                Ok(()) => {
                    return DeliveryResult {
                        success: true,
                        attempts_used: attempt,
                        last_error: None,
                    };
                }
                Err(err) => {
                    warn!(
                        "Notification attempt {attempt}/{} failed: {err}",
                        self.retry.attempts
                    );
                    last_error = Some(err.to_string());
                    if attempt < self.retry.attempts {
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    }
                }
            }
        }

        DeliveryResult {
            success: false,
            attempts_used: self.retry.attempts,
            last_error,
        }
    }

    async fn post(&self, url: &str, event: &NotificationEvent) -> crate::error::Result<()> {
        let response = self
            .client
            .post(url)
            .header("X-Title", &event.title)
            .header("X-Priority", event.priority.to_string())
            .header("X-Tags", event.tags.join(","))
            .timeout(DELIVERY_TIMEOUT)
            .body(event.message.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MonitorError::PushRejected(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(version: &str, body: &str) -> ReleaseRecord {
        ReleaseRecord {
            version: version.to_string(),
            published_at: None,
            title: version.to_string(),
            body: body.to_string(),
            url: "https://docs.n8n.io/release-notes".to_string(),
        }
    }

    #[test]
    fn test_priority_policy() {
        assert_eq!(EventKind::Error.priority(), 5);
        assert_eq!(EventKind::NewVersion.priority(), 4);
        assert_eq!(EventKind::FirstRun.priority(), 3);
        assert_eq!(EventKind::ContentUpdate.priority(), 3);
        assert_eq!(EventKind::Test.priority(), 3);
    }

    #[test]
    fn test_new_version_event() {
        let event = NotificationEvent::for_change(
            EventKind::NewVersion,
            record("n8n@1.104.2", "Added a thing that matters\nFixed another thing"),
            "n8n",
        );

        assert_eq!(event.priority, 4);
        assert_eq!(event.tags, vec!["n8n", "new-release"]);
        assert!(event.title.contains("n8n@1.104.2"));
        assert!(event.message.contains("Added a thing that matters"));
        assert!(event.message.contains("https://docs.n8n.io/release-notes"));
    }

    #[test]
    fn test_content_update_event() {
        let event = NotificationEvent::for_change(
            EventKind::ContentUpdate,
            record("n8n@1.104.2", "new"),
            "n8n",
        );

        assert_eq!(event.priority, 3);
        assert_eq!(event.tags, vec!["n8n", "content-update"]);
        assert!(event.message.contains("n8n@1.104.2"));
    }

    #[test]
    fn test_error_event_renders_description() {
        let event = NotificationEvent::for_error("Failed to fetch releases", "n8n");

        assert_eq!(event.priority, 5);
        assert_eq!(event.tags, vec!["n8n", "error"]);
        assert!(event.record.is_none());
        assert!(event.message.contains("Failed to fetch releases"));
    }

    #[test]
    fn test_highlights_truncate_long_lines() {
        let long = "x".repeat(200);
        let body = format!("- {long}\n- short\n- a second substantive line here");
        let lines = highlights(&body);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("..."));
        assert!(lines[0].chars().count() <= HIGHLIGHT_MAX_LEN + 2);
        assert_eq!(lines[1], "• a second substantive line here");
    }

    #[test]
    fn test_highlights_of_empty_body() {
        assert!(highlights("").is_empty());
    }

    #[test]
    fn test_skipped_delivery_reports_success() {
        let result = DeliveryResult::skipped();
        assert!(result.success);
        assert_eq!(result.attempts_used, 0);
        assert!(result.last_error.is_none());
    }
}
