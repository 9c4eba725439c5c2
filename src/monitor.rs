use std::time::Duration;

use log::{error, info};
use reqwest::Client;
use url::Url;

use crate::detect::{classify, Change};
use crate::error::{MonitorError, Result};
use crate::notify::{DeliveryResult, EventKind, NotificationEvent, Notifier};
use crate::state::StateStore;
use crate::types::{MonitorConfig, RawRelease, ReleaseRecord};

/// Timeout for a single feed fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum length for an ntfy topic name.
/// This limit is enforced by the ntfy server.
const MAX_TOPIC_LENGTH: usize = 64;

/// One classified change and the outcome of notifying about it.
#[derive(Debug)]
pub struct ChangeReport {
    pub event: NotificationEvent,
    pub delivery: DeliveryResult,
}

/// Outcome of a monitor run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The feed matched stored state; nothing was notified or written.
    NoChange,
    /// One or more changes were detected, notified, and persisted.
    Changed(Vec<ChangeReport>),
    /// Fetching or normalizing the feed failed; stored state was left
    /// untouched and a best-effort error notification was attempted.
    FeedError {
        message: String,
        delivery: DeliveryResult,
    },
}

/// The monitor orchestrator: fetch, classify, notify, persist.
pub struct Monitor {
    config: MonitorConfig,
    client: Client,
    store: StateStore,
    notifier: Notifier,
}

impl Monitor {
    /// Creates a new Monitor with the given configuration.
    ///
    /// Validates the topic name and the feed and push endpoint URLs up
    /// front so a misconfigured deployment fails at startup rather than
    /// mid-run.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        if !is_valid_topic(&config.topic) {
            return Err(MonitorError::InvalidTopic(config.topic.clone()));
        }
        if Url::parse(&config.feed_url).is_err() {
            return Err(MonitorError::InvalidUrl(config.feed_url.clone()));
        }
        if Url::parse(&config.ntfy_base_url).is_err() {
            return Err(MonitorError::InvalidUrl(config.ntfy_base_url.clone()));
        }

        let client = Client::new();
        let store = StateStore::new(&config.data_dir);
        let notifier = Notifier::new(
            client.clone(),
            &config.topic,
            &config.ntfy_base_url,
            config.retry.clone(),
        );

        Ok(Self {
            config,
            client,
            store,
            notifier,
        })
    }

    /// Sends a manual test notification to the configured topic.
    pub async fn send_test_notification(&self) -> DeliveryResult {
        let event = NotificationEvent::test(&self.config.project);
        self.notifier.send(&event).await
    }

    /// Performs one check against the most recent release in the feed.
    pub async fn run_single_check(&self, notify: bool) -> Result<RunOutcome> {
        self.run_multi_check(1, notify).await
    }

    /// Performs one check against up to `limit` recent releases, oldest
    /// first, so a run that catches up after downtime produces one event
    /// per missed release.
    ///
    /// Notifications are attempted before state is persisted, but state is
    /// persisted regardless of delivery outcome; the store, not the push
    /// endpoint, is the source of truth for "have we seen this".
    pub async fn run_multi_check(&self, limit: usize, notify: bool) -> Result<RunOutcome> {
        let mut state = self.store.load();

        let records = match self.fetch_records(limit).await {
            Ok(records) => records,
            Err(err) => return Ok(self.report_feed_error(err, notify).await),
        };

        // The feed is newest-first. If the stored latest is inside the
        // fetched window, everything at or below it has already been seen;
        // keep the newer entries plus the latest itself so an edit to its
        // notes is still caught. If the latest is not in the window (or no
        // state exists yet) every fetched record is classified.
        let cutoff = state
            .latest
            .as_ref()
            .and_then(|latest| records.iter().position(|r| r.version == latest.version));
        let relevant: Vec<ReleaseRecord> = match cutoff {
            Some(idx) => records.into_iter().take(idx + 1).collect(),
            None => records,
        };

        let mut events = Vec::new();
        for record in relevant.into_iter().rev() {
            let change = classify(state.latest.as_ref(), &record);
            let kind = match change {
                Change::FirstRun => EventKind::FirstRun,
                Change::NewVersion => EventKind::NewVersion,
                Change::ContentUpdate => EventKind::ContentUpdate,
                Change::NoChange => continue,
            };
            info!("Detected {:?} for {}", kind, record.version);
            events.push(NotificationEvent::for_change(
                kind,
                record.clone(),
                &self.config.project,
            ));
            state.apply(record);
        }

        if events.is_empty() {
            info!("No changes detected");
            return Ok(RunOutcome::NoChange);
        }

        let mut reports = Vec::with_capacity(events.len());
        for event in events {
            let delivery = if notify {
                self.notifier.send(&event).await
            } else {
                DeliveryResult::skipped()
            };
            reports.push(ChangeReport { event, delivery });
        }

        // A failed delivery must not stop this write, otherwise the same
        // event would be re-notified on every run.
        self.store.save(&state)?;

        Ok(RunOutcome::Changed(reports))
    }

    /// Fetches and normalizes up to `limit` releases, newest first.
    async fn fetch_records(&self, limit: usize) -> Result<Vec<ReleaseRecord>> {
        let response = self
            .client
            .get(&self.config.feed_url)
            .header("Accept", "application/json")
            .header("User-Agent", "relwatch")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(MonitorError::FeedApi { status, message });
        }

        let raw: Vec<RawRelease> = response.json().await?;
        if raw.is_empty() {
            return Err(MonitorError::EmptyFeed);
        }

        raw.into_iter()
            .take(limit)
            .map(ReleaseRecord::try_from)
            .collect()
    }

    async fn report_feed_error(&self, err: MonitorError, notify: bool) -> RunOutcome {
        error!("Run failed before state mutation: {err}");
        let event = NotificationEvent::for_error(&err.to_string(), &self.config.project);
        let delivery = if notify {
            self.notifier.send(&event).await
        } else {
            DeliveryResult::skipped()
        };
        RunOutcome::FeedError {
            message: err.to_string(),
            delivery,
        }
    }
}

/// Validates an ntfy topic name: alphanumerics, hyphens and underscores,
/// up to 64 characters.
fn is_valid_topic(topic: &str) -> bool {
    !topic.is_empty()
        && topic.len() <= MAX_TOPIC_LENGTH
        && topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}
