//! # relwatch
//!
//! A library for monitoring an upstream project's release feed and pushing
//! ntfy notifications when something meaningfully new appears.
//!
//! Each run fetches the feed, classifies the most recent release(s) against
//! persisted state (first run, new version, edited notes, or no change),
//! delivers a prioritized notification with bounded retries, and atomically
//! persists the latest release plus a rolling history.
//!
//! ## Example
//!
//! ```no_run
//! use relwatch::{Monitor, MonitorConfig, RunOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MonitorConfig::new(
//!         "n8n",
//!         "my-notifications",
//!         "https://api.github.com/repos/n8n-io/n8n/releases",
//!     )
//!     .data_dir("data");
//!
//!     let monitor = Monitor::new(config)?;
//!
//!     match monitor.run_single_check(true).await? {
//!         RunOutcome::NoChange => println!("No changes"),
//!         RunOutcome::Changed(reports) => {
//!             for report in reports {
//!                 println!("Notified: {}", report.event.title);
//!             }
//!         }
//!         RunOutcome::FeedError { message, .. } => eprintln!("Feed error: {message}"),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod detect;
mod error;
mod monitor;
mod notify;
mod state;
mod types;

pub use detect::{classify, Change};
pub use error::{MonitorError, Result};
pub use monitor::{ChangeReport, Monitor, RunOutcome};
pub use notify::{DeliveryResult, EventKind, NotificationEvent};
pub use state::StateStore;
pub use types::{MonitorConfig, MonitorState, RawRelease, ReleaseRecord, RetryPolicy, MAX_HISTORY};
