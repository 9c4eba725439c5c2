use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::types::{MonitorState, ReleaseRecord, MAX_HISTORY};

/// Durable storage for the monitor's latest release and rolling history.
///
/// State lives in two human-inspectable JSON files under the data directory:
/// `latest.json` (the latest known release) and `history.json` (the bounded
/// history list, newest first).
pub struct StateStore {
    data_dir: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn latest_path(&self) -> PathBuf {
        self.data_dir.join("latest.json")
    }

    fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    /// Loads persisted state. Missing files mean a first deployment and
    /// yield an empty state; corrupt or unreadable files are logged and
    /// treated the same way rather than failing the run.
    pub fn load(&self) -> MonitorState {
        let latest: Option<ReleaseRecord> = self.read_json(&self.latest_path());
        let mut history: Vec<ReleaseRecord> =
            self.read_json(&self.history_path()).unwrap_or_default();
        history.truncate(MAX_HISTORY);

        // The latest record, when present, must head the history. Repair the
        // invariant if the two files disagree.
        if let Some(latest) = &latest {
            match history.first() {
                Some(head) if head.version == latest.version => {
                    history[0] = latest.clone();
                }
                _ => {
                    history.insert(0, latest.clone());
                    history.truncate(MAX_HISTORY);
                }
            }
        }

        MonitorState { latest, history }
    }

    /// Persists state. Each file is written to a temporary sibling and
    /// atomically renamed into place so a crash or concurrent reader never
    /// observes a half-written file.
    pub fn save(&self, state: &MonitorState) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;

        let mut history = state.history.clone();
        history.truncate(MAX_HISTORY);
        write_json_atomic(&self.history_path(), &history)?;

        if let Some(latest) = &state.latest {
            write_json_atomic(&self.latest_path(), latest)?;
        }

        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        if !path.exists() {
            return None;
        }
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Could not read state file {}: {err}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "Discarding corrupt state file {}: {err}",
                    path.display()
                );
                None
            }
        }
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
