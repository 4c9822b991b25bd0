//! User activity log.
//!
//! A single JSON array in `activity_logs.json`; each scan appends one entry.
//! Like analytics, the log is best-effort: a corrupt file starts over and
//! write failures only produce a warning.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Action recorded for every completed scan
pub const ACTION_SCANNED: &str = "Scanned Document";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub username: String,
    pub action: String,
    pub details: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

/// File-backed activity log.
pub struct ActivityLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ActivityLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Append one entry, stamped with the current time.
    pub fn record(&self, username: &str, action: &str, details: &str) {
        let Ok(_guard) = self.lock.lock() else {
            log::warn!("Activity log lock poisoned; dropping entry");
            return;
        };

        let mut entries = self.load();
        entries.push(ActivityEntry {
            username: username.to_string(),
            action: action.to_string(),
            details: details.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        });

        if let Err(e) = self.save(&entries) {
            log::warn!("Failed to write activity log: {e}");
        }
    }

    /// All entries, oldest first; missing or corrupt file reads as empty.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        let Ok(_guard) = self.lock.lock() else {
            log::warn!("Activity log lock poisoned; returning no entries");
            return Vec::new();
        };
        self.load()
    }

    fn load(&self) -> Vec<ActivityEntry> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_slice(&data) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(
                    "Activity log {} is corrupt ({e}); starting fresh",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    fn save(&self, entries: &[ActivityEntry]) -> std::io::Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &data)?;
        std::fs::rename(&temp_path, &self.path)
    }
}
