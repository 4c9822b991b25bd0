//! Append-only scan store.
//!
//! Every scan is persisted as its own `<id>.json` file in the store
//! directory, written to a temp path and renamed into place so a record is
//! either fully present or absent. Ids are ULIDs, so file names sort in
//! insertion order and never collide. Records are immutable and never
//! deleted.
//!
//! Reads are forgiving: a missing directory or an unreadable record logs a
//! warning and is treated as absent, and the next append heals the store.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::{convert::Infallible, fmt::Display, ops::Deref};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::scorer::{MatchReport, MatchResult};

/// Identifier of one persisted scan (a ULID in string form).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct ScanId(String);

impl Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScanId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ScanId(s.to_string()))
    }
}

impl Deref for ScanId {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for ScanId {
    fn from(fr: &str) -> Self {
        ScanId(fr.to_string())
    }
}

impl From<String> for ScanId {
    fn from(fr: String) -> Self {
        ScanId(fr)
    }
}

impl From<ScanId> for String {
    fn from(fr: ScanId) -> Self {
        fr.0
    }
}

impl ScanId {
    #[inline]
    pub fn new() -> ScanId {
        ScanId(Ulid::new().to_string())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk content of one scan record. The id is the file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScan {
    pub username: String,
    pub result: MatchReport,
}

/// One row of a user's scan history.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub id: ScanId,
    pub document_name: String,
    pub result: MatchReport,
}

/// Errors that can occur when appending to the store.
#[derive(Debug, thiserror::Error)]
pub enum ScanStoreError {
    #[error("Scan store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan record serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// File-backed scan store, one JSON file per record.
pub struct ScanStore {
    dir: PathBuf,
    /// Monotonic within the process, so same-millisecond appends keep order
    ids: Mutex<ulid::Generator>,
}

impl ScanStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            ids: Mutex::new(ulid::Generator::new()),
        })
    }

    /// Persist one scan under a freshly generated id and return the id.
    pub fn append(&self, username: &str, result: &MatchReport) -> Result<ScanId, ScanStoreError> {
        let id = self.next_id()?;
        let record = StoredScan {
            username: username.to_string(),
            result: result.clone(),
        };
        let data = serde_json::to_vec_pretty(&record)?;

        // The store directory may have been removed behind our back
        std::fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(format!("{id}.json"));
        let temp_path = self.dir.join(format!(".{id}.json.tmp"));
        std::fs::write(&temp_path, &data)?;
        std::fs::rename(&temp_path, &path)?;

        Ok(id)
    }

    /// All matches of this user's scans, flattened, in insertion order.
    pub fn list_by_username(&self, username: &str) -> Vec<MatchResult> {
        self.read_all()
            .into_iter()
            .filter(|(_, scan)| scan.username == username)
            .flat_map(|(_, scan)| scan.result.matches)
            .collect()
    }

    /// Per-scan summaries for one user, in insertion order.
    pub fn history(&self, username: &str) -> Vec<ScanSummary> {
        self.read_all()
            .into_iter()
            .filter(|(_, scan)| scan.username == username)
            .map(|(id, scan)| ScanSummary {
                id,
                document_name: scan.result.best_document_name().to_string(),
                result: scan.result,
            })
            .collect()
    }

    /// Number of records in the store (all users).
    pub fn len(&self) -> usize {
        self.record_paths().len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_paths().is_empty()
    }

    fn next_id(&self) -> Result<ScanId, ScanStoreError> {
        let mut ids = self
            .ids
            .lock()
            .map_err(|e| ScanStoreError::Internal(format!("id generator lock poisoned: {e}")))?;
        // generate() only fails on same-millisecond overflow; a random ULID
        // is still unique then
        let ulid = ids.generate().unwrap_or_else(|_| Ulid::new());
        Ok(ScanId(ulid.to_string()))
    }

    /// Paths of all record files, sorted by id (insertion order).
    fn record_paths(&self) -> Vec<(ScanId, PathBuf)> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Scan store {} is unreadable: {e}", self.dir.display());
                return Vec::new();
            }
        };

        let mut paths: Vec<(ScanId, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                // Only well-formed ids count as records
                let ulid = Ulid::from_string(stem).ok()?;
                Some((ScanId(ulid.to_string()), path))
            })
            .collect();

        paths.sort_by(|a, b| a.0.cmp(&b.0));
        paths
    }

    fn read_all(&self) -> Vec<(ScanId, StoredScan)> {
        self.record_paths()
            .into_iter()
            .filter_map(|(id, path)| {
                let data = match std::fs::read(&path) {
                    Ok(data) => data,
                    Err(e) => {
                        log::warn!("Skipping unreadable scan record {}: {e}", path.display());
                        return None;
                    }
                };
                match serde_json::from_slice::<StoredScan>(&data) {
                    Ok(scan) => Some((id, scan)),
                    Err(e) => {
                        log::warn!("Skipping corrupt scan record {}: {e}", path.display());
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_for(name: &str) -> MatchResult {
        MatchResult {
            document_name: name.to_string(),
            similarity_score: "90.00%".to_string(),
            document_excerpt: format!("excerpt of {name}"),
            insight: format!("The document '{name}' is 90.00% similar to the query text."),
        }
    }

    fn report_for(names: &[&str]) -> MatchReport {
        MatchReport {
            matches: names.iter().map(|n| match_for(n)).collect(),
            error: None,
        }
    }

    #[test]
    fn test_scan_id_is_26_chars() {
        let id = ScanId::new();
        assert_eq!(id.len(), 26);
    }

    #[test]
    fn test_append_then_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();

        store.append("alice", &report_for(&["a.txt", "b.txt"])).unwrap();
        store.append("alice", &report_for(&["c.txt"])).unwrap();

        let matches = store.list_by_username("alice");
        let names: Vec<&str> = matches.iter().map(|m| m.document_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_interleaved_users_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();

        store.append("alice", &report_for(&["a1"])).unwrap();
        store.append("bob", &report_for(&["b1"])).unwrap();
        store.append("alice", &report_for(&["a2"])).unwrap();
        store.append("bob", &report_for(&["b2", "b3"])).unwrap();

        let alice: Vec<String> = store
            .list_by_username("alice")
            .into_iter()
            .map(|m| m.document_name)
            .collect();
        let bob: Vec<String> = store
            .list_by_username("bob")
            .into_iter()
            .map(|m| m.document_name)
            .collect();

        assert_eq!(alice, vec!["a1", "a2"]);
        assert_eq!(bob, vec!["b1", "b2", "b3"]);
        assert!(store.list_by_username("carol").is_empty());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_same_millisecond_appends_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();

        for i in 0..20 {
            let name = format!("doc{i:02}");
            store.append("alice", &report_for(&[name.as_str()])).unwrap();
        }

        let names: Vec<String> = store
            .list_by_username("alice")
            .into_iter()
            .map(|m| m.document_name)
            .collect();
        let expected: Vec<String> = (0..20).map(|i| format!("doc{i:02}")).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_corrupt_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();

        let good = store.append("alice", &report_for(&["ok.txt"])).unwrap();
        // Well-formed id, broken payload
        std::fs::write(dir.path().join(format!("{}.json", ScanId::new())), b"{not json").unwrap();
        // Stray file that is not a record at all
        std::fs::write(dir.path().join("notes.json"), b"{}").unwrap();

        let matches = store.list_by_username("alice");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document_name, "ok.txt");
        assert!(store.record_paths().iter().any(|(id, _)| id == &good));
    }

    #[test]
    fn test_missing_dir_reads_empty_and_append_heals() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("scans");
        let store = ScanStore::open(&store_dir).unwrap();

        std::fs::remove_dir_all(&store_dir).unwrap();
        assert!(store.list_by_username("alice").is_empty());

        store.append("alice", &report_for(&["back.txt"])).unwrap();
        assert_eq!(store.list_by_username("alice").len(), 1);
    }

    #[test]
    fn test_empty_report_record_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();

        let id = store.append("alice", &MatchReport::empty_corpus()).unwrap();

        // Contributes no matches but exists as a record
        assert!(store.list_by_username("alice").is_empty());
        assert_eq!(store.len(), 1);

        let raw = std::fs::read_to_string(dir.path().join(format!("{id}.json"))).unwrap();
        assert!(raw.contains("No reference documents available."));
        assert!(raw.contains("\"username\""));
    }

    #[test]
    fn test_history_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();

        store.append("alice", &report_for(&["best.txt", "second.txt"])).unwrap();
        store.append("alice", &MatchReport::empty_corpus()).unwrap();

        let history = store.history("alice");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].document_name, "best.txt");
        assert_eq!(history[1].document_name, "Unknown Document");
        assert!(history[0].id < history[1].id);
    }

    #[test]
    fn test_stored_shape_field_for_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::open(dir.path()).unwrap();

        let id = store.append("alice", &report_for(&["doc.txt"])).unwrap();
        let raw = std::fs::read(dir.path().join(format!("{id}.json"))).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();

        assert_eq!(value["username"], "alice");
        let entry = &value["result"]["matches"][0];
        assert_eq!(entry["document_name"], "doc.txt");
        assert_eq!(entry["similarity_score"], "90.00%");
        assert!(entry["document_excerpt"].is_string());
        assert!(entry["insight"].is_string());
        // No error key on a normal record
        assert!(value["result"].get("error").is_none());
    }
}
