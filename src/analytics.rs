//! Scan analytics.
//!
//! Aggregates per-scan telemetry into `analytics.json`: scan counts per user,
//! hit counts per document, the last query text per document, and a top-10
//! keyword list recomputed from those texts on every update. Analytics never
//! fail a scan; write errors are logged and dropped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// How many keywords `most_scanned_topics` keeps
const TOP_KEYWORDS: usize = 10;

/// Aggregated analytics state, as serialized to `analytics.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    #[serde(default)]
    pub scans_per_user: BTreeMap<String, u64>,
    #[serde(default)]
    pub most_scanned_documents: BTreeMap<String, u64>,
    #[serde(default)]
    pub document_texts: BTreeMap<String, String>,
    #[serde(default)]
    pub most_scanned_topics: Vec<String>,
}

/// File-backed analytics aggregator.
pub struct Analytics {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the snapshot file
    lock: Mutex<()>,
}

impl Analytics {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Fold one scan into the aggregates.
    ///
    /// `document_name` is the best match of the scan (or the unknown-document
    /// stand-in). Failures are logged, never returned: telemetry must not
    /// break scanning.
    pub fn record_scan(&self, username: &str, query_text: &str, document_name: &str) {
        let Ok(_guard) = self.lock.lock() else {
            log::warn!("Analytics lock poisoned; dropping scan record");
            return;
        };

        let mut snapshot = self.load();
        *snapshot.scans_per_user.entry(username.to_string()).or_insert(0) += 1;
        *snapshot
            .most_scanned_documents
            .entry(document_name.to_string())
            .or_insert(0) += 1;
        snapshot
            .document_texts
            .insert(document_name.to_string(), query_text.to_string());

        let texts: Vec<&str> = snapshot.document_texts.values().map(|s| s.as_str()).collect();
        snapshot.most_scanned_topics = extract_top_keywords(&texts, TOP_KEYWORDS);

        if let Err(e) = self.save(&snapshot) {
            log::warn!("Failed to update scan analytics: {e}");
        }
    }

    /// Current aggregates; a missing or corrupt file reads as empty.
    pub fn snapshot(&self) -> AnalyticsSnapshot {
        let Ok(_guard) = self.lock.lock() else {
            log::warn!("Analytics lock poisoned; returning empty snapshot");
            return AnalyticsSnapshot::default();
        };
        self.load()
    }

    fn load(&self) -> AnalyticsSnapshot {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(_) => return AnalyticsSnapshot::default(),
        };
        match serde_json::from_slice(&data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!(
                    "Analytics file {} is corrupt ({e}); starting fresh",
                    self.path.display()
                );
                AnalyticsSnapshot::default()
            }
        }
    }

    fn save(&self, snapshot: &AnalyticsSnapshot) -> std::io::Result<()> {
        let data = serde_json::to_vec_pretty(snapshot)?;
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &data)?;
        std::fs::rename(&temp_path, &self.path)
    }
}

/// Top keywords across `texts` by summed TF-IDF.
///
/// Term frequencies are L2-normalized per text, multiplied by a smoothed
/// inverse document frequency, summed across texts, and ranked. Ties break
/// alphabetically so the list is deterministic.
fn extract_top_keywords(texts: &[&str], top_n: usize) -> Vec<String> {
    let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();
    let n_texts = tokenized.iter().filter(|t| !t.is_empty()).count();
    if n_texts == 0 {
        return Vec::new();
    }

    // Document frequency per term
    let mut df: BTreeMap<&str, usize> = BTreeMap::new();
    for terms in &tokenized {
        let mut seen: Vec<&str> = Vec::new();
        for term in terms {
            if !seen.contains(&term.as_str()) {
                seen.push(term);
                *df.entry(term).or_insert(0) += 1;
            }
        }
    }

    let idf = |term: &str| -> f64 {
        let df = df.get(term).copied().unwrap_or(0) as f64;
        ((1.0 + n_texts as f64) / (1.0 + df)).ln() + 1.0
    };

    let mut scores: BTreeMap<&str, f64> = BTreeMap::new();
    for terms in &tokenized {
        if terms.is_empty() {
            continue;
        }
        let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
        for term in terms {
            *counts.entry(term).or_insert(0.0) += 1.0;
        }
        let weighted: Vec<(&str, f64)> = counts
            .into_iter()
            .map(|(term, count)| (term, count * idf(term)))
            .collect();
        let norm = weighted
            .iter()
            .map(|(_, w)| w * w)
            .sum::<f64>()
            .sqrt()
            .max(f64::EPSILON);
        for (term, weight) in weighted {
            *scores.entry(term).or_insert(0.0) += weight / norm;
        }
    }

    let mut ranked: Vec<(&str, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked
        .into_iter()
        .take(top_n)
        .map(|(term, _)| term.to_string())
        .collect()
}

/// Tokenize text into lowercase terms.
/// Filters out very short terms (1 char) and common stop words.
fn tokenize(text: &str) -> Vec<String> {
    const STOP_WORDS: &[&str] = &[
        "a", "an", "the", "is", "are", "was", "were", "be", "been", "being",
        "in", "on", "at", "to", "for", "of", "with", "by", "from", "as",
        "and", "or", "but", "not", "no", "so", "if", "then",
    ];

    text.split(|c: char| !c.is_alphanumeric())
        .map(|s| s.to_lowercase())
        .filter(|s| s.len() > 1 && !STOP_WORDS.contains(&s.as_str()))
        .collect()
}
