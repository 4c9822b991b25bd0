//! Scan engine.
//!
//! Owns the moving parts of the matching pipeline: the encoder, the corpus
//! index behind a reader/writer lock, the scan store, and the telemetry
//! sinks. Searches share the read lock; a reload builds its replacement
//! index entirely outside the write lock and only takes it for the swap, so
//! queries never wait on extraction or embedding.

use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use serde::Serialize;

use crate::activity::{ActivityLog, ACTION_SCANNED};
use crate::analytics::Analytics;
use crate::config::Config;
use crate::corpus::{self, CorpusError, CorpusLoadReport};
use crate::encoder::{EncoderError, TextEncoder};
use crate::index::{CorpusIndex, IndexError};
use crate::scans::{ScanId, ScanStore, ScanStoreError};
use crate::scorer::{self, MatchReport, MatchResult};

/// Errors that can occur during engine operations.
///
/// Only the validation variants are expected in normal use; everything else
/// is an operational failure (dead model, unwritable store).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Query text must not be empty")]
    MissingQueryText,

    #[error("Username must not be empty")]
    MissingUsername,

    #[error("Encoding error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Corpus load error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Scan store error: {0}")]
    Store(#[from] ScanStoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Where the engine finds its directories and tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub corpus_dir: PathBuf,
    pub scans_dir: PathBuf,
    pub analytics_path: PathBuf,
    pub activity_log_path: PathBuf,
    /// Nearest neighbours considered per query
    pub top_k: usize,
    /// Minimum similarity (percent) for a match to be reported
    pub threshold: f32,
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            corpus_dir: config.corpus_path(),
            scans_dir: config.scans_path(),
            analytics_path: config.analytics_path(),
            activity_log_path: config.activity_log_path(),
            top_k: config.matching.top_k,
            threshold: config.matching.similarity_threshold,
        }
    }
}

/// Everything one scan produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    /// Id of the freshly persisted record
    pub scan_id: ScanId,
    /// This query's report
    pub result: MatchReport,
    /// The user's accumulated matches across all their scans, this one
    /// included
    pub matches: Vec<MatchResult>,
}

/// Document matching engine.
pub struct ScanEngine {
    encoder: Box<dyn TextEncoder>,
    corpus: RwLock<CorpusIndex>,
    /// Serializes reloads so concurrent self-heals do not stampede
    reload_lock: Mutex<()>,
    corpus_dir: PathBuf,
    store: ScanStore,
    analytics: Analytics,
    activity: ActivityLog,
    top_k: usize,
    threshold: f32,
}

impl ScanEngine {
    /// Create an engine with an empty index.
    ///
    /// The first scan (or an explicit `reload`) populates it from the corpus
    /// directory.
    pub fn new(encoder: Box<dyn TextEncoder>, options: EngineOptions) -> std::io::Result<Self> {
        let store = ScanStore::open(&options.scans_dir)?;
        let dimensions = encoder.dimensions();

        Ok(Self {
            corpus: RwLock::new(CorpusIndex::new(dimensions)),
            reload_lock: Mutex::new(()),
            corpus_dir: options.corpus_dir,
            store,
            analytics: Analytics::new(&options.analytics_path),
            activity: ActivityLog::new(&options.activity_log_path),
            top_k: options.top_k.max(1),
            threshold: options.threshold,
            encoder,
        })
    }

    /// Rebuild the index from the corpus directory and swap it in.
    ///
    /// The old index stays visible to searches until the replacement is
    /// complete; on failure it stays in place entirely.
    pub fn reload(&self) -> Result<CorpusLoadReport, EngineError> {
        let _guard = self
            .reload_lock
            .lock()
            .map_err(|e| EngineError::Internal(format!("Reload lock poisoned: {}", e)))?;

        let load = corpus::load_corpus(&self.corpus_dir, self.encoder.as_ref())?;

        let mut corpus = self
            .corpus
            .write()
            .map_err(|e| EngineError::Internal(format!("Corpus lock poisoned: {}", e)))?;
        *corpus = load.index;

        Ok(load.report)
    }

    /// Run one scan for `username`.
    ///
    /// Validates the query, self-heals an empty index with a one-shot
    /// reload, searches, persists the report under a new scan id, records
    /// telemetry, and returns the user's accumulated matches.
    ///
    /// An empty corpus is not an error: the scan persists an empty report
    /// carrying the fixed error string and still returns normally.
    pub fn scan(&self, username: &str, text: &str) -> Result<ScanOutcome, EngineError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EngineError::MissingUsername);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::MissingQueryText);
        }

        self.heal_if_empty();

        let result = self.match_query(text)?;

        let document_name = result.best_document_name().to_string();
        self.analytics.record_scan(username, text, &document_name);
        self.activity.record(username, ACTION_SCANNED, &document_name);

        let scan_id = self.store.append(username, &result)?;
        let matches = self.store.list_by_username(username);

        log::info!(
            "Scan {scan_id} for '{username}' matched {} document(s)",
            result.matches.len()
        );

        Ok(ScanOutcome {
            scan_id,
            result,
            matches,
        })
    }

    /// Number of documents currently indexed.
    pub fn corpus_len(&self) -> usize {
        self.corpus.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Score one query against the current index.
    fn match_query(&self, text: &str) -> Result<MatchReport, EngineError> {
        if self.corpus_len() == 0 {
            return Ok(MatchReport::empty_corpus());
        }

        // Encode outside the read lock; the model is its own sync domain
        let query = self.encoder.encode(text)?;

        let corpus = self
            .corpus
            .read()
            .map_err(|e| EngineError::Internal(format!("Corpus lock poisoned: {}", e)))?;
        let hits = corpus.search(&query, self.top_k)?;
        let matches = scorer::score_matches(&hits, &corpus, self.threshold);

        Ok(MatchReport {
            matches,
            error: None,
        })
    }

    /// One-shot reload when the index is empty at query time.
    fn heal_if_empty(&self) {
        if self.corpus_len() > 0 {
            return;
        }
        log::info!("Corpus index is empty; reloading reference documents");
        if let Err(e) = self.reload() {
            log::warn!("Corpus reload failed: {e}");
        }
    }
}
