//! YAML configuration under the storage root.
//!
//! A missing `config.yaml` is created with defaults on first load; unknown
//! values are fixed or rejected up front so the rest of the program never
//! sees a nonsense config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::encoder::DEFAULT_MODEL;
use crate::scorer::SIMILARITY_THRESHOLD;

/// Corpus directory relative to the storage root
const DEFAULT_CORPUS_DIR: &str = "reference_docs";

/// How many nearest documents a scan considers
const DEFAULT_TOP_K: usize = 2;

/// Configuration for the matching pipeline
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Model name for embeddings (e.g., "bge-large-en-v1.5")
    #[serde(default = "default_model")]
    pub model: String,

    /// Nearest neighbours considered per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity (percent) for a match to be reported
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            similarity_threshold: SIMILARITY_THRESHOLD,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_similarity_threshold() -> f32 {
    SIMILARITY_THRESHOLD
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Corpus directory; relative paths resolve against the storage root
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: String,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

fn default_corpus_dir() -> String {
    DEFAULT_CORPUS_DIR.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            matching: MatchingConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

impl Config {
    fn validate(&mut self) {
        if self.matching.top_k == 0 {
            self.matching.top_k = 1
        }

        if self.matching.similarity_threshold.is_nan() {
            panic!("matching.similarity_threshold must be a number");
        }
    }

    /// Load the config from `<base_path>/config.yaml`, creating the file
    /// with defaults on first run.
    ///
    /// Panics when the file exists but cannot be parsed; a broken config is
    /// a startup error, not something to limp past.
    pub fn load_with(base_path: &Path) -> Self {
        std::fs::create_dir_all(base_path)
            .unwrap_or_else(|e| panic!("cannot create {}: {e}", base_path.display()));

        let config_path = base_path.join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            let defaults = serde_yml::to_string(&Self::default()).expect("default config serializes");
            if let Err(e) = std::fs::write(&config_path, defaults.as_bytes()) {
                log::warn!("Failed to write default config: {e}");
            }
        }

        let config_str = std::fs::read_to_string(&config_path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", config_path.display()));
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_path_buf();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).expect("config serializes") {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_str = serde_yml::to_string(&self).expect("config serializes");
        let config_path = self.base_path.join("config.yaml");
        if let Err(e) = std::fs::write(&config_path, config_str.as_bytes()) {
            log::warn!("Failed to save config to {}: {e}", config_path.display());
        }
    }

    /// Storage root this config was loaded from.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolved corpus directory.
    pub fn corpus_path(&self) -> PathBuf {
        let dir = Path::new(&self.corpus_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_path.join(dir)
        }
    }

    /// Directory holding the per-record scan store.
    pub fn scans_path(&self) -> PathBuf {
        self.base_path.join("scans")
    }

    pub fn analytics_path(&self) -> PathBuf {
        self.base_path.join("analytics.json")
    }

    pub fn activity_log_path(&self) -> PathBuf {
        self.base_path.join("activity_logs.json")
    }
}
