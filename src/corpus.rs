//! Reference corpus loading.
//!
//! Builds a fresh `CorpusIndex` from a directory of documents: enumerate the
//! regular files, extract their text in parallel, embed all texts in one
//! batch call, insert in file-name order. The caller decides when the new
//! index replaces the old one, so a load never disturbs running searches.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::encoder::{EncoderError, TextEncoder};
use crate::extract;
use crate::index::{CorpusIndex, IndexError};

/// A freshly built index plus its load report.
pub struct CorpusLoad {
    pub index: CorpusIndex,
    pub report: CorpusLoadReport,
}

/// Counts from one corpus load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusLoadReport {
    /// Documents that made it into the index
    pub loaded: usize,
    /// Files present but skipped (unsupported, unreadable or empty)
    pub skipped: usize,
}

/// Errors that abort a corpus load.
///
/// Per-file problems never land here; they are logged and counted as skips.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Failed to read corpus directory: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Load the reference corpus from `dir`.
///
/// A missing directory is an empty corpus, not an error. Files are processed
/// in name order so doc ids are stable across loads of the same directory.
pub fn load_corpus(dir: &Path, encoder: &dyn TextEncoder) -> Result<CorpusLoad, CorpusError> {
    let files = match list_files(dir) {
        Ok(files) => files,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Corpus directory {} does not exist", dir.display());
            return Ok(empty_load(encoder, 0));
        }
        Err(e) => return Err(e.into()),
    };

    let total = files.len();
    let extracted: Vec<Option<(String, String)>> = files
        .par_iter()
        .map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            let text = extract::extract_text(path)?;
            Some((name, text))
        })
        .collect();

    let docs: Vec<(String, String)> = extracted.into_iter().flatten().collect();
    let skipped = total - docs.len();

    if docs.is_empty() {
        log::warn!("No reference documents loaded from {}", dir.display());
        return Ok(empty_load(encoder, skipped));
    }

    let texts: Vec<String> = docs.iter().map(|(_, text)| text.clone()).collect();
    let embeddings = encoder.encode_batch(&texts)?;
    if embeddings.len() != docs.len() {
        return Err(EncoderError::EncodeFailed(format!(
            "Expected {} embeddings, got {}",
            docs.len(),
            embeddings.len()
        ))
        .into());
    }

    let mut index = CorpusIndex::new(encoder.dimensions());
    for ((name, text), embedding) in docs.into_iter().zip(embeddings) {
        index.insert(name, text, embedding)?;
    }

    let report = CorpusLoadReport {
        loaded: index.len(),
        skipped,
    };
    log::info!(
        "Loaded {} reference documents from {} ({} skipped)",
        report.loaded,
        dir.display(),
        report.skipped
    );

    Ok(CorpusLoad { index, report })
}

fn empty_load(encoder: &dyn TextEncoder, skipped: usize) -> CorpusLoad {
    CorpusLoad {
        index: CorpusIndex::new(encoder.dimensions()),
        report: CorpusLoadReport { loaded: 0, skipped },
    }
}

/// Regular files in `dir`, sorted by name. Subdirectories are ignored.
fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::MockEncoder;

    fn write_corpus(dir: &Path, docs: &[(&str, &str)]) {
        for (name, text) in docs {
            std::fs::write(dir.join(name), text).unwrap();
        }
    }

    #[test]
    fn test_load_builds_index_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(
            dir.path(),
            &[
                ("b.txt", "car truck engine"),
                ("a.txt", "apple banana fruit"),
            ],
        );
        let encoder = MockEncoder::new(16);

        let load = load_corpus(dir.path(), &encoder).unwrap();
        assert_eq!(load.report, CorpusLoadReport { loaded: 2, skipped: 0 });
        assert_eq!(load.index.len(), 2);
        assert_eq!(load.index.dimensions(), 16);

        let names: Vec<&str> = load.index.iter().map(|(_, r)| r.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        for (_, record) in load.index.iter() {
            assert!(!record.name.is_empty());
            assert!(!record.text.is_empty());
            assert_eq!(record.embedding.len(), 16);
        }
    }

    #[test]
    fn test_load_skips_unsupported_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(
            dir.path(),
            &[
                ("keep.txt", "useful text"),
                ("skip.md", "markdown is not plain text"),
                ("empty.txt", "   "),
            ],
        );
        let encoder = MockEncoder::new(8);

        let load = load_corpus(dir.path(), &encoder).unwrap();
        assert_eq!(load.report, CorpusLoadReport { loaded: 1, skipped: 2 });
        assert_eq!(load.index.get(0).unwrap().name, "keep.txt");
    }

    #[test]
    fn test_load_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), &[("doc.txt", "text")]);
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("inner.txt"), "hidden").unwrap();
        let encoder = MockEncoder::new(8);

        let load = load_corpus(dir.path(), &encoder).unwrap();
        assert_eq!(load.report, CorpusLoadReport { loaded: 1, skipped: 0 });
    }

    #[test]
    fn test_load_missing_dir_is_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = MockEncoder::new(8);

        let load = load_corpus(&dir.path().join("absent"), &encoder).unwrap();
        assert_eq!(load.report, CorpusLoadReport { loaded: 0, skipped: 0 });
        assert!(load.index.is_empty());
        assert_eq!(load.index.dimensions(), 8);
    }

    #[test]
    fn test_load_empty_dir_is_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = MockEncoder::new(8);

        let load = load_corpus(dir.path(), &encoder).unwrap();
        assert_eq!(load.report.loaded, 0);
        assert!(load.index.is_empty());
    }

    #[test]
    fn test_reload_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), &[("one.txt", "first"), ("two.txt", "second")]);
        let encoder = MockEncoder::new(8);

        let first = load_corpus(dir.path(), &encoder).unwrap();
        let second = load_corpus(dir.path(), &encoder).unwrap();
        assert_eq!(first.index.len(), 2);
        assert_eq!(second.index.len(), 2);
    }
}
