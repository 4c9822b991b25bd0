//! Distance-to-similarity scoring and match reporting.
//!
//! Turns raw index hits into user-facing match results:
//! 1. Convert squared L2 distance to a percentage similarity
//! 2. Drop matches below the similarity threshold
//! 3. Attach a document excerpt and an insight sentence

use serde::{Deserialize, Serialize};

use crate::index::{CorpusIndex, SearchHit};

/// Minimum similarity (percent) for a hit to be reported
pub const SIMILARITY_THRESHOLD: f32 = 2.0;

/// Excerpt length in characters, not bytes
pub const EXCERPT_CHARS: usize = 200;

/// Ellipsis suffix when an excerpt is truncated
const TRUNCATION_SUFFIX: &str = "...";

/// Error string reported when the reference corpus is empty
pub const NO_REFERENCE_DOCS: &str = "No reference documents available.";

/// Stand-in name when a scan produced no matches
pub const UNKNOWN_DOCUMENT: &str = "Unknown Document";

/// A single reported match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub document_name: String,
    /// Percentage with two decimals, e.g. "93.20%"
    pub similarity_score: String,
    pub document_excerpt: String,
    pub insight: String,
}

/// The outcome of scoring one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub matches: Vec<MatchResult>,
    /// Set only when no corpus was available to search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchResult {
    fn new(name: &str, text: &str, similarity: f32) -> Self {
        Self {
            document_name: name.to_string(),
            similarity_score: format!("{similarity:.2}%"),
            document_excerpt: excerpt_of(text),
            insight: format!(
                "The document '{name}' is {similarity:.2}% similar to the query text."
            ),
        }
    }
}

impl MatchReport {
    /// Report for a query against an empty corpus.
    pub fn empty_corpus() -> Self {
        Self {
            matches: Vec::new(),
            error: Some(NO_REFERENCE_DOCS.to_string()),
        }
    }

    /// Name of the best match, or the unknown-document stand-in.
    ///
    /// Matches are ordered by descending similarity, so the first one is the
    /// best.
    pub fn best_document_name(&self) -> &str {
        self.matches
            .first()
            .map(|m| m.document_name.as_str())
            .unwrap_or(UNKNOWN_DOCUMENT)
    }
}

/// Convert a squared L2 distance to a percentage similarity.
///
/// Not clamped: distances above 1.0 yield negative percentages and the
/// threshold filter removes them downstream. Callers must not normalize the
/// value.
pub fn similarity_from_distance(distance: f32) -> f32 {
    (1.0 - distance) * 100.0
}

/// Score index hits against the corpus and keep those at or above `threshold`.
///
/// Hits arrive ordered by ascending distance and the order is preserved, so
/// results come out in descending similarity.
pub fn score_matches(
    hits: &[SearchHit],
    corpus: &CorpusIndex,
    threshold: f32,
) -> Vec<MatchResult> {
    let mut results = Vec::new();
    for hit in hits {
        let Some(record) = corpus.get(hit.id) else {
            continue;
        };
        let similarity = similarity_from_distance(hit.distance);
        if similarity < threshold {
            continue;
        }
        results.push(MatchResult::new(&record.name, &record.text, similarity));
    }
    results
}

/// First `EXCERPT_CHARS` characters of the text, with an ellipsis appended
/// only when the text is actually longer.
fn excerpt_of(text: &str) -> String {
    let mut excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        excerpt.push_str(TRUNCATION_SUFFIX);
    }
    excerpt
}
