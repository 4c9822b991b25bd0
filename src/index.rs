//! In-memory vector index over the reference corpus.
//!
//! Stores document embeddings together with their names and texts and
//! provides nearest-neighbour search by squared Euclidean distance.

use std::collections::BTreeMap;

/// A reference document held by the index.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    /// File name the document was loaded from
    pub name: String,
    /// Extracted full text
    pub text: String,
    /// The embedding vector
    pub embedding: Vec<f32>,
}

/// In-memory index of reference documents.
///
/// One ordered mapping of doc id -> record, so names, texts and vectors can
/// never drift out of step. Ids are assigned sequentially at insert time and
/// iteration order is insertion order.
pub struct CorpusIndex {
    /// Doc ID -> (name, text, embedding)
    records: BTreeMap<u64, DocumentRecord>,
    /// Expected embedding dimensions
    dimensions: usize,
    next_id: u64,
}

/// Search hit from the index.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Doc ID
    pub id: u64,
    /// Squared L2 distance to the query (lower is closer)
    pub distance: f32,
}

impl CorpusIndex {
    /// Create a new empty index with the given embedding dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            dimensions,
            next_id: 0,
        }
    }

    /// Get the expected embedding dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the number of documents in the index.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a document record and return its assigned id.
    ///
    /// There is no update or removal; a reload builds a fresh index instead.
    pub fn insert(
        &mut self,
        name: String,
        text: String,
        embedding: Vec<f32>,
    ) -> Result<u64, IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.records.insert(
            id,
            DocumentRecord {
                name,
                text,
                embedding,
            },
        );

        Ok(id)
    }

    /// Get a record by doc id.
    pub fn get(&self, id: u64) -> Option<&DocumentRecord> {
        self.records.get(&id)
    }

    /// Iterate over all records in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &DocumentRecord)> {
        self.records.iter().map(|(k, v)| (*k, v))
    }

    /// Search for the nearest documents to a query vector.
    ///
    /// # Arguments
    /// * `query` - The query embedding vector
    /// * `k` - Maximum number of hits to return
    ///
    /// # Returns
    /// Up to `k` hits sorted by ascending squared L2 distance. An empty index
    /// yields no hits.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .records
            .iter()
            .map(|(id, record)| SearchHit {
                id: *id,
                distance: Self::squared_l2(query, &record.embedding),
            })
            .collect();

        // Sort by distance ascending; stable sort keeps id order for ties
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// Compute squared L2 distance between two vectors.
    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum()
    }
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
