//! Shared test support.
//!
//! `MockEncoder` stands in for the real embedding model so the scan flow can
//! be exercised without downloading model weights.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::encoder::{EncoderError, TextEncoder};


/// Deterministic bag-of-words encoder.
///
/// Every distinct token gets its own dimension, assigned in encounter order,
/// and vectors are L2-normalized. Texts sharing tokens come out close; texts
/// sharing none sit at squared distance 2, which the similarity threshold
/// filters out.
pub(crate) struct MockEncoder {
    dims: usize,
    vocab: Mutex<HashMap<String, usize>>,
}

impl MockEncoder {
    pub(crate) fn new(dims: usize) -> Self {
        Self {
            dims,
            vocab: Mutex::new(HashMap::new()),
        }
    }

    fn vector_of(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dims];
        let mut vocab = self.vocab.lock().unwrap();

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let next_slot = vocab.len() % self.dims;
            let slot = *vocab.entry(token).or_insert(next_slot);
            vector[slot] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for component in vector.iter_mut() {
                *component /= norm;
            }
        }
        vector
    }
}

impl TextEncoder for MockEncoder {
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
        Ok(self.vector_of(text))
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncoderError> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

#[test]
fn mock_encoder_is_deterministic() {
    let encoder = MockEncoder::new(8);
    let a = encoder.encode("apple banana").unwrap();
    let b = encoder.encode("apple banana").unwrap();
    assert_eq!(a, b);
}

#[test]
fn mock_encoder_separates_disjoint_texts() {
    let encoder = MockEncoder::new(8);
    let fruit = encoder.encode("apple banana").unwrap();
    let cars = encoder.encode("car truck").unwrap();
    let mixed = encoder.encode("apple truck").unwrap();

    let d = |x: &[f32], y: &[f32]| -> f32 {
        x.iter().zip(y).map(|(a, b)| (a - b) * (a - b)).sum()
    };

    assert!(d(&fruit, &mixed) < d(&fruit, &cars));
    assert!((d(&fruit, &cars) - 2.0).abs() < 1e-5);
}
