//! Deterministic hash-based embedder.

use super::Embedder;
use crate::{Error, Result};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// 64-bit FNV-1a. Stored vectors depend on it, so it must never change.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME))
}

/// Embedder producing normalized pseudo-embeddings from word hashes.
///
/// Texts sharing words land near each other, which is enough for keyword-ish
/// retrieval against a vector store and for tests. It does not capture
/// meaning: "car" and "automobile" are unrelated.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Maximum number of words hashed per text.
    const MAX_WORDS: usize = 1000;

    /// Creates an embedder producing vectors of the given length.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn distribute_hash(embedding: &mut [f32], hash: u64) {
        let dimensions = embedding.len();
        for j in 0..8 {
            let idx = (hash >> (j * 8)) as usize % dimensions;
            let value = ((hash >> (j * 4)) & 0xFF) as f32 / 255.0 - 0.5;
            embedding[idx] += value;
        }
    }

    fn normalize(embedding: &mut [f32]) {
        let norm_sq: f32 = embedding.iter().map(|x| x * x).sum();
        if norm_sq <= 0.0 {
            return;
        }
        let inv_norm = norm_sq.sqrt().recip();
        for v in embedding.iter_mut() {
            *v *= inv_norm;
        }
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(Error::OperationFailed {
                operation: "embed".to_string(),
                cause: "embedder configured with zero dimensions".to_string(),
            });
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        // Word order does not matter; case does not either.
        for word in text
            .split_whitespace()
            .take(Self::MAX_WORDS)
            .map(str::to_lowercase)
        {
            Self::distribute_hash(&mut embedding, fnv1a(word.as_bytes()));
        }

        Self::normalize(&mut embedding);
        Ok(embedding)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_dimensions_and_norm() {
        let embedder = HashEmbedder::new(64);
        let v = embedder.embed("vector databases store embeddings").expect("embed");
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedder::new(32);
        assert_eq!(
            embedder.embed("same text").expect("embed"),
            embedder.embed("same text").expect("embed")
        );
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed("weaviate schema").expect("embed");
        let related = embedder.embed("the weaviate schema endpoint").expect("embed");
        let unrelated = embedder.embed("banana bread recipe").expect("embed");
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = HashEmbedder::new(8).embed("").expect("embed");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_zero_dimensions_fails() {
        assert!(HashEmbedder::new(0).embed("text").is_err());
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a(b""), FNV_OFFSET);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_embedding_uses_fnv_word_hash() {
        // One word sets at most eight slots, all derived from its FNV-1a hash.
        let mut expected = vec![0.0f32; 16];
        HashEmbedder::distribute_hash(&mut expected, fnv1a(b"rust"));
        HashEmbedder::normalize(&mut expected);
        assert_eq!(HashEmbedder::new(16).embed("Rust").expect("embed"), expected);
    }

    #[test]
    fn test_embed_batch() {
        let batch = HashEmbedder::new(16)
            .embed_batch(&["one", "two"])
            .expect("embed");
        assert_eq!(batch.len(), 2);
    }
}
