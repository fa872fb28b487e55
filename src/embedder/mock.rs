/// Mock embedder for tests and offline runs.
///
/// Generates deterministic embeddings based on text hash, so assertions
/// stay stable without a network backend.
use std::hash::{DefaultHasher, Hash, Hasher};

use super::{BoxFuture, Embedder, EmbedderError};

/// A mock embedder that produces deterministic vectors from text hashes.
pub struct MockEmbedder {
    pub dimensions: usize,
}

impl MockEmbedder {
    /// Create a new `MockEmbedder` with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        // Generate a deterministic embedding based on text hash
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        // Use the hash bytes to seed deterministic float values
        let bytes = hash.to_le_bytes();
        let mut embedding = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            embedding.push(bytes[i % 8] as f32 / 255.0);
        }

        // L2 normalize
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            for v in &mut embedding {
                *v *= inv;
            }
        }

        embedding
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self { dimensions: 1024 }
    }
}

impl Embedder for MockEmbedder {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EmbedderError>> {
        Box::pin(async move { Ok(texts.iter().map(|t| self.hash_vector(t)).collect()) })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn embed_one(embedder: &MockEmbedder, text: &str) -> Vec<f32> {
        let texts = vec![text.to_string()];
        let mut vectors = embedder.embed_batch(&texts).await.unwrap();
        vectors.pop().unwrap()
    }

    #[tokio::test]
    async fn test_mock_embed_dimensions() {
        let embedder = MockEmbedder::new(1024);
        let result = embed_one(&embedder, "hello world").await;
        assert_eq!(result.len(), 1024);
    }

    #[tokio::test]
    async fn test_mock_embed_deterministic() {
        let embedder = MockEmbedder::new(1024);
        let a = embed_one(&embedder, "こんにちは").await;
        let b = embed_one(&embedder, "こんにちは").await;
        assert_eq!(a, b, "same input should produce same output");
    }

    #[tokio::test]
    async fn test_mock_embed_different_inputs() {
        let embedder = MockEmbedder::new(1024);
        let a = embed_one(&embedder, "hello").await;
        let b = embed_one(&embedder, "world").await;
        assert_ne!(a, b, "different inputs should produce different outputs");
    }

    #[tokio::test]
    async fn test_mock_embed_normalized() {
        let embedder = MockEmbedder::new(1024);
        let vec = embed_one(&embedder, "test normalization").await;
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!(
            (norm - 1.0).abs() < 0.01,
            "vector should be approximately unit length, got {norm}"
        );
    }

    #[tokio::test]
    async fn test_mock_embed_batch_aligned() {
        let embedder = MockEmbedder::new(128);
        let texts: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();

        let results = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(results.len(), 3);
        for (i, vec) in results.iter().enumerate() {
            assert_eq!(vec.len(), 128);
            let single = embed_one(&MockEmbedder::new(128), &texts[i]).await;
            assert_eq!(*vec, single, "batch output must align with inputs");
        }
    }

    #[tokio::test]
    async fn test_mock_empty_batch() {
        let embedder = MockEmbedder::default();
        let results = embedder.embed_batch(&[]).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_mock_default_dimensions() {
        let embedder = MockEmbedder::default();
        assert_eq!(embedder.dimensions(), 1024);
    }
}
