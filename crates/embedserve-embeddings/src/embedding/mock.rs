//! Deterministic embedding provider for tests
//!
//! Vectors are derived from a hash of the input text, so identical texts map
//! to identical unit-norm vectors without downloading a model.

use super::device::Backend;
use super::traits::EmbeddingProvider;
use crate::{EmbeddingError, EmbeddingResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Dimension of the default sentence-embedding model
pub const MOCK_DIMENSION: usize = 384;

/// Test provider returning text-derived unit vectors
pub struct MockEmbeddingProvider {
    backend: Backend,
    fail: bool,
    last_batch_size: AtomicUsize,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub const fn new(backend: Backend) -> Self {
        Self {
            backend,
            fail: false,
            last_batch_size: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every encode call fail
    #[must_use]
    pub const fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Batch size passed to the most recent encode call (0 before any call)
    pub fn last_batch_size(&self) -> usize {
        self.last_batch_size.load(Ordering::SeqCst)
    }

    /// Number of encode calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        // FNV-1a seed, then a 64-bit LCG per component
        let mut state = text.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        });

        let raw: Vec<f32> = (0..MOCK_DIMENSION)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                // Top 24 bits mapped onto [-1, 1)
                #[allow(clippy::cast_precision_loss)]
                let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
                unit.mul_add(2.0, -1.0)
            })
            .collect();

        let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
        raw.into_iter().map(|x| x / norm).collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(Backend::Cpu)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn encode(&self, texts: Vec<String>, batch_size: usize) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_batch_size.store(batch_size, Ordering::SeqCst);

        if self.fail {
            return Err(EmbeddingError::inference_error("Mock embedding failure"));
        }

        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }

    fn embedding_dimension(&self) -> usize {
        MOCK_DIMENSION
    }

    fn model_name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn backend(&self) -> Backend {
        self.backend
    }
}
