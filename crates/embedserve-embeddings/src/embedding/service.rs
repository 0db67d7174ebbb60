//! Request-level embedding logic
//!
//! `EmbeddingService` wraps a provider with the rules the HTTP endpoints
//! share: input limits, per-device batch-size clamping, wall-clock timing,
//! throughput logging and the stats snapshot.

use super::device::{Backend, BackendAvailability};
use super::traits::EmbeddingProvider;
use crate::{EmbeddingError, EmbeddingResult};
use embedserve_config::PerformanceConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WARMUP_TEXT: &str = "warmup text for model initialization";

/// Result of a batch encode
#[derive(Debug, Clone)]
pub struct BatchEmbedding {
    pub embeddings: Vec<Vec<f32>>,
    pub processing_time: Duration,
    pub backend: Backend,
    /// Batch size actually handed to the model, after clamping
    pub batch_size: usize,
}

/// Result of a single-text encode
#[derive(Debug, Clone)]
pub struct SingleEmbedding {
    pub embedding: Vec<f32>,
    pub processing_time: Duration,
    pub backend: Backend,
}

/// Snapshot of the loaded model and visible hardware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub device: Backend,
    pub model_name: String,
    pub embedding_dimensions: usize,
    pub max_batch_size: usize,
    pub cuda_available: bool,
    pub mps_available: bool,
    pub device_count: usize,
}

/// Shared handle to a ready model
///
/// Immutable after construction; handlers share it through an `Arc`.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    availability: BackendAvailability,
    max_texts: usize,
    default_batch_size: usize,
}

impl EmbeddingService {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        availability: BackendAvailability,
        performance: &PerformanceConfig,
    ) -> Self {
        Self {
            provider,
            availability,
            max_texts: performance.max_texts_per_request,
            default_batch_size: performance.default_batch_size,
        }
    }

    /// Create with a custom provider and default limits
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(
            provider,
            BackendAvailability::default(),
            &PerformanceConfig::default(),
        )
    }

    pub fn backend(&self) -> Backend {
        self.provider.backend()
    }

    pub fn embedding_dimension(&self) -> usize {
        self.provider.embedding_dimension()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Run one throwaway encode so the first real request doesn't pay for
    /// kernel compilation and lazy allocations.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the encode fails.
    pub async fn warm_up(&self) -> EmbeddingResult<()> {
        let started = Instant::now();
        self.provider
            .encode(vec![WARMUP_TEXT.to_string()], 1)
            .await?;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis(), "Warm-up encode finished");
        Ok(())
    }

    /// Encode up to `max_texts` texts with a device-clamped batch size
    ///
    /// # Errors
    ///
    /// `EmbeddingError::InvalidInput` for an empty list, too many texts or a
    /// zero batch size; otherwise whatever the provider returns.
    pub async fn embed_batch(
        &self,
        texts: Vec<String>,
        batch_size: Option<usize>,
    ) -> EmbeddingResult<BatchEmbedding> {
        metrics::counter!("embedserve_embed_requests_total", "endpoint" => "batch").increment(1);

        if texts.is_empty() {
            return Err(EmbeddingError::invalid_input("No texts provided"));
        }
        if texts.len() > self.max_texts {
            return Err(EmbeddingError::invalid_input(format!(
                "Batch size too large (max {})",
                self.max_texts
            )));
        }
        let requested = batch_size.unwrap_or(self.default_batch_size);
        if requested == 0 {
            return Err(EmbeddingError::invalid_input("batch_size must be at least 1"));
        }

        let backend = self.backend();
        let effective = backend.clamp_batch_size(requested);
        let count = texts.len();

        let (embeddings, processing_time) = self.timed_encode(texts, effective).await?;
        if embeddings.len() != count {
            return Err(EmbeddingError::inference_error(format!(
                "Model returned {} embeddings for {count} texts",
                embeddings.len()
            )));
        }

        let secs = processing_time.as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let throughput = if secs > 0.0 { count as f64 / secs } else { 0.0 };
        tracing::info!(
            count,
            batch_size = effective,
            device = %backend,
            "Processed {count} embeddings in {secs:.2}s ({throughput:.1} embeddings/sec) on {backend}"
        );
        metrics::counter!("embedserve_texts_embedded_total").increment(count as u64);

        Ok(BatchEmbedding {
            embeddings,
            processing_time,
            backend,
            batch_size: effective,
        })
    }

    /// Encode one text through the same path as a one-element batch
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the encode fails.
    pub async fn embed_single(&self, text: String) -> EmbeddingResult<SingleEmbedding> {
        metrics::counter!("embedserve_embed_requests_total", "endpoint" => "single").increment(1);

        let (embeddings, processing_time) = self
            .timed_encode(vec![text], self.default_batch_size)
            .await?;
        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::inference_error("Model returned no embedding"))?;
        metrics::counter!("embedserve_texts_embedded_total").increment(1);

        Ok(SingleEmbedding {
            embedding,
            processing_time,
            backend: self.backend(),
        })
    }

    async fn timed_encode(
        &self,
        texts: Vec<String>,
        batch_size: usize,
    ) -> EmbeddingResult<(Vec<Vec<f32>>, Duration)> {
        let started = Instant::now();
        let result = self.provider.encode(texts, batch_size).await;
        let elapsed = started.elapsed();
        metrics::histogram!("embedserve_encode_seconds").record(elapsed.as_secs_f64());

        match result {
            Ok(embeddings) => Ok((embeddings, elapsed)),
            Err(e) => {
                metrics::counter!("embedserve_encode_failures_total").increment(1);
                tracing::error!(error = %e, "Error generating embeddings");
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> ServiceStats {
        let device = self.backend();
        ServiceStats {
            device,
            model_name: self.model_name().to_string(),
            embedding_dimensions: self.embedding_dimension(),
            max_batch_size: device.max_batch_size(),
            cuda_available: self.availability.cuda_available,
            mps_available: self.availability.mps_available,
            device_count: self.availability.device_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::mock::MockEmbeddingProvider;

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text number {i}")).collect()
    }

    #[tokio::test]
    async fn batch_returns_one_vector_per_text_in_order() {
        let provider = Arc::new(MockEmbeddingProvider::new(Backend::Cpu));
        let service = EmbeddingService::with_provider(Arc::<MockEmbeddingProvider>::clone(&provider));

        let input = texts(5);
        let result = service.embed_batch(input.clone(), Some(2)).await.unwrap();
        assert_eq!(result.embeddings.len(), 5);

        let expected = provider.encode(input, 1).await.unwrap();
        assert_eq!(result.embeddings, expected);
    }

    #[tokio::test]
    async fn batch_size_is_clamped_to_device_ceiling() {
        for (backend, ceiling) in [(Backend::Mps, 64), (Backend::Cuda, 32), (Backend::Cpu, 16)] {
            let provider = Arc::new(MockEmbeddingProvider::new(backend));
            let service = EmbeddingService::with_provider(Arc::<MockEmbeddingProvider>::clone(&provider));

            let result = service.embed_batch(texts(3), Some(500)).await.unwrap();
            assert_eq!(result.batch_size, ceiling);
            assert_eq!(provider.last_batch_size(), ceiling);
            assert_eq!(result.backend, backend);
        }
    }

    #[tokio::test]
    async fn small_hint_is_kept() {
        let service = EmbeddingService::with_provider(Arc::new(MockEmbeddingProvider::new(Backend::Mps)));
        let result = service.embed_batch(texts(3), Some(8)).await.unwrap();
        assert_eq!(result.batch_size, 8);
    }

    #[tokio::test]
    async fn missing_hint_uses_default() {
        let service = EmbeddingService::with_provider(Arc::new(MockEmbeddingProvider::new(Backend::Mps)));
        let result = service.embed_batch(texts(1), None).await.unwrap();
        assert_eq!(result.batch_size, 32);
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_requests() {
        let provider = Arc::new(MockEmbeddingProvider::default());
        let service = EmbeddingService::with_provider(Arc::<MockEmbeddingProvider>::clone(&provider));

        let empty = service.embed_batch(Vec::new(), None).await.unwrap_err();
        assert!(matches!(empty, EmbeddingError::InvalidInput(_)));

        let too_many = service.embed_batch(texts(1001), None).await.unwrap_err();
        assert_eq!(too_many.to_string(), "Batch size too large (max 1000)");

        let zero = service.embed_batch(texts(1), Some(0)).await.unwrap_err();
        assert!(matches!(zero, EmbeddingError::InvalidInput(_)));

        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn accepts_exactly_the_limit() {
        let service = EmbeddingService::with_provider(Arc::new(MockEmbeddingProvider::default()));
        let result = service.embed_batch(texts(1000), Some(16)).await.unwrap();
        assert_eq!(result.embeddings.len(), 1000);
    }

    #[tokio::test]
    async fn single_matches_batch_of_one() {
        let service = EmbeddingService::with_provider(Arc::new(MockEmbeddingProvider::default()));
        let single = service.embed_single("hello world".to_string()).await.unwrap();
        let batch = service
            .embed_batch(vec!["hello world".to_string()], None)
            .await
            .unwrap();
        assert_eq!(single.embedding, batch.embeddings[0]);
    }

    #[tokio::test]
    async fn provider_failures_propagate() {
        let service = EmbeddingService::with_provider(Arc::new(
            MockEmbeddingProvider::default().with_failure(),
        ));
        assert!(service.embed_batch(texts(2), None).await.is_err());
        assert!(service.embed_single("x".to_string()).await.is_err());
        assert!(service.warm_up().await.is_err());
    }

    #[tokio::test]
    async fn stats_report_device_ceiling_and_availability() {
        let availability = BackendAvailability {
            cuda_available: true,
            mps_available: false,
            device_count: 2,
        };
        let service = EmbeddingService::new(
            Arc::new(MockEmbeddingProvider::new(Backend::Cuda)),
            availability,
            &PerformanceConfig::default(),
        );

        let stats = service.stats();
        assert_eq!(stats.device, Backend::Cuda);
        assert_eq!(stats.model_name, "all-MiniLM-L6-v2");
        assert_eq!(stats.embedding_dimensions, 384);
        assert_eq!(stats.max_batch_size, 32);
        assert!(stats.cuda_available);
        assert_eq!(stats.device_count, 2);
    }

    #[tokio::test]
    async fn configured_text_limit_is_enforced() {
        let performance = PerformanceConfig {
            max_texts_per_request: 3,
            ..PerformanceConfig::default()
        };
        let service = EmbeddingService::new(
            Arc::new(MockEmbeddingProvider::default()),
            BackendAvailability::default(),
            &performance,
        );
        assert!(service.embed_batch(texts(3), None).await.is_ok());
        assert!(service.embed_batch(texts(4), None).await.is_err());
    }
}
