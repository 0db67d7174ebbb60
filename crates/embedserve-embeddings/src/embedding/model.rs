//! Sentence-embedding model backed by Candle.
//!
//! Loads a BERT-family sentence-transformer from the Hugging Face hub and
//! produces mean-pooled, L2-normalized embeddings.
//!
//! # Pipeline
//!
//! ```text
//! texts → tokenizer (pad to longest, truncate) → BERT → mean pool over mask → L2 normalize
//! ```
//!
//! Inference is CPU-bound (or blocks on the GPU queue), so every encode call
//! runs on tokio's blocking pool.

use super::device::{Backend, SelectedDevice};
use super::traits::EmbeddingProvider;
use crate::{EmbeddingError, EmbeddingResult};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use embedserve_config::EmbeddingConfig;
use hf_hub::{Repo, RepoType, api::tokio::ApiBuilder};
use std::path::Path;
use std::sync::Arc;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Weights and tokenizer, immutable after load
struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// A loaded sentence-embedding model bound to one device
///
/// Cloning is cheap; clones share the same weights.
#[derive(Clone)]
pub struct EmbeddingModel {
    inner: Arc<LoadedModel>,
    model_name: String,
    backend: Backend,
    dimension: usize,
}

impl EmbeddingModel {
    /// Download (or reuse the cached copy of) the configured model and load it
    /// onto `selected`.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::ModelLoad` if any model file cannot be fetched
    /// or parsed, or if `max_tokens` exceeds what the model supports.
    pub async fn load(config: &EmbeddingConfig, selected: SelectedDevice) -> EmbeddingResult<Self> {
        let model_id = &config.model.id;
        let max_tokens = config.model.max_tokens;
        tracing::info!("Loading model: {model_id}");

        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(cache_dir) = config.cache.resolved_dir() {
            tracing::debug!(cache_dir = %cache_dir.display(), "Using model cache directory");
            builder = builder.with_cache_dir(cache_dir);
        }
        if let Ok(token) = std::env::var("HF_TOKEN") {
            builder = builder.with_token(Some(token));
        }
        let api = builder
            .build()
            .map_err(|e| EmbeddingError::model_load_error(format!("Failed to create HF API: {e}")))?;
        let repo = api.repo(Repo::new(model_id.clone(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .await
            .map_err(|e| EmbeddingError::model_load_error(format!("Failed to download config: {e}")))?;
        let config_str = std::fs::read_to_string(&config_path)?;

        let config_json: serde_json::Value = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::model_load_error(format!("Failed to parse config JSON: {e}")))?;
        let dimension = read_usize(&config_json, "hidden_size")?;
        let max_position_embeddings = read_usize(&config_json, "max_position_embeddings")?;

        tracing::info!(
            "Model {model_id} supports up to {max_position_embeddings} tokens (configured to use {max_tokens})"
        );
        if max_tokens > max_position_embeddings {
            return Err(EmbeddingError::model_load_error(format!(
                "Configured max_tokens ({max_tokens}) exceeds model's max_position_embeddings ({max_position_embeddings})"
            )));
        }

        let bert_config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::model_load_error(format!("Failed to parse BERT config: {e}")))?;

        let weights_path = match repo.get("model.safetensors").await {
            Ok(path) => path,
            Err(_) => repo.get("pytorch_model.bin").await.map_err(|e| {
                EmbeddingError::model_load_error(format!("Failed to download model weights: {e}"))
            })?,
        };
        let vb = var_builder(&weights_path, &selected.device)?;
        let model = BertModel::load(vb, &bert_config).map_err(|e| {
            EmbeddingError::model_load_error(format!("Failed to initialize BERT model: {e}"))
        })?;

        let tokenizer_path = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| EmbeddingError::model_load_error(format!("Failed to download tokenizer: {e}")))?;
        let tokenizer = load_tokenizer(&tokenizer_path, max_tokens)?;

        Ok(Self {
            inner: Arc::new(LoadedModel {
                model,
                tokenizer,
                device: selected.device,
            }),
            model_name: config.model.display_name().to_string(),
            backend: selected.backend,
            dimension,
        })
    }
}

fn read_usize(config: &serde_json::Value, field: &str) -> EmbeddingResult<usize> {
    config
        .get(field)
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| EmbeddingError::model_load_error(format!("Model config missing {field} field")))
}

fn var_builder(weights_path: &Path, device: &Device) -> EmbeddingResult<VarBuilder<'static>> {
    if weights_path.extension().is_some_and(|ext| ext == "safetensors") {
        // SAFETY: the weights file lives in the hub cache and is not modified while mapped.
        unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device) }
            .map_err(|e| EmbeddingError::model_load_error(format!("Failed to load safetensors: {e}")))
    } else {
        VarBuilder::from_pth(weights_path, DType::F32, device)
            .map_err(|e| EmbeddingError::model_load_error(format!("Failed to load pytorch weights: {e}")))
    }
}

fn load_tokenizer(path: &Path, max_tokens: usize) -> EmbeddingResult<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| EmbeddingError::model_load_error(format!("Failed to load tokenizer: {e}")))?;

    // Pad every chunk to its longest member so inputs stack into one tensor
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_tokens,
            ..Default::default()
        }))
        .map_err(|e| EmbeddingError::model_load_error(format!("Failed to set truncation: {e}")))?;

    Ok(tokenizer)
}

impl LoadedModel {
    /// Encode one chunk of texts into normalized embeddings
    fn encode_chunk(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenization(e.to_string()))?;

        let ids = encodings
            .iter()
            .map(|encoding| Tensor::new(encoding.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|encoding| Tensor::new(encoding.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        // [batch, seq_len, hidden]
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over real (non-padding) tokens
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = output.broadcast_mul(&mask)?.sum(1)?;
        let token_counts = mask.sum(1)?.clamp(1e-9f32, f32::INFINITY)?;
        let pooled = summed.broadcast_div(&token_counts)?;

        let norms = pooled
            .sqr()?
            .sum_keepdim(1)?
            .sqrt()?
            .clamp(1e-12f32, f32::INFINITY)?;
        let normalized = pooled.broadcast_div(&norms)?;

        Ok(normalized.to_dtype(DType::F32)?.to_vec2::<f32>()?)
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingModel {
    async fn encode(&self, texts: Vec<String>, batch_size: usize) -> EmbeddingResult<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        let chunk_size = batch_size.max(1);

        tokio::task::spawn_blocking(move || {
            let mut embeddings = Vec::with_capacity(texts.len());
            for chunk in texts.chunks(chunk_size) {
                embeddings.extend(inner.encode_chunk(chunk)?);
            }
            Ok::<_, EmbeddingError>(embeddings)
        })
        .await
        .map_err(|e| EmbeddingError::inference_error(format!("Encode task failed: {e}")))?
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn backend(&self) -> Backend {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::device::select_device;

    fn model_tests_enabled() -> bool {
        std::env::var("EMBEDSERVE_RUN_MODEL_TESTS").is_ok_and(|v| v == "1")
    }

    #[test]
    fn read_usize_reports_missing_field() {
        let config = serde_json::json!({ "hidden_size": 384 });
        assert_eq!(read_usize(&config, "hidden_size").unwrap(), 384);
        let err = read_usize(&config, "max_position_embeddings").unwrap_err();
        assert!(err.to_string().contains("max_position_embeddings"));
    }

    #[tokio::test]
    async fn default_model_produces_unit_vectors() {
        if !model_tests_enabled() {
            eprintln!("skipping: set EMBEDSERVE_RUN_MODEL_TESTS=1 to download and run the model");
            return;
        }

        let config = EmbeddingConfig::default();
        let model = EmbeddingModel::load(&config, select_device(false, None))
            .await
            .unwrap();
        assert_eq!(model.embedding_dimension(), 384);
        assert_eq!(model.model_name(), "all-MiniLM-L6-v2");

        let texts = vec![
            "hello world".to_string(),
            "a considerably longer sentence that forces the batch to be padded".to_string(),
            "third".to_string(),
        ];
        let embeddings = model.encode(texts.clone(), 2).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
        }

        // Padding within a chunk must not change a text's embedding
        let alone = model.encode(vec![texts[0].clone()], 1).await.unwrap();
        let diff: f32 = alone[0]
            .iter()
            .zip(&embeddings[0])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max);
        assert!(diff < 1e-4, "max diff was {diff}");
    }
}
