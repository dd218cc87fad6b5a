//! ONNX Runtime predictor for sequence classification checkpoints.
//!
//! Loads an exported HuggingFace-style model directory (`model.onnx` plus
//! `tokenizer.json`) once at startup and serves `predict` calls for the
//! process lifetime. Inference runs on the blocking thread pool so a busy
//! model never stalls the session tasks.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::info;

use crate::config::ModelConfig;
use crate::error::{Result, SentimentError};
use crate::predictor::{Labeled, Predictor};

/// Sequence-classification predictor backed by ONNX Runtime.
///
/// Construction is expensive and happens exactly once, before the server
/// starts. The CUDA execution provider is registered first and ONNX
/// Runtime falls back to CPU when no device is available.
///
/// # Concurrency
///
/// Safe to call from any number of sessions: tokenization is reentrant,
/// and session runs are serialized behind an internal mutex. Callers need
/// no locking of their own.
pub struct OnnxPredictor {
    inner: Arc<Inner>,
}

struct Inner {
    tokenizer: Tokenizer,
    session: Mutex<Session>,
}

impl OnnxPredictor {
    /// Load the model and tokenizer from `model_dir`.
    ///
    /// Fails with [`SentimentError::ModelNotFound`] naming the resolved
    /// absolute path when the directory or either artifact is missing.
    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let model_path = model_dir.join(ModelConfig::MODEL_FILENAME);
        let tokenizer_path = model_dir.join(ModelConfig::TOKENIZER_FILENAME);

        if !model_path.is_file() || !tokenizer_path.is_file() {
            return Err(SentimentError::ModelNotFound(absolute(model_dir)));
        }

        info!("Loading model and tokenizer from {}", model_dir.display());

        let mut tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| SentimentError::Tokenizer {
                message: e.to_string(),
            })?;
        tokenizer.with_padding(Some(PaddingParams::default()));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: ModelConfig::MAX_SEQUENCE_LENGTH,
                ..TruncationParams::default()
            }))
            .map_err(|e| SentimentError::Tokenizer {
                message: e.to_string(),
            })?;

        let session = Session::builder()?
            .with_execution_providers([CUDAExecutionProvider::default().build()])?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&model_path)?;

        Ok(Self {
            inner: Arc::new(Inner {
                tokenizer,
                session: Mutex::new(session),
            }),
        })
    }
}

#[async_trait::async_trait]
impl Predictor for OnnxPredictor {
    async fn predict(&self, batch: Vec<String>) -> Result<Vec<Labeled>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.predict_blocking(batch))
            .await
            .map_err(|e| SentimentError::Inference {
                message: format!("inference task failed: {e}"),
            })?
    }
}

impl Inner {
    fn predict_blocking(&self, texts: Vec<String>) -> Result<Vec<Labeled>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.clone(), true)
            .map_err(|e| SentimentError::Tokenizer {
                message: e.to_string(),
            })?;

        // Batch-longest padding makes every encoding the same length.
        let batch = encodings.len();
        let seq_len = encodings.first().map(|e| e.len()).unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch * seq_len);
        let mut attention_mask = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let input_ids = Tensor::from_array(([batch, seq_len], input_ids))?;
        let attention_mask = Tensor::from_array(([batch, seq_len], attention_mask))?;

        let mut session = self.session.lock().map_err(|_| SentimentError::Inference {
            message: "inference session lock poisoned".to_string(),
        })?;
        let outputs = session.run(ort::inputs![
            "input_ids" => input_ids,
            "attention_mask" => attention_mask,
        ])?;

        let logits = outputs
            .get("logits")
            .ok_or_else(|| SentimentError::Inference {
                message: "model produced no 'logits' output".to_string(),
            })?;
        let (shape, logits) = logits.try_extract_tensor::<f32>()?;
        if shape.len() != 2 || shape[1] <= 0 {
            return Err(SentimentError::Inference {
                message: format!("unexpected logits shape {shape:?}"),
            });
        }
        let num_labels = shape[1] as usize;

        let results = texts
            .into_iter()
            .zip(logits.chunks(num_labels))
            .map(|(text, row)| Labeled(text, argmax(row)))
            .collect();
        Ok(results)
    }
}

/// Index of the largest logit; the first wins on ties.
fn argmax(row: &[f32]) -> i64 {
    let mut best = 0;
    for (i, value) in row.iter().enumerate() {
        if *value > row[best] {
            best = i;
        }
    }
    best as i64
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
