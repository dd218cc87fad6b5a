//! Predictor contract and implementations.
//!
//! The session server only ever sees the [`Predictor`] trait; how labels
//! are computed is the implementation's business. The production
//! implementation is [`OnnxPredictor`].

mod onnx;

pub use onnx::OnnxPredictor;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One classified text: the original input paired with its predicted label.
///
/// Serializes as a two-element JSON array `[text, label]`, the shape the
/// wire protocol emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labeled(pub String, pub i64);

/// Batch text classification behind a narrow, share-safe contract.
///
/// # Concurrency
///
/// Implementations must be callable concurrently from any number of
/// sessions without external synchronization: either the underlying engine
/// is safely reentrant, or the implementation serializes internally.
/// Callers never wrap predictor calls in a lock of their own.
#[async_trait::async_trait]
pub trait Predictor: Send + Sync + 'static {
    /// Classify a batch of texts.
    ///
    /// Returns one [`Labeled`] per input, in input order. An empty batch
    /// yields an empty result. The call may suspend the calling task for
    /// the duration of inference but must not block unrelated tasks.
    async fn predict(&self, batch: Vec<String>) -> Result<Vec<Labeled>>;
}
