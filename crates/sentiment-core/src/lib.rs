//! Sentiment Core - Headless library for serving a text classifier over TCP.
//!
//! This crate provides the pieces of a long-lived sentiment classification
//! service: the predictor contract and its ONNX-backed implementation, the
//! newline-framed JSON wire protocol, and the session server that ties them
//! together. It can be used programmatically without the `sentimentd` binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sentiment_core::{OnnxPredictor, SessionServer};
//!
//! #[tokio::main]
//! async fn main() -> sentiment_core::Result<()> {
//!     let predictor = Arc::new(OnnxPredictor::load("./model/sentiment_model")?);
//!     let handle = SessionServer::start(predictor, "127.0.0.1", 5000).await?;
//!     println!("listening on {}", handle.addr());
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod predictor;
pub mod server;

// Re-export commonly used types
pub use config::{ModelConfig, ServerConfig};
pub use error::{Result, SentimentError};
pub use predictor::{Labeled, OnnxPredictor, Predictor};
pub use server::{ServerHandle, SessionServer};
