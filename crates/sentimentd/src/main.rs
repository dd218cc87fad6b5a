//! Sentiment classification daemon.
//!
//! Loads a sentiment model once at startup and serves it over a
//! persistent, line-delimited TCP protocol: clients send one JSON-encoded
//! batch of texts per line and receive one JSON line of `[text, label]`
//! pairs back.

use anyhow::Result;
use clap::Parser;
use sentiment_core::{ModelConfig, OnnxPredictor, ServerConfig, SessionServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "sentimentd")]
#[command(about = "TCP server for batch sentiment classification")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = ServerConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = ServerConfig::DEFAULT_HOST)]
    host: String,

    /// Directory containing model.onnx and tokenizer.json
    #[arg(short, long, default_value = ModelConfig::DEFAULT_MODEL_DIR)]
    model_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting sentiment server");

    // The server must not start without a working predictor.
    let predictor = Arc::new(OnnxPredictor::load(&args.model_dir)?);

    let mut handle = SessionServer::start(predictor, &args.host, args.port).await?;
    info!("Sentiment server running on {}", handle.addr());

    // Wait for shutdown signal; in-flight sessions finish on their own.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    handle.shutdown();

    Ok(())
}
