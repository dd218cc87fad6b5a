//! TCP session server for batch text classification.
//!
//! Listens on a configured endpoint and runs one session task per accepted
//! connection. A session repeatedly reads one newline-framed JSON request,
//! forwards the batch to the shared [`Predictor`], and writes the labeled
//! results back as one JSON line, until the peer disconnects or an error
//! tears the connection down.
//!
//! # Thread Safety
//!
//! The server runs on the tokio runtime. Sessions are independent tasks
//! that share only the predictor (via `Arc`); a malformed request or I/O
//! failure terminates its own session and nothing else.

pub mod protocol;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, SentimentError};
use crate::predictor::Predictor;
use protocol::{read_frame, write_frame, Request};

/// Handle to a running session server. Dropping shuts down the accept loop.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the server is listening on (useful when bound to port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and release the listening socket.
    ///
    /// Sessions already accepted are not interrupted; each runs to its own
    /// natural termination.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// The session server: a supervising accept loop plus per-connection
/// session tasks.
pub struct SessionServer;

impl SessionServer {
    /// Bind `host:port` and start serving in background tasks.
    ///
    /// The predictor must already be constructed; the server never starts
    /// without one. Bind failure is fatal to startup.
    pub async fn start<P: Predictor>(
        predictor: Arc<P>,
        host: &str,
        port: u16,
    ) -> Result<ServerHandle> {
        let addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|_| SentimentError::Config {
                    message: format!("invalid listen address: {host}:{port}"),
                })?;
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        info!("Session server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let active_sessions = Arc::new(AtomicUsize::new(0));

        let task_handle = tokio::spawn(Self::accept_loop(
            listener,
            predictor,
            shutdown_rx,
            active_sessions,
        ));

        Ok(ServerHandle {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        })
    }

    async fn accept_loop<P: Predictor>(
        listener: TcpListener,
        predictor: Arc<P>,
        mut shutdown_rx: oneshot::Receiver<()>,
        active_sessions: Arc<AtomicUsize>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Session server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let current = active_sessions.load(Ordering::Relaxed);
                            if current >= ServerConfig::MAX_SESSIONS {
                                warn!(
                                    "Rejecting connection from {}: at max capacity ({})",
                                    peer_addr,
                                    ServerConfig::MAX_SESSIONS
                                );
                                continue;
                            }

                            active_sessions.fetch_add(1, Ordering::Relaxed);
                            let predictor = predictor.clone();
                            let sessions = active_sessions.clone();

                            tokio::spawn(async move {
                                debug!("Client connected: {}", peer_addr);
                                match Self::run_session(stream, &*predictor).await {
                                    Ok(()) => debug!("Client disconnected: {}", peer_addr),
                                    Err(e) => debug!("Session with {} ended: {}", peer_addr, e),
                                }
                                sessions.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            // Transient; keep accepting.
                            error!("Accept error: {}", e);
                        }
                    }
                }
            }
        }
    }

    /// One session, from accept to close.
    ///
    /// Requests are processed strictly in arrival order. Any error return
    /// closes this connection only; the socket is released on every exit
    /// path when `stream` drops.
    async fn run_session<P: Predictor>(mut stream: TcpStream, predictor: &P) -> Result<()> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);

        loop {
            let frame = match read_frame(&mut reader).await? {
                Some(frame) => frame,
                None => return Ok(()), // Clean disconnect
            };

            let request: Request = serde_json::from_str(&frame)?;
            let results = predictor.predict(request.into_batch()).await?;

            let payload = serde_json::to_string(&results)?;
            write_frame(&mut writer, &payload).await?;
        }
    }
}
