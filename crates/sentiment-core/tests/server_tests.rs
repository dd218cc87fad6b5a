//! Integration tests for the session server public interface.
//!
//! These tests drive the server over real loopback sockets with stub
//! predictors, covering the protocol properties: order preservation,
//! singleton normalization, session independence, clean EOF handling,
//! shutdown behavior, and the admission cap.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sentiment_core::{Labeled, Predictor, Result, ServerConfig, SessionServer};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Labels each text by keyword: "great" is positive, the rest negative.
struct KeywordPredictor;

#[async_trait::async_trait]
impl Predictor for KeywordPredictor {
    async fn predict(&self, batch: Vec<String>) -> Result<Vec<Labeled>> {
        Ok(batch
            .into_iter()
            .map(|text| {
                let label = i64::from(text.contains("great"));
                Labeled(text, label)
            })
            .collect())
    }
}

/// Sleeps before answering when a text asks for it, so tests can overlap
/// an in-flight prediction with traffic on another session.
struct SlowPredictor;

#[async_trait::async_trait]
impl Predictor for SlowPredictor {
    async fn predict(&self, batch: Vec<String>) -> Result<Vec<Labeled>> {
        if batch.iter().any(|t| t.contains("slow")) {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        Ok(batch.into_iter().map(|text| Labeled(text, 0)).collect())
    }
}

async fn connect(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.expect("connect failed")
}

async fn roundtrip(stream: &mut TcpStream, request: &str) -> String {
    stream.write_all(request.as_bytes()).await.unwrap();
    stream.write_all(b"\n").await.unwrap();

    let (reader, _) = stream.split();
    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line).await.unwrap();
    line.trim_end().to_string()
}

#[tokio::test]
async fn test_order_and_length_preserved() {
    let handle = SessionServer::start(Arc::new(KeywordPredictor), "127.0.0.1", 0)
        .await
        .unwrap();

    let texts: Vec<String> = (0..50).map(|i| format!("comment {i}")).collect();
    let request = serde_json::to_string(&texts).unwrap();

    let mut stream = connect(handle.addr()).await;
    let response = roundtrip(&mut stream, &request).await;

    let results: Vec<(String, i64)> = serde_json::from_str(&response).unwrap();
    assert_eq!(results.len(), texts.len());
    for (text, (echoed, _)) in texts.iter().zip(&results) {
        assert_eq!(text, echoed);
    }
}

#[tokio::test]
async fn test_singleton_normalization() {
    let handle = SessionServer::start(Arc::new(KeywordPredictor), "127.0.0.1", 0)
        .await
        .unwrap();

    let mut stream = connect(handle.addr()).await;
    let bare = roundtrip(&mut stream, r#""hello""#).await;
    let wrapped = roundtrip(&mut stream, r#"["hello"]"#).await;

    assert_eq!(bare, wrapped);
    assert_eq!(bare, r#"[["hello",0]]"#);
}

#[tokio::test]
async fn test_empty_batch_yields_empty_result() {
    let handle = SessionServer::start(Arc::new(KeywordPredictor), "127.0.0.1", 0)
        .await
        .unwrap();

    let mut stream = connect(handle.addr()).await;
    let response = roundtrip(&mut stream, "[]").await;
    assert_eq!(response, "[]");
}

#[tokio::test]
async fn test_non_ascii_text_survives_the_wire() {
    let handle = SessionServer::start(Arc::new(KeywordPredictor), "127.0.0.1", 0)
        .await
        .unwrap();

    let mut stream = connect(handle.addr()).await;
    let response = roundtrip(&mut stream, r#"["정말 재밌는 영화"]"#).await;

    assert!(response.contains("정말 재밌는 영화"));
    assert!(!response.contains("\\u"));
}

#[tokio::test]
async fn test_clean_eof_writes_nothing() {
    let handle = SessionServer::start(Arc::new(KeywordPredictor), "127.0.0.1", 0)
        .await
        .unwrap();

    let mut stream = connect(handle.addr()).await;
    stream.shutdown().await.unwrap();

    // The session sees EOF before any frame and closes without a response.
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sessions_are_independent() {
    let handle = SessionServer::start(Arc::new(SlowPredictor), "127.0.0.1", 0)
        .await
        .unwrap();
    let addr = handle.addr();

    // Park one session inside a slow prediction.
    let mut slow_stream = connect(addr).await;
    let slow_task = tokio::spawn(async move { roundtrip(&mut slow_stream, r#"["slow one"]"#).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A second session gets its own answer while the first is in flight.
    let mut fast_stream = connect(addr).await;
    let fast_response = tokio::time::timeout(
        Duration::from_millis(200),
        roundtrip(&mut fast_stream, r#"["quick one"]"#),
    )
    .await
    .expect("fast session blocked behind slow session");
    assert_eq!(fast_response, r#"[["quick one",0]]"#);

    // The slow session still receives exactly its own result.
    let slow_response = slow_task.await.unwrap();
    assert_eq!(slow_response, r#"[["slow one",0]]"#);
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let mut handle = SessionServer::start(Arc::new(KeywordPredictor), "127.0.0.1", 0)
        .await
        .unwrap();
    let addr = handle.addr();

    // Live before shutdown.
    let mut stream = connect(addr).await;
    assert_eq!(roundtrip(&mut stream, r#"["great"]"#).await, r#"[["great",1]]"#);

    handle.shutdown();

    // The listening socket is released shortly after the signal.
    let mut refused = false;
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_err() {
            refused = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(refused, "listener still accepting after shutdown");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_admission_cap_rejects_excess_connections() {
    let handle = SessionServer::start(Arc::new(KeywordPredictor), "127.0.0.1", 0)
        .await
        .unwrap();
    let addr = handle.addr();

    // Fill the server to capacity with live sessions.
    let mut sessions = Vec::new();
    for _ in 0..ServerConfig::MAX_SESSIONS {
        let mut stream = connect(addr).await;
        let response = roundtrip(&mut stream, r#"["hi"]"#).await;
        assert_eq!(response, r#"[["hi",0]]"#);
        sessions.push(stream);
    }

    // The next connection is dropped without a response. The write may
    // observe a reset if the server closes the socket first.
    let mut rejected = connect(addr).await;
    let _ = rejected.write_all(b"[\"hi\"]\n").await;
    let mut buf = Vec::new();
    match rejected.read_to_end(&mut buf).await {
        Ok(_) => assert!(buf.is_empty()),
        Err(_) => {} // connection reset, also a rejection
    }

    // Established sessions keep working at capacity.
    let response = roundtrip(&mut sessions[0], r#"["still great"]"#).await;
    assert_eq!(response, r#"[["still great",1]]"#);
}
