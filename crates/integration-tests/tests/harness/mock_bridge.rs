//! Mock bridge server for integration tests
//!
//! Serves `POST /chat` with a scripted reply and records every request body

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// How the mock answers `POST /chat`
#[derive(Debug, Clone)]
pub enum Reply {
    /// Stream these chunks with a pause before each one
    Chunks { chunks: Vec<&'static str>, delay: Duration },
    /// Answer with an error status and a JSON body
    Json(StatusCode, Value),
    /// Answer with an error status and a plain-text body
    Text(StatusCode, &'static str),
    /// Wait this long before sending any response
    Stall(Duration),
    /// Send a chunk every `interval`, forever
    Trickle { chunk: &'static str, interval: Duration },
}

/// Mock bridge server that returns predictable responses
pub struct MockBridge {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockBridgeState>,
}

struct MockBridgeState {
    reply: Reply,
    request_count: AtomicU32,
    requests: Mutex<Vec<Value>>,
    /// Set when a response body stream is dropped by the server
    body_dropped: Arc<AtomicBool>,
}

impl MockBridge {
    /// Start the mock server, returning immediately
    pub async fn start(reply: Reply) -> anyhow::Result<Self> {
        let state = Arc::new(MockBridgeState {
            reply,
            request_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            body_dropped: Arc::new(AtomicBool::new(false)),
        });

        let app = Router::new()
            .route("/chat", routing::post(handle_chat))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Start a mock streaming these chunks, 50ms apart
    pub async fn with_chunks(chunks: &[&'static str]) -> anyhow::Result<Self> {
        Self::start(Reply::Chunks {
            chunks: chunks.to_vec(),
            delay: Duration::from_millis(50),
        })
        .await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of `POST /chat` requests received
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::SeqCst)
    }

    /// Body of the most recent request
    pub fn last_request(&self) -> Option<Value> {
        self.state.requests.lock().unwrap().last().cloned()
    }

    /// Whether the server has let go of a streaming response body
    pub fn body_dropped(&self) -> bool {
        self.state.body_dropped.load(Ordering::SeqCst)
    }
}

impl Drop for MockBridge {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Address nothing listens on
pub async fn refused_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn handle_chat(State(state): State<Arc<MockBridgeState>>, Json(body): Json<Value>) -> Response {
    state.request_count.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(body);

    match state.reply.clone() {
        Reply::Chunks { chunks, delay } => {
            let body = stream::iter(chunks).then(move |chunk| async move {
                tokio::time::sleep(delay).await;
                Ok::<_, Infallible>(Bytes::from_static(chunk.as_bytes()))
            });
            text_response(Body::from_stream(body))
        }
        Reply::Json(status, body) => (status, Json(body)).into_response(),
        Reply::Text(status, body) => (status, body).into_response(),
        Reply::Stall(wait) => {
            tokio::time::sleep(wait).await;
            text_response(Body::from("too late"))
        }
        Reply::Trickle { chunk, interval } => {
            let guard = DropFlag(Arc::clone(&state.body_dropped));
            let body = stream::repeat(chunk).then(move |chunk| {
                let _alive = &guard;
                async move {
                    tokio::time::sleep(interval).await;
                    Ok::<_, Infallible>(Bytes::from_static(chunk.as_bytes()))
                }
            });
            text_response(Body::from_stream(body))
        }
    }
}

fn text_response(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// Sets its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
