//! Scripted transport for unit tests

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use url::Url;

use crate::error::{BridgeError, ErrorBody, Result};
use crate::transport::{TextStream, Transport};
use crate::types::ChatPayload;

/// What the transport does when opened
pub enum Script {
    /// Stream these chunks, then end
    Chunks(Vec<&'static str>),
    /// Stream these chunks, then fail with a connection reset
    FailAfter(Vec<&'static str>),
    /// Stream these chunks, then hang until dropped
    Hang(Vec<&'static str>),
    /// Answer with a non-200 status and body
    Status(u16, &'static str),
    /// Fail to connect
    Refused,
}

/// Transport returning canned bodies and recording how it was called
pub struct ScriptedTransport {
    script: Script,
    calls: AtomicUsize,
    last_payload: Mutex<Option<ChatPayload>>,
    last_timeout: Mutex<Option<Duration>>,
    released: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
            last_timeout: Mutex::new(None),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn chunks(chunks: &[&'static str]) -> Self {
        Self::new(Script::Chunks(chunks.to_vec()))
    }

    /// Number of times a stream was opened
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<ChatPayload> {
        self.last_payload.lock().unwrap().clone()
    }

    pub fn last_timeout(&self) -> Option<Duration> {
        *self.last_timeout.lock().unwrap()
    }

    /// Whether the last body handed out has been dropped
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open_stream(&self, url: &Url, payload: &ChatPayload, timeout: Duration) -> Result<TextStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_payload.lock().unwrap() = Some(payload.clone());
        *self.last_timeout.lock().unwrap() = Some(timeout);
        self.released.store(false, Ordering::SeqCst);

        let ok = |chunks: &[&'static str]| -> Vec<Result<Bytes>> {
            chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect()
        };

        let body = match &self.script {
            Script::Chunks(chunks) => stream::iter(ok(chunks)).boxed(),
            Script::FailAfter(chunks) => {
                let mut items = ok(chunks);
                items.push(Err(BridgeError::connection(url, "connection reset by peer")));
                stream::iter(items).boxed()
            }
            Script::Hang(chunks) => stream::iter(ok(chunks)).chain(stream::pending()).boxed(),
            Script::Status(status, body) => {
                return Err(BridgeError::ServerError {
                    url: url.clone(),
                    status: *status,
                    body: ErrorBody::parse(body),
                });
            }
            Script::Refused => return Err(BridgeError::connection(url, "connection refused")),
        };

        let tracked = Tracked {
            inner: body,
            released: Arc::clone(&self.released),
        };

        Ok(TextStream::new(url.clone(), tracked))
    }
}

/// Body wrapper that records when it is dropped
pub struct Tracked<S> {
    pub inner: S,
    pub released: Arc<AtomicBool>,
}

impl<S: Stream + Unpin> Stream for Tracked<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<S> Drop for Tracked<S> {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
