//! Streaming transport to the bridge server
//!
//! One completion call is one `POST /chat`. The response body is exposed as
//! a `TextStream` of UTF-8 fragments, read incrementally as it arrives.

use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, FusedStream, Stream, StreamExt};
use reqwest::StatusCode;
use url::Url;

use crate::error::{BridgeError, ErrorBody, Result};
use crate::types::ChatPayload;

/// Raw body chunks, already mapped into the bridge error taxonomy
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Opens completion streams
///
/// Implementations must map every failure to `ConnectionFailure` or
/// `ServerError`; callers rely on never seeing a raw transport error.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return its body as a lazy fragment stream
    async fn open_stream(&self, url: &Url, payload: &ChatPayload, timeout: Duration) -> Result<TextStream>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured `reqwest` client (proxies, TLS roots, ...)
    pub const fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_stream(&self, url: &Url, payload: &ChatPayload, timeout: Duration) -> Result<TextStream> {
        tracing::debug!(
            %url,
            vendor = payload.vendor.as_deref(),
            family = payload.family.as_deref(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "opening completion stream"
        );

        // The timeout covers the whole exchange, body included
        let response = self
            .http
            .post(url.as_str())
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| BridgeError::from_transport(url, e))?;

        let response = handle_error(url, response).await?;

        let body_url = url.clone();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| BridgeError::from_transport(&body_url, e)));

        Ok(TextStream::new(url.clone(), body))
    }
}

/// Turn a non-200 response into a `ServerError`
async fn handle_error(url: &Url, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let raw = response
        .text()
        .await
        .map_err(|e| BridgeError::from_transport(url, e))?;
    let body = ErrorBody::parse(&raw);

    tracing::warn!(%url, status = status.as_u16(), %body, "bridge server returned an error");

    Err(BridgeError::ServerError {
        url: url.clone(),
        status: status.as_u16(),
        body,
    })
}

/// Single-pass stream of text fragments from one response body
///
/// Yields every non-empty fragment in arrival order. After the body ends or
/// fails the stream is closed: the body (and with it the connection) is
/// dropped immediately and further polls return `None`. Dropping the stream
/// early releases the connection the same way.
pub struct TextStream {
    url: Url,
    state: State,
    decoder: Utf8Decoder,
    fragments: usize,
}

enum State {
    Open(ByteStream),
    Closed,
}

impl TextStream {
    /// Wrap a body stream
    pub fn new<S>(url: Url, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            url,
            state: State::Open(body.boxed()),
            decoder: Utf8Decoder::default(),
            fragments: 0,
        }
    }

    /// Endpoint this stream reads from
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Whether the stream has finished, failed, or been closed
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Abandon the stream and release its connection
    pub fn close(&mut self) {
        if let State::Open(_) = self.state {
            tracing::debug!(url = %self.url, fragments = self.fragments, "completion stream closed early");
        }
        self.state = State::Closed;
    }

    /// Drain the stream into one string, in arrival order
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the body
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }

    fn finish(&mut self) {
        tracing::debug!(url = %self.url, fragments = self.fragments, "completion stream ended");
        self.state = State::Closed;
    }

    fn emit(&mut self, fragment: String) -> Poll<Option<Result<String>>> {
        self.fragments += 1;
        Poll::Ready(Some(Ok(fragment)))
    }
}

impl Stream for TextStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let State::Open(body) = &mut this.state else {
                return Poll::Ready(None);
            };

            match ready!(body.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => {
                    let fragment = this.decoder.push(&bytes);
                    if !fragment.is_empty() {
                        return this.emit(fragment);
                    }
                }
                Some(Err(error)) => {
                    this.finish();
                    return Poll::Ready(Some(Err(error)));
                }
                None => {
                    let rest = this.decoder.finish();
                    this.finish();
                    if rest.is_empty() {
                        return Poll::Ready(None);
                    }
                    return this.emit(rest);
                }
            }
        }
    }
}

impl FusedStream for TextStream {
    fn is_terminated(&self) -> bool {
        self.is_closed()
    }
}

impl std::fmt::Debug for TextStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStream")
            .field("url", &self.url)
            .field("closed", &self.is_closed())
            .field("fragments", &self.fragments)
            .finish_non_exhaustive()
    }
}

/// Incremental UTF-8 decoder
///
/// Holds back a code point split across reads until its remaining bytes
/// arrive. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut decoded = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    decoded.push_str(text);
                    self.pending.clear();
                    return decoded;
                }
                Err(error) => {
                    let valid = error.valid_up_to();
                    decoded.push_str(&String::from_utf8_lossy(&self.pending[..valid]));

                    match error.error_len() {
                        // Incomplete code point at the end: wait for more bytes
                        None => {
                            self.pending.drain(..valid);
                            return decoded;
                        }
                        Some(len) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
