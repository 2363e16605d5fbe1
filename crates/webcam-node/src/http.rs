//! The HTTP executor boundary.
//!
//! The resolver never talks to the network directly. It hands a URL to an
//! [`HttpExecutor`] and gets back an [`HttpResult`]: status, a mutable header
//! map, and a [`RawBody`] that can be read in bounded pieces or buffered in
//! full. Dropping a `RawBody` releases the underlying connection.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use thiserror::Error;

pub mod client;
#[cfg(test)]
pub mod mock;

pub use client::ReqwestExecutor;

/// Largest body the resolver will hold in memory, snapshot or stream frame.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// How a URL should be resolved by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    /// Relative to the local web server, e.g. `/webcam/?action=stream`
    Relative,
    /// A full `http(s)://` URL
    Absolute,
}

impl PathType {
    pub fn of(url: &str) -> Self {
        if url.starts_with('/') {
            PathType::Relative
        } else {
            PathType::Absolute
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BodyError {
    #[error("read timed out")]
    Timeout,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("body is larger than {0} bytes")]
    TooLarge(usize),
}

/// A chunked source of response body bytes.
#[async_trait]
pub trait BodySource: Send {
    /// Next chunk of the body, `None` once the body is complete.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError>;
}

/// Response body with bounded reads.
///
/// Bytes pulled from the source beyond what a caller asked for are held in
/// `pending` and handed out by the next read, so a caller never consumes more
/// of the stream than it requested.
pub struct RawBody {
    source: Option<Box<dyn BodySource>>,
    pending: BytesMut,
}

impl RawBody {
    pub fn new(source: impl BodySource + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            pending: BytesMut::new(),
        }
    }

    pub fn empty() -> Self {
        Self {
            source: None,
            pending: BytesMut::new(),
        }
    }

    /// Reads exactly `len` bytes, or fewer if the body ends first.
    pub async fn read(&mut self, len: usize) -> Result<Bytes, BodyError> {
        while self.pending.len() < len {
            if !self.pull().await? {
                break;
            }
        }
        let take = len.min(self.pending.len());
        Ok(self.pending.split_to(take).freeze())
    }

    /// Reads everything that's left, giving up once more than `limit` bytes are held.
    pub async fn read_to_end(&mut self, limit: usize) -> Result<Bytes, BodyError> {
        while self.pull().await? {
            if self.pending.len() > limit {
                self.close();
                return Err(BodyError::TooLarge(limit));
            }
        }
        Ok(self.pending.split().freeze())
    }

    /// Next available bytes, for relaying the body as-is.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        if !self.pending.is_empty() {
            return Ok(Some(self.pending.split().freeze()));
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        match source.next_chunk().await {
            Ok(Some(chunk)) => Ok(Some(chunk)),
            Ok(None) => {
                self.source = None;
                Ok(None)
            }
            Err(e) => {
                self.source = None;
                Err(e)
            }
        }
    }

    /// Drops the source, releasing the connection. Already-pending bytes stay readable.
    pub fn close(&mut self) {
        self.source = None;
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, BodyError>> + Send + 'static {
        futures::stream::unfold(Some(self), |body| async move {
            let mut body = body?;
            match body.next_chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(body))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Pulls one chunk into `pending`. Returns false once the source is exhausted.
    async fn pull(&mut self) -> Result<bool, BodyError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        match source.next_chunk().await {
            Ok(Some(chunk)) => {
                self.pending.extend_from_slice(&chunk);
                Ok(true)
            }
            Ok(None) => {
                self.source = None;
                Ok(false)
            }
            Err(e) => {
                self.source = None;
                Err(e)
            }
        }
    }
}

/// In-memory body, used for synthetic results and tests.
pub struct MemoryBody {
    chunks: std::collections::VecDeque<Bytes>,
    trailing_error: Option<BodyError>,
}

impl MemoryBody {
    pub fn new(chunks: Vec<Bytes>) -> Self {
        Self {
            chunks: chunks.into(),
            trailing_error: None,
        }
    }

    /// Fails with `error` once the chunks run out, like a dropped connection.
    pub fn failing_with(mut self, error: BodyError) -> Self {
        self.trailing_error = Some(error);
        self
    }
}

#[async_trait]
impl BodySource for MemoryBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(Some(chunk));
        }
        match self.trailing_error.take() {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: RawBody,
}

/// Outcome of one HTTP call.
pub struct HttpResult {
    url: String,
    response: HttpResponse,
    full_body: Option<Bytes>,
}

impl HttpResult {
    pub fn new(url: impl Into<String>, response: HttpResponse) -> Self {
        Self {
            url: url.into(),
            response,
            full_body: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.status = status;
    }

    /// Only a plain 200 counts; cameras answering 204/206 aren't serving an image.
    pub fn is_success(&self) -> bool {
        self.response.status == StatusCode::OK
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.response.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response.headers
    }

    /// Header value as a string, if present and readable.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.response.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_mut(&mut self) -> &mut RawBody {
        &mut self.response.body
    }

    pub fn full_body(&self) -> Option<&Bytes> {
        self.full_body.as_ref()
    }

    pub fn set_full_body(&mut self, body: Bytes) {
        self.full_body = Some(body);
    }

    /// Buffers the whole body unless that already happened.
    pub async fn buffer_body(&mut self) -> Result<Bytes, BodyError> {
        if let Some(body) = &self.full_body {
            return Ok(body.clone());
        }
        let body = self.response.body.read_to_end(MAX_BODY_SIZE).await?;
        self.full_body = Some(body.clone());
        Ok(body)
    }

    pub fn into_parts(self) -> (HttpResponse, Option<Bytes>) {
        (self.response, self.full_body)
    }
}

/// Performs HTTP calls on behalf of the resolver.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Returns `None` when no response was received at all (refused, timed out, bad url).
    async fn make_http_call(
        &self,
        url: &str,
        path_type: PathType,
        method: Method,
        headers: &HeaderMap,
        allow_redirects: bool,
    ) -> Option<HttpResult>;
}

/// A plain GET that follows redirects, the way every webcam url is fetched.
pub async fn get_following_redirects(executor: &dyn HttpExecutor, url: &str) -> Option<HttpResult> {
    executor
        .make_http_call(url, PathType::of(url), Method::GET, &HeaderMap::new(), true)
        .await
}
