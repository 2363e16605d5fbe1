//! Scripted executor for unit tests.

use super::{BodyError, HttpExecutor, HttpResponse, HttpResult, MemoryBody, PathType, RawBody};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub chunks: Vec<Bytes>,
    pub error: Option<BodyError>,
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: Vec::new(),
            chunks: Vec::new(),
            error: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.chunks.push(body.into());
        self
    }

    /// Body delivered in the given chunk sizes, to exercise partial reads.
    pub fn chunked_body(mut self, body: &[u8], chunk_size: usize) -> Self {
        for chunk in body.chunks(chunk_size.max(1)) {
            self.chunks.push(Bytes::copy_from_slice(chunk));
        }
        self
    }

    pub fn failing_with(mut self, error: BodyError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Answers calls from a url -> response table; unknown urls get no response.
#[derive(Default)]
pub struct MockExecutor {
    responses: HashMap<String, MockResponse>,
    calls: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HttpExecutor for MockExecutor {
    async fn make_http_call(
        &self,
        url: &str,
        _path_type: PathType,
        _method: Method,
        _headers: &HeaderMap,
        _allow_redirects: bool,
    ) -> Option<HttpResult> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        let mock = self.responses.get(url)?.clone();

        let mut headers = HeaderMap::new();
        for (name, value) in &mock.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }

        let mut body = MemoryBody::new(mock.chunks);
        if let Some(error) = mock.error {
            body = body.failing_with(error);
        }

        Some(HttpResult::new(
            url,
            HttpResponse {
                status: mock.status,
                headers,
                body: RawBody::new(body),
            },
        ))
    }
}
