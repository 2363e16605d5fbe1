use super::{BodyError, BodySource, HttpExecutor, HttpResponse, HttpResult, PathType, RawBody};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client, Method};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

const MAX_REDIRECTS: usize = 10;

/// [`HttpExecutor`] backed by reqwest.
///
/// Relative paths are resolved against the local web server. There is no
/// overall request timeout since streams are unbounded; instead the time to
/// headers and the gap between body chunks are each capped by `read_timeout`.
pub struct ReqwestExecutor {
    local_base_url: String,
    following: Client,
    not_following: Client,
    read_timeout: Duration,
}

impl ReqwestExecutor {
    pub fn new(
        local_base_url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let following = Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .context("failed to build http client")?;
        let not_following = Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(redirect::Policy::none())
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            local_base_url: local_base_url.into().trim_end_matches('/').to_string(),
            following,
            not_following,
            read_timeout,
        })
    }

    pub fn resolve_url(&self, url: &str, path_type: PathType) -> String {
        match path_type {
            PathType::Relative => format!("{}{}", self.local_base_url, url),
            PathType::Absolute => url.to_string(),
        }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn make_http_call(
        &self,
        url: &str,
        path_type: PathType,
        method: Method,
        headers: &HeaderMap,
        allow_redirects: bool,
    ) -> Option<HttpResult> {
        let full_url = self.resolve_url(url, path_type);
        let client = if allow_redirects {
            &self.following
        } else {
            &self.not_following
        };

        let send = client
            .request(method.clone(), &full_url)
            .headers(headers.clone())
            .send();

        let response = match timeout(self.read_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                debug!(url = %full_url, method = %method, error = %e, "http call failed");
                return None;
            }
            Err(_) => {
                debug!(url = %full_url, method = %method, "http call timed out waiting for headers");
                return None;
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = RawBody::new(ReqwestBody {
            response,
            read_timeout: self.read_timeout,
        });

        Some(HttpResult::new(
            final_url,
            HttpResponse {
                status,
                headers,
                body,
            },
        ))
    }
}

struct ReqwestBody {
    response: reqwest::Response,
    read_timeout: Duration,
}

#[async_trait]
impl BodySource for ReqwestBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        match timeout(self.read_timeout, self.response.chunk()).await {
            Ok(Ok(chunk)) => Ok(chunk),
            Ok(Err(e)) if e.is_timeout() => Err(BodyError::Timeout),
            Ok(Err(e)) => Err(BodyError::Connection(e.to_string())),
            Err(_) => Err(BodyError::Timeout),
        }
    }
}
