//! Core HTTP plumbing shared by every typed endpoint.

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::ApiError;

/// Hard cap on any JSON response body. Rejection happens at `cap + 1`: a
/// body of exactly this size is accepted.
pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Per-request deadline for all coordination RPCs.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed JSON client for the BeadHub service.
///
/// Cheap to clone; the underlying transport is shared and safe to use from
/// many tasks concurrently.
#[derive(Clone)]
pub struct BeadHubClient {
    base_url: Url,
    api_key: Option<String>,
    http: Client,
    response_cap: usize,
}

impl BeadHubClient {
    /// Build a client for `base_url`, optionally carrying a bearer api key.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Url(e.to_string()))?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .use_rustls_tls()
            .build()
            .map_err(|e| ApiError::Url(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            api_key,
            http,
            response_cap: MAX_RESPONSE_BYTES,
        })
    }

    /// Override the response cap. Test seam; production code keeps
    /// [`MAX_RESPONSE_BYTES`].
    #[doc(hidden)]
    #[must_use]
    pub fn with_response_cap(mut self, cap: usize) -> Self {
        self.response_cap = cap;
        self
    }

    /// The configured service base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, escaping each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Url("base URL cannot carry path segments".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn response_cap(&self) -> usize {
        self.response_cap
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self.http.request(method, url).header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
        }
        builder
    }

    pub(crate) async fn get_json<T, Q>(
        &self,
        segments: &[&str],
        query: Option<&Q>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let mut builder = self.request(Method::GET, self.endpoint(segments)?);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        self.send_json(builder).await
    }

    pub(crate) async fn post_json<T, B>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, self.endpoint(segments)?).json(body);
        self.send_json(builder).await
    }

    /// DELETE with 404 mapped to `None` for idempotent removal.
    pub(crate) async fn delete(&self, segments: &[&str]) -> Result<Option<()>, ApiError> {
        let builder = self.request(Method::DELETE, self.endpoint(segments)?);
        match self.send_raw(builder).await {
            Ok(_) => Ok(Some(())),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Send a prepared request and decode the JSON body under the cap.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.send_raw(builder).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send a prepared request, check the status, and collect the capped
    /// body bytes.
    pub(crate) async fn send_raw(&self, builder: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = builder.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "beadhub response");

        let body = collect_capped(response.bytes_stream(), self.response_cap).await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        Ok(body)
    }
}

pub(crate) fn status_error(status: StatusCode, body: &[u8]) -> ApiError {
    ApiError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

/// Accumulate a byte stream, rejecting as soon as the total would pass
/// `limit`. A body of exactly `limit` bytes is accepted.
pub(crate) async fn collect_capped<S, E>(mut stream: S, limit: usize) -> Result<Vec<u8>, ApiError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ApiError::Unreachable(e.to_string()))?;
        if buf.len() + chunk.len() > limit {
            return Err(ApiError::ResponseTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Accumulate at most `limit` bytes and silently drop the rest. Used for
/// error bodies, where truncation beats a second error.
pub(crate) async fn collect_truncated<S, E>(mut stream: S, limit: usize) -> Vec<u8>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        let remaining = limit.saturating_sub(buf.len());
        if remaining == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
    }
    buf
}
