//! # HTTP Retrieval
//!
//! Asynchronous API client over `reqwest`, with transient-failure retries
//! (exponential backoff) and JSON in both directions.

use anyhow::Context;
use reqwest::{
    header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE},
    Method, Url,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};

/// Retries on top of the first attempt for 5xx, 408, 429 and network errors.
pub const MAX_RETRIES: u32 = 3;

/// Outcome of one request.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// Decoded body of a successful response. `None` when the body was empty.
    pub data: Option<T>,
    /// Raw body of a failed response.
    pub error_body: Option<String>,
    /// HTTP status code.
    pub status: u16,
    /// True for 2xx.
    pub success: bool,
    /// Response headers.
    pub headers: HeaderMap,
}

/// HTTP client bound to one API base URL.
pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a client for `base_url`, sending `auth_token` as a Bearer
    /// token on every request when present.
    ///
    /// A missing trailing `/` is added so relative paths join under the
    /// base path instead of replacing its last segment.
    ///
    /// # Errors
    /// Fails if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, auth_token: Option<String>) -> anyhow::Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let url = Url::parse(&normalized)
            .with_context(|| format!("invalid API base URL (must be absolute): {}", base_url))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url: url,
            auth_token,
        })
    }

    /// Base URL every path is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends one request and decodes the response.
    ///
    /// Non-2xx statuses are not errors here: they come back with
    /// `success == false` and the raw body in `error_body`.
    ///
    /// # Errors
    /// URL joining, body encoding, network failures after retries, and
    /// undecodable 2xx bodies.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        headers: Option<HeaderMap>,
        body: Option<B>,
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let full_url = self.base_url.join(path)?;
        log::debug!("{} {}", method, full_url);
        let mut req = self.inner.request(method, full_url);

        if let Some(h) = headers {
            req = req.headers(h);
        }
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(b) = body {
            let json_body = serde_json::to_string(&b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let resp_headers = response.headers().clone();

        if status.is_success() {
            let text = response.text().await?;
            let data = if text.trim().is_empty() {
                None
            } else {
                Some(serde_json::from_str::<T>(&text).context("undecodable response body")?)
            };
            Ok(ApiResponse {
                data,
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            let error_text = response.text().await.ok();
            log::warn!("Request failed with status {}", status);
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }
}
