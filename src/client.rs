//! Authenticated HTTP client for the music Web API
//!
//! [`ApiClient`] is the rate-limited fetcher every other component goes
//! through. It carries the bearer credential as a default header, absorbs 429
//! responses via [`crate::retry`], and checks status codes.
//!
//! Cloning is cheap and clones share both the connection pool and the request
//! counters. Two clients created separately never share counters. The pool is
//! released once the last clone is dropped.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::retry::{FetchCounters, send_with_throttle_retry};
use crate::types::{Endpoints, FetchStats};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// One GET request: URL, query parameters and status policy
///
/// The credential is not part of the request; it belongs to the client that
/// sends it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute URL
    pub url: String,
    /// Query parameters appended to the URL
    pub query: Vec<(String, String)>,
    /// Per-request override of [`ApiConfig::strict_status`]
    pub assert_ok: Option<bool>,
}

impl FetchRequest {
    /// GET `url` with no query parameters and the client's default status policy
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            assert_ok: None,
        }
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Fail on any non-2xx response regardless of the client's default
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.assert_ok = Some(true);
        self
    }

    /// Return non-2xx responses to the caller instead of failing
    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.assert_ok = Some(false);
        self
    }
}

/// Rate-limited, authenticated API client
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    strict_status: bool,
    counters: Arc<FetchCounters>,
}

impl ApiClient {
    /// Create a client that sends `Authorization: Bearer <token>` on every request
    ///
    /// # Errors
    /// - [`Error::Auth`] if the token cannot be placed in a header
    /// - [`Error::Network`] if the HTTP client cannot be built
    pub fn new(token: &str, config: &ApiConfig) -> Result<Self> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::Auth(format!("token is not a valid header value: {e}")))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoints: Endpoints::new(&config.base_url),
            strict_status: config.strict_status,
            counters: Arc::new(FetchCounters::default()),
        })
    }

    /// Endpoint URLs under the configured base URL
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Requests sent and 429s absorbed so far by this client and its clones
    pub fn stats(&self) -> FetchStats {
        self.counters.snapshot()
    }

    /// Send one GET, retrying on 429 until the server lets it through
    ///
    /// # Errors
    /// - [`Error::Status`] for a non-2xx response when status checking applies
    /// - [`Error::Network`] / [`Error::RetryAfter`] as for
    ///   [`send_with_throttle_retry`]
    pub async fn fetch(&self, request: &FetchRequest) -> Result<reqwest::Response> {
        debug!(url = %request.url, params = request.query.len(), "GET");

        let response = send_with_throttle_retry(&self.counters, || {
            self.http.get(&request.url).query(&request.query).send()
        })
        .await?;

        if request.assert_ok.unwrap_or(self.strict_status) {
            ensure_success(response).await
        } else {
            Ok(response)
        }
    }

    /// Fetch with status checking forced on and parse the body as JSON
    ///
    /// # Errors
    /// As [`ApiClient::fetch`], plus [`Error::Serialization`] for a non-JSON body.
    pub async fn fetch_json(&self, request: &FetchRequest) -> Result<Value> {
        let request = request.clone().strict();
        let response = self.fetch(&request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Turn a non-2xx response into [`Error::Status`], keeping headers and body
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));

    tracing::error!(status = status.as_u16(), url = %url, body = %body, "Request failed");

    Err(Error::Status {
        status,
        url,
        headers,
        body,
    })
}
