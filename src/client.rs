// src/client.rs
//! Backend paging API seam and its HTTP implementation.

use crate::error::{HistoryError, Result};
use crate::model::Page;
use crate::query::RequestDescriptor;
use async_trait::async_trait;
use std::fmt;

/// Path of the history endpoint below the configured base URL
pub const HISTORY_PATH: &str = "alarm-history";

/// Pre-resolved bearer credential handed over by the session manager
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(Option<String>);

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl From<Option<String>> for Credential {
    fn from(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.is_empty()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Credential(bearer ***)"),
            None => f.write_str("Credential(anonymous)"),
        }
    }
}

/// One page request against the history backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryApi: Send + Sync {
    async fn fetch_page(&self, request: &RequestDescriptor, credential: &Credential) -> Result<Page>;

    fn name(&self) -> &str;
}

/// Map a non-success HTTP status to the error surfaced to the UI.
pub fn classify_status(status: u16, body: &str) -> HistoryError {
    let detail = if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body.trim())
    };
    match status {
        401 | 403 => HistoryError::AuthExpired(detail),
        _ => HistoryError::NetworkFailure(detail),
    }
}

/// Decode a response body into a [`Page`].
pub fn decode_page(body: &str) -> Result<Page> {
    serde_json::from_str(body).map_err(|e| HistoryError::MalformedResponse(e.to_string()))
}

#[cfg(feature = "http")]
pub use http::HttpHistoryApi;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::config::ApiConfig;
    use reqwest::{Client, Url};
    use std::time::Duration;
    use tracing::{debug, warn};

    /// reqwest-backed [`HistoryApi`]
    pub struct HttpHistoryApi {
        client: Client,
        base_url: Url,
    }

    impl HttpHistoryApi {
        pub fn new(config: &ApiConfig) -> Result<Self> {
            let base_url = Url::parse(config.base_url.trim())
                .map_err(|e| HistoryError::Config(format!("Invalid api.base_url: {}", e)))?;
            let client = Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .user_agent(config.user_agent.clone())
                .build()
                .map_err(|e| HistoryError::Config(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self { client, base_url })
        }

        /// Full request URL for `request`
        pub fn endpoint(&self, request: &RequestDescriptor) -> Result<Url> {
            endpoint_url(&self.base_url, request)
        }
    }

    pub(super) fn endpoint_url(base: &Url, request: &RequestDescriptor) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| HistoryError::Config(format!("Base URL '{}' cannot hold a path", base)))?
            .pop_if_empty()
            .push(HISTORY_PATH);
        url.query_pairs_mut().extend_pairs(request.query_pairs());
        Ok(url)
    }

    #[async_trait]
    impl HistoryApi for HttpHistoryApi {
        async fn fetch_page(&self, request: &RequestDescriptor, credential: &Credential) -> Result<Page> {
            let url = self.endpoint(request)?;
            debug!("GET {}", url);

            let mut builder = self.client.get(url);
            if let Some(token) = credential.token() {
                builder = builder.bearer_auth(token);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HistoryError::NetworkFailure("request timed out".to_string())
                } else {
                    HistoryError::NetworkFailure(e.to_string())
                }
            })?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| HistoryError::NetworkFailure(e.to_string()))?;

            if !status.is_success() {
                warn!("History request rejected with {}", status);
                return Err(classify_status(status.as_u16(), &body));
            }
            decode_page(&body)
        }

        fn name(&self) -> &str {
            "http"
        }
    }
}
