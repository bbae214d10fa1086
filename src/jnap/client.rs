//! HTTP transport for JNAP action calls, with timeouts and error classification

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::{JnapError, ProtocolError};
use crate::jnap::{Endpoint, ACTION_NAMESPACE};
use crate::models::JnapResponse;
use crate::parser;

const JNAP_ACTION: &str = "X-JNAP-Action";
const JNAP_AUTHORIZATION: &str = "X-JNAP-Authorization";

/// Actions in use take no parameters
const EMPTY_BODY: &str = "{}";

/// Longest slice of an error body kept in a [`ProtocolError::Status`]
const MAX_ERROR_BODY: usize = 200;

/// Sends authenticated JNAP actions to one router
///
/// No retries and no session state: each call stands alone.
pub struct JnapClient {
    inner: Client,
    endpoint: Endpoint,
}

impl JnapClient {
    pub fn new(endpoint: Endpoint, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(endpoint, http.timeout(), http.connect_timeout())
    }

    pub fn with_timeouts(
        endpoint: Endpoint,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("linksys-jnap/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let inner = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { inner, endpoint })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Invoke a JNAP action and return the decoded response
    ///
    /// `requires_auth` only annotates the call; credentials are always sent.
    /// A response whose `result` is not "OK" is returned as `Ok`.
    pub async fn invoke(&self, action: &str, requires_auth: bool) -> Result<JnapResponse, JnapError> {
        let url = self.endpoint.jnap_url();
        tracing::debug!(action, requires_auth, "Invoking JNAP action");

        let resp = self
            .inner
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(JNAP_ACTION, format!("{}{}", ACTION_NAMESPACE, action))
            .header(JNAP_AUTHORIZATION, self.endpoint.authorization())
            .body(EMPTY_BODY)
            .send()
            .await
            .map_err(|source| {
                if source.is_builder() {
                    JnapError::InvalidRequest {
                        url: url.clone(),
                        source,
                    }
                } else {
                    JnapError::Transport {
                        url: url.clone(),
                        source,
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(JnapError::Protocol {
                action: action.to_string(),
                source: ProtocolError::Status {
                    status,
                    body: text.chars().take(MAX_ERROR_BODY).collect(),
                },
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|source| JnapError::Transport { url, source })?;

        let response = parser::parse_response(&body).map_err(|source| JnapError::Protocol {
            action: action.to_string(),
            source,
        })?;

        tracing::debug!(action, result = %response.result, "JNAP action completed");
        Ok(response)
    }
}
