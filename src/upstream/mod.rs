//! Outbound upstream exchange.
//!
//! One request, one response: the dispatcher owns the fixed fingerprint
//! profile and the multipart body, while retry decisions stay with the
//! orchestrator. The transport sits behind [`UpstreamTransport`] so tests
//! and embedders can substitute a scripted stub for the reqwest client.

use std::borrow::Cow;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER};
use reqwest::multipart::Form;
use thiserror::Error;

use crate::config::LookupConfig;

/// Immutable inputs for a single upstream attempt.
#[derive(Debug, Clone)]
pub struct LookupRequest {
    /// Query subject, e.g. a ten-digit number. Validation is the caller's
    /// concern; the dispatcher forwards the value verbatim.
    pub subject: String,
    /// Session token to ride the cookie header, when one is held.
    pub session_token: Option<String>,
}

impl LookupRequest {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

/// Raw upstream response handed to classification. Owned transiently by
/// the attempt that produced it.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    status: u16,
    body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text; challenge pages are scanned in this form.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Failure of a single exchange. A timed-out or half-delivered exchange is
/// an error, never a partial success.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid header value for '{0}'")]
    InvalidHeader(String),
    #[error("http transport error: {0}")]
    Transport(String),
}

/// Contract abstracting the transport used for upstream attempts.
///
/// Implementations perform exactly one exchange per call; retry
/// orchestration belongs to the caller.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn send(&self, request: &LookupRequest) -> Result<UpstreamResponse, DispatchError>;
}

/// Reqwest-backed production dispatcher.
#[derive(Debug)]
pub struct ReqwestDispatcher {
    client: reqwest::Client,
    config: LookupConfig,
}

impl ReqwestDispatcher {
    /// Build a dispatcher carrying the fingerprint profile as default
    /// headers and the configured per-attempt timeout.
    pub fn new(config: LookupConfig) -> Result<Self, DispatchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DispatchError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| DispatchError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&config.origin())
                .map_err(|_| DispatchError::InvalidHeader("origin".into()))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(config.referer())
                .map_err(|_| DispatchError::InvalidHeader("referer".into()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl UpstreamTransport for ReqwestDispatcher {
    async fn send(&self, request: &LookupRequest) -> Result<UpstreamResponse, DispatchError> {
        let form = Form::new().text(self.config.form_field.clone(), request.subject.clone());

        let mut builder = self
            .client
            .post(self.config.endpoint.clone())
            .multipart(form);

        if let Some(token) = &request.session_token {
            let cookie = self.config.cookie_header(token);
            let value = HeaderValue::from_str(&cookie)
                .map_err(|_| DispatchError::InvalidHeader("cookie".into()))?;
            builder = builder.header(COOKIE, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        log::debug!("upstream responded {status} with {} body bytes", body.len());

        Ok(UpstreamResponse::new(status, body))
    }
}
