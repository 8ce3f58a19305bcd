//! Lookup client configuration.
//!
//! All upstream-facing knobs live here: the endpoint, the fixed browser
//! fingerprint profile, the per-attempt timeout, and the cookie/form-field
//! names the service expects. The structure is built once and stays
//! read-only for the lifetime of the client.

use std::time::Duration;

use url::Url;

/// Per-attempt timeout applied independently to each upstream exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cookie name the verification script stores its token under.
pub const DEFAULT_COOKIE_NAME: &str = "__test";

/// Form field name carrying the query subject.
pub const DEFAULT_FORM_FIELD: &str = "message";

/// Fixed fingerprint header set sent with every upstream request.
///
/// The service expects this exact Chrome-on-Android profile; the values are
/// static configuration, never computed per request. Origin and Referer are
/// derived from the endpoint and added by the dispatcher.
pub const FINGERPRINT_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Linux; Android 10) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Mobile Safari/537.36",
    ),
    (
        "Accept-Language",
        "en-IN,en-GB;q=0.9,en-US;q=0.8,en;q=0.7,hi;q=0.6",
    ),
    ("Accept-Encoding", "gzip, deflate, br, zstd"),
    (
        "sec-ch-ua",
        "\"Google Chrome\";v=\"141\", \"Not?A_Brand\";v=\"8\", \"Chromium\";v=\"141\"",
    ),
    ("sec-ch-ua-mobile", "?1"),
    ("sec-ch-ua-platform", "\"Android\""),
    ("Sec-Fetch-Site", "same-origin"),
    ("Sec-Fetch-Mode", "cors"),
    ("Sec-Fetch-Dest", "empty"),
    ("Connection", "keep-alive"),
];

/// Immutable configuration shared by the dispatcher and the orchestrator.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Upstream endpoint receiving the POST, query string included.
    pub endpoint: Url,
    /// Fingerprint headers sent verbatim on every attempt.
    pub headers: Vec<(String, String)>,
    /// Bound on each individual exchange.
    pub timeout: Duration,
    /// Cookie name carrying a session token when one is available.
    pub cookie_name: String,
    /// Name of the single multipart form field.
    pub form_field: String,
}

impl LookupConfig {
    /// Configuration with the stock fingerprint profile for `endpoint`.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            headers: FINGERPRINT_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            timeout: DEFAULT_TIMEOUT,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            form_field: DEFAULT_FORM_FIELD.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_form_field(mut self, name: impl Into<String>) -> Self {
        self.form_field = name.into();
        self
    }

    /// Origin header value derived from the endpoint.
    pub fn origin(&self) -> String {
        origin_from_url(&self.endpoint)
    }

    /// Referer header value; the service expects its own URL here.
    pub fn referer(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Cookie header value carrying `token`.
    pub fn cookie_header(&self, token: &str) -> String {
        format!("{}={}", self.cookie_name, token)
    }
}

/// Build origin header value from URL (`scheme://host[:port]`).
pub fn origin_from_url(url: &Url) -> String {
    let mut origin = format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""));
    if let Some(port) = url.port() {
        origin.push(':');
        origin.push_str(&port.to_string());
    }
    origin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://upstream.test/uploads/abc/web.php?i=1").unwrap()
    }

    #[test]
    fn origin_drops_path_and_query() {
        let config = LookupConfig::new(endpoint());
        assert_eq!(config.origin(), "https://upstream.test");
        assert_eq!(
            config.referer(),
            "https://upstream.test/uploads/abc/web.php?i=1"
        );
    }

    #[test]
    fn origin_keeps_explicit_port() {
        let url = Url::parse("http://upstream.test:8080/lookup").unwrap();
        assert_eq!(origin_from_url(&url), "http://upstream.test:8080");
    }

    #[test]
    fn cookie_header_uses_configured_name() {
        let config = LookupConfig::new(endpoint());
        assert_eq!(config.cookie_header("abc123"), "__test=abc123");

        let renamed = LookupConfig::new(endpoint()).with_cookie_name("session");
        assert_eq!(renamed.cookie_header("abc123"), "session=abc123");
    }

    #[test]
    fn fingerprint_profile_is_complete() {
        let config = LookupConfig::new(endpoint());
        for required in ["User-Agent", "Accept-Encoding", "sec-ch-ua", "Sec-Fetch-Mode"] {
            assert!(
                config.headers.iter().any(|(name, _)| name == required),
                "missing header {required}"
            );
        }
    }
}
