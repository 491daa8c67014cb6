//! Client configuration and protocol defaults.

use std::collections::HashMap;
use std::time::Duration;

/// Endpoint used when no base URL is supplied.
pub const DEFAULT_BASE_URL: &str = "https://sintelli.workers.dev/api/v1/";

/// Ceiling on a whole HTTP exchange, including the streamed body.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Speaker role sent when the caller does not pick one.
pub const DEFAULT_ROLE: &str = "user";

/// Generation length cap sent when the caller does not pick one.
pub const DEFAULT_MAX_TOKENS: u32 = 16234;

/// Server-side generation timeout hint, in seconds.
pub const DEFAULT_SERVER_TIMEOUT_SECS: u32 = 5;

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone, Default)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// True when no key was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Construction-time settings shared by every request a client sends.
///
/// Empty `api_key` or `base_url` values are accepted here and rejected when a
/// request is attempted.
///
/// # Example
/// ```rust
/// use sintelli::options::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("sk-...", "https://sintelli.workers.dev/api/v1/")
///     .with_timeout(Duration::from_secs(120))
///     .with_header("x-trace".to_string(), "on".to_string());
///
/// assert_eq!(config.timeout, Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bearer token for all requests from this client
    pub api_key: SecretString,

    /// Endpoint URL for all requests from this client
    pub base_url: String,

    /// Timeout for the whole HTTP exchange
    pub timeout: Duration,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ClientConfig {
    /// Create a configuration for the given key and endpoint.
    pub fn new(api_key: impl Into<SecretString>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: DEFAULT_HTTP_TIMEOUT,
            proxy: None,
            extra_headers: None,
        }
    }

    /// Create a configuration pointing at [`DEFAULT_BASE_URL`].
    pub fn with_api_key(api_key: impl Into<SecretString>) -> Self {
        Self::new(api_key, DEFAULT_BASE_URL)
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}
