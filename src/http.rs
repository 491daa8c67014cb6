//! HTTP client utilities for talking to the generation endpoint.
//!
//! Headers that never change between requests are computed once: the
//! content type is installed as a default on the underlying
//! `reqwest::Client`, the bearer value is kept by the client and attached
//! to each request once the key has been checked.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;

use crate::client::ClientError;
use crate::options::{ClientConfig, SecretString};

/// Headers shared by every request regardless of the key.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Build the `Authorization: Bearer <key>` value.
///
/// The value is marked sensitive so it is redacted from `Debug` output.
pub fn authorization_header(api_key: &SecretString) -> Result<HeaderValue, ClientError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
        .map_err(|_| ClientError::InvalidApiKey)?;
    auth.set_sensitive(true);
    Ok(auth)
}

/// Build a configured HTTP client from the client configuration.
///
/// This applies the exchange timeout, the proxy and the content type.
///
/// # Example
/// ```ignore
/// let client = build_http_client(&config)?;
/// ```
pub fn build_http_client(config: &ClientConfig) -> Result<Client, ClientError> {
    let mut builder = Client::builder()
        .timeout(config.timeout)
        .default_headers(default_headers());

    if let Some(proxy_url) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ClientError::Config(format!("invalid proxy {}: {}", proxy_url, e)))?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// Add extra headers to a request if specified in the configuration.
///
/// # Example
/// ```ignore
/// let mut req = client.post(url);
/// req = add_extra_headers(req, &config.extra_headers);
/// ```
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}
