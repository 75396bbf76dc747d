//! Per-request configuration.
//!
//! A [`RequestConfig`] describes one request: target, method, headers, query
//! parameters, body, timeout, auth, and cancellation handle. Each call to
//! [`HttpClient::request`](crate::HttpClient::request) merges a call-site
//! config over the client defaults into a fresh effective config; the stored
//! defaults are never mutated by a call.

use crate::cancel::CancelToken;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Custom query-string serializer. Receives the merged `params` pairs and
/// returns the serialized query string (without a leading `?`).
pub type ParamsSerializer = Arc<dyn Fn(&[(String, String)]) -> String + Send + Sync>;

/// Request body with its implied content type.
#[derive(Debug, Clone)]
pub struct Body {
    bytes: Bytes,
    content_type: Option<&'static str>,
}

impl Body {
    /// Raw bytes, no content type implied.
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    /// Plain text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            bytes: Bytes::from(text.into().into_bytes()),
            content_type: Some("text/plain; charset=utf-8"),
        }
    }

    /// JSON-encoded body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            bytes: Bytes::from(serde_json::to_vec(value)?),
            content_type: Some("application/json"),
        })
    }

    /// Form-urlencoded body.
    pub fn form<T: Serialize>(value: &T) -> Result<Self, serde_urlencoded::ser::Error> {
        Ok(Self {
            bytes: Bytes::from(serde_urlencoded::to_string(value)?.into_bytes()),
            content_type: Some("application/x-www-form-urlencoded"),
        })
    }

    /// The body bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The implied content type, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }
}

/// Basic-auth credentials, rendered to an `Authorization` header by the
/// dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    /// Username.
    pub username: String,
    /// Password; `None` sends `user:`.
    pub password: Option<String>,
}

/// Configuration for one request.
#[derive(Clone, Default)]
pub struct RequestConfig {
    /// Request path or absolute URL.
    pub url: Option<String>,
    /// HTTP method; lower-cased during normalization, `"get"` if absent
    /// from both the call site and the client defaults.
    pub method: Option<String>,
    /// Base URL joined with `url` by the dispatcher.
    pub base_url: Option<String>,
    /// Header name/value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Query parameters, in insertion order.
    pub params: Vec<(String, String)>,
    /// Custom query-string serializer; form-urlencoding when unset.
    pub params_serializer: Option<ParamsSerializer>,
    /// Request body.
    pub data: Option<Body>,
    /// Per-request deadline enforced by the dispatcher.
    pub timeout: Option<Duration>,
    /// Basic-auth credentials.
    pub auth: Option<BasicAuth>,
    /// Cancellation handle consulted by the dispatcher.
    pub cancel_token: Option<CancelToken>,
    pub(crate) build_error: Option<String>,
}

impl RequestConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add multiple headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in headers {
            self.headers.push((k.into(), v.into()));
        }
        self
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add multiple query parameters.
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in params {
            self.params.push((k.into(), v.into()));
        }
        self
    }

    /// Set a custom query-string serializer.
    pub fn params_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(&[(String, String)]) -> String + Send + Sync + 'static,
    {
        self.params_serializer = Some(Arc::new(serializer));
        self
    }

    /// Set the request body as raw bytes.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.data = Some(Body::bytes(body));
        self
    }

    /// Set the request body as text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.data = Some(Body::text(text));
        self
    }

    /// Set the request body as JSON.
    ///
    /// A serialization failure is deferred: the config is marked invalid
    /// and the call that uses it rejects during normalization.
    pub fn json<T: Serialize>(mut self, json: &T) -> Self {
        match Body::json(json) {
            Ok(body) => self.data = Some(body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize JSON body");
                self.build_error = Some(format!("JSON body: {e}"));
            }
        }
        self
    }

    /// Set the request body as form data.
    pub fn form<T: Serialize>(mut self, form: &T) -> Self {
        match Body::form(form) {
            Ok(body) => self.data = Some(body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode form data");
                self.build_error = Some(format!("form body: {e}"));
            }
        }
        self
    }

    /// Set a custom timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set basic authentication.
    pub fn basic_auth(
        mut self,
        username: impl Into<String>,
        password: Option<impl Into<String>>,
    ) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password: password.map(Into::into),
        });
        self
    }

    /// Set bearer authentication.
    pub fn bearer_auth(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field(
                "params_serializer",
                &self.params_serializer.as_ref().map(|_| "<fn>"),
            )
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("auth", &self.auth)
            .field("cancel_token", &self.cancel_token.is_some())
            .finish()
    }
}

/// Call-site arguments for [`HttpClient::request`](crate::HttpClient::request).
///
/// Lets callers pass a bare URL, a full config, or both:
///
/// ```rust,no_run
/// # use courier_http::{HttpClient, RequestConfig};
/// # async fn demo(client: HttpClient) -> courier_http::Result<()> {
/// client.request("https://example.com/users").await?;
/// client.request(RequestConfig::new().url("/users").method("post")).await?;
/// client.request(("/users", RequestConfig::new().param("page", "2"))).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub enum RequestArgs {
    /// A full configuration.
    Config(RequestConfig),
    /// A bare URL with an otherwise empty configuration.
    Url(String),
    /// A URL injected into the given configuration.
    UrlWithConfig(String, RequestConfig),
}

impl RequestArgs {
    /// Collapse to a canonical configuration, injecting the URL variant's
    /// URL into its `url` field.
    pub(crate) fn into_config(self) -> RequestConfig {
        match self {
            RequestArgs::Config(config) => config,
            RequestArgs::Url(url) => RequestConfig::new().url(url),
            RequestArgs::UrlWithConfig(url, config) => config.url(url),
        }
    }
}

impl From<RequestConfig> for RequestArgs {
    fn from(config: RequestConfig) -> Self {
        RequestArgs::Config(config)
    }
}

impl From<&str> for RequestArgs {
    fn from(url: &str) -> Self {
        RequestArgs::Url(url.to_string())
    }
}

impl From<String> for RequestArgs {
    fn from(url: String) -> Self {
        RequestArgs::Url(url)
    }
}

impl From<(&str, RequestConfig)> for RequestArgs {
    fn from((url, config): (&str, RequestConfig)) -> Self {
        RequestArgs::UrlWithConfig(url.to_string(), config)
    }
}

impl From<(String, RequestConfig)> for RequestArgs {
    fn from((url, config): (String, RequestConfig)) -> Self {
        RequestArgs::UrlWithConfig(url, config)
    }
}
