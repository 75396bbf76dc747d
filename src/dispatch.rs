//! The dispatch seam: where a fully transformed configuration becomes
//! network I/O.
//!
//! The interceptor pipeline is transport-agnostic; its terminal step hands
//! the effective [`RequestConfig`] to a [`Dispatcher`]. The bundled
//! [`ReqwestDispatcher`] covers the common case; tests and exotic transports
//! plug in their own.

use crate::config::{ParamsSerializer, RequestConfig};
use crate::{Error, Response, Result};
use async_trait::async_trait;
use http::Method;
use tracing::debug;

/// Terminal pipeline stage performing the actual transport I/O.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send the request described by `config` and produce its response.
    async fn dispatch(&self, config: RequestConfig) -> Result<Response>;
}

/// Serialize query parameters, honoring a custom serializer when set.
pub(crate) fn serialize_params(
    params: &[(String, String)],
    serializer: Option<&ParamsSerializer>,
) -> String {
    if params.is_empty() {
        return String::new();
    }
    match serializer {
        Some(f) => f(params),
        None => serde_urlencoded::to_string(params).unwrap_or_default(),
    }
}

/// Append a serialized query string to a URL string, using `?` or `&`
/// depending on whether the URL already carries a query.
pub(crate) fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{query}")
}

/// Resolve the absolute request URL: join `base_url` and `url`, then
/// append the serialized `params`.
pub(crate) fn build_url(config: &RequestConfig) -> Result<url::Url> {
    let path = config.url.as_deref().unwrap_or("");
    let raw = if let Some(base) = &config.base_url {
        let base = url::Url::parse(base).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        base.join(path)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?
            .to_string()
    } else {
        path.to_string()
    };

    let query = serialize_params(&config.params, config.params_serializer.as_ref());
    url::Url::parse(&append_query(&raw, &query)).map_err(|e| Error::InvalidUrl(e.to_string()))
}

/// Dispatcher backed by a shared [`reqwest::Client`].
#[derive(Clone, Default)]
pub struct ReqwestDispatcher {
    inner: reqwest::Client,
}

impl ReqwestDispatcher {
    /// Create a dispatcher with a default reqwest client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher over a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { inner: client }
    }

    async fn send(&self, config: &RequestConfig) -> Result<Response> {
        let url = build_url(config)?;
        let method = config.method.as_deref().unwrap_or("get");
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::RequestBuild(format!("invalid method {method:?}: {e}")))?;

        debug!(method = %method, url = %url, "Dispatching HTTP request");

        let mut request = self.inner.request(method, url);

        for (name, value) in &config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(auth) = &config.auth {
            use base64::Engine;
            let credentials = match &auth.password {
                Some(p) => format!("{}:{}", auth.username, p),
                None => format!("{}:", auth.username),
            };
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            request = request.header(http::header::AUTHORIZATION, format!("Basic {encoded}"));
        }

        if let Some(body) = &config.data {
            if let Some(content_type) = body.content_type()
                && !has_header(&config.headers, "content-type")
            {
                request = request.header(http::header::CONTENT_TYPE, content_type);
            }
            request = request.body(body.as_bytes().clone());
        }

        let response = if let Some(timeout) = config.timeout {
            tokio::time::timeout(timeout, request.send())
                .await
                .map_err(|_| Error::Timeout(timeout))??
        } else {
            request.send().await?
        };

        debug!(status = %response.status(), "Received HTTP response");

        Ok(Response::from_reqwest(response).await)
    }
}

fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
}

#[async_trait]
impl Dispatcher for ReqwestDispatcher {
    async fn dispatch(&self, config: RequestConfig) -> Result<Response> {
        match config.cancel_token.clone() {
            Some(token) => {
                if let Some(reason) = token.reason() {
                    return Err(Error::Cancelled(reason));
                }
                tokio::select! {
                    reason = token.cancelled() => Err(Error::Cancelled(reason)),
                    result = self.send(&config) => result,
                }
            }
            None => self.send(&config).await,
        }
    }
}
