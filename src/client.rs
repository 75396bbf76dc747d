//! HTTP client core: factory, request pipeline, and verb aliases.

use crate::config::{RequestArgs, RequestConfig};
use crate::dispatch::{Dispatcher, ReqwestDispatcher, append_query, serialize_params};
use crate::interceptor::Interceptors;
use crate::merge::merge_config;
use crate::{Error, Response, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

struct ClientInner {
    defaults: RwLock<RequestConfig>,
    interceptors: Interceptors,
    dispatcher: Arc<dyn Dispatcher>,
}

/// Config-driven HTTP client with interceptor chains and pluggable dispatch.
///
/// A client owns one default [`RequestConfig`] and two interceptor
/// registries. Cloning is cheap and produces a handle bound to the same
/// underlying client: a clone moved into a task or callback keeps
/// dispatching through the originating client's defaults and registries.
///
/// ```rust,no_run
/// use courier_http::{HttpClient, RequestConfig};
///
/// #[tokio::main]
/// async fn main() -> courier_http::Result<()> {
///     let client = HttpClient::new(
///         RequestConfig::new().base_url("https://api.example.com"),
///     );
///
///     let response = client.get("/users", None).await?;
///     println!("Status: {}", response.status());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

impl HttpClient {
    /// Create a client with the given defaults and the bundled reqwest
    /// dispatcher.
    pub fn new(defaults: RequestConfig) -> Self {
        Self::with_dispatcher(defaults, Arc::new(ReqwestDispatcher::new()))
    }

    /// Create a client over a custom [`Dispatcher`].
    pub fn with_dispatcher(defaults: RequestConfig, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                defaults: RwLock::new(defaults),
                interceptors: Interceptors::new(),
                dispatcher,
            }),
        }
    }

    /// Snapshot of the client defaults.
    pub fn defaults(&self) -> RequestConfig {
        self.inner.defaults.read().clone()
    }

    /// Replace the client defaults. Takes effect for subsequently
    /// initiated calls.
    pub fn set_defaults(&self, defaults: RequestConfig) {
        *self.inner.defaults.write() = defaults;
    }

    /// Update the client defaults in place.
    pub fn update_defaults(&self, f: impl FnOnce(RequestConfig) -> RequestConfig) {
        let mut defaults = self.inner.defaults.write();
        let current = std::mem::take(&mut *defaults);
        *defaults = f(current);
    }

    /// The client's interceptor registries.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// The dispatcher this client hands requests to.
    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        Arc::clone(&self.inner.dispatcher)
    }

    /// Create an independent client whose defaults are `overrides` merged
    /// over this client's current defaults.
    ///
    /// The new client gets fresh, empty interceptor registries and shares
    /// only the dispatcher; later mutation of either client's defaults or
    /// interceptors never affects the other.
    pub fn create(&self, overrides: RequestConfig) -> HttpClient {
        let defaults = merge_config(self.defaults(), overrides);
        Self::with_dispatcher(defaults, self.dispatcher())
    }

    /// Dispatch a request.
    ///
    /// Accepts a bare URL, a [`RequestConfig`], or a `(url, config)` pair
    /// (see [`RequestArgs`]). The call-site config is merged over the
    /// client defaults, the method is resolved (lower-cased, `"get"` when
    /// unspecified anywhere), and the result flows through the interceptor
    /// chain:
    ///
    /// - request interceptors, most recently registered first;
    /// - the dispatch step;
    /// - response interceptors, in registration order.
    ///
    /// Each stage runs only after the previous one settles. A stage's
    /// failure is offered to the next stage's `rejected` handler; with no
    /// recovering handler downstream it becomes the caller's error, and a
    /// request-side failure skips dispatch entirely.
    pub async fn request(&self, args: impl Into<RequestArgs>) -> Result<Response> {
        let call_config = args.into().into_config();

        // Merge over a snapshot of the defaults; the stored defaults are
        // never touched by a call.
        let defaults = self.defaults();
        let defaults_method = defaults.method.clone();
        let mut config = merge_config(defaults, call_config);

        if let Some(message) = config.build_error.take() {
            return Err(Error::RequestBuild(message));
        }

        // Method resolution consults the effective config first, then the
        // pre-merge defaults (the merge never carries `method` over), then
        // falls back to "get".
        config.method = Some(
            config
                .method
                .or(defaults_method)
                .map(|m| m.to_ascii_lowercase())
                .unwrap_or_else(|| "get".to_string()),
        );

        // Chain assembly snapshots both registries: ejection or
        // registration from here on affects only later calls.
        let request_chain = self.inner.interceptors.request.snapshot();
        let response_chain = self.inner.interceptors.response.snapshot();

        debug!(
            method = config.method.as_deref().unwrap_or(""),
            url = config.url.as_deref().unwrap_or(""),
            request_interceptors = request_chain.len(),
            response_interceptors = response_chain.len(),
            "Executing request pipeline"
        );

        let mut outcome: Result<RequestConfig> = Ok(config);
        for interceptor in request_chain.iter().rev() {
            outcome = match outcome {
                Ok(config) => interceptor.fulfilled(config).await,
                Err(error) => interceptor.rejected(error).await,
            };
        }

        // Terminal dispatch step. Its rejection slot is pass-through: an
        // unhandled request-side failure reaches the caller without any
        // transport I/O happening.
        let mut result: Result<Response> = match outcome {
            Ok(config) => self.inner.dispatcher.dispatch(config).await,
            Err(error) => Err(error),
        };

        for interceptor in &response_chain {
            result = match result {
                Ok(response) => interceptor.fulfilled(response).await,
                Err(error) => interceptor.rejected(error).await,
            };
        }

        result
    }

    /// Build the request URI for `config` merged over the client defaults:
    /// `url` plus serialized `params`, with a single leading `?` stripped.
    pub fn get_uri(&self, config: RequestConfig) -> String {
        let config = merge_config(self.defaults(), config);
        let query = serialize_params(&config.params, config.params_serializer.as_ref());
        let uri = append_query(config.url.as_deref().unwrap_or(""), &query);
        match uri.strip_prefix('?') {
            Some(stripped) => stripped.to_string(),
            None => uri,
        }
    }

    async fn request_without_data(
        &self,
        method: &str,
        url: String,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        let overlay = RequestConfig::new().method(method).url(url);
        self.request(merge_config(config.unwrap_or_default(), overlay))
            .await
    }

    async fn request_with_data<T: Serialize>(
        &self,
        method: &str,
        url: String,
        data: &T,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        let overlay = RequestConfig::new().method(method).url(url).json(data);
        self.request(merge_config(config.unwrap_or_default(), overlay))
            .await
    }

    /// Send a GET request.
    pub async fn get(
        &self,
        url: impl Into<String>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.request_without_data("get", url.into(), config).await
    }

    /// Send a DELETE request.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.request_without_data("delete", url.into(), config).await
    }

    /// Send a HEAD request.
    pub async fn head(
        &self,
        url: impl Into<String>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.request_without_data("head", url.into(), config).await
    }

    /// Send an OPTIONS request.
    pub async fn options(
        &self,
        url: impl Into<String>,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.request_without_data("options", url.into(), config).await
    }

    /// Send a POST request with a JSON-encoded body.
    pub async fn post<T: Serialize>(
        &self,
        url: impl Into<String>,
        data: &T,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.request_with_data("post", url.into(), data, config).await
    }

    /// Send a PUT request with a JSON-encoded body.
    pub async fn put<T: Serialize>(
        &self,
        url: impl Into<String>,
        data: &T,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.request_with_data("put", url.into(), data, config).await
    }

    /// Send a PATCH request with a JSON-encoded body.
    pub async fn patch<T: Serialize>(
        &self,
        url: impl Into<String>,
        data: &T,
        config: Option<RequestConfig>,
    ) -> Result<Response> {
        self.request_with_data("patch", url.into(), data, config).await
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(RequestConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::{request_fn, request_fn_with_rejected, response_fn, response_fn_with_rejected};
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use parking_lot::Mutex;

    /// Dispatcher that records every config it sees and replies with a
    /// canned response.
    struct MockDispatcher {
        seen: Mutex<Vec<RequestConfig>>,
        log: Option<Arc<Mutex<Vec<String>>>>,
        status: StatusCode,
    }

    impl MockDispatcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                log: None,
                status: StatusCode::OK,
            })
        }

        fn with_log(log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                log: Some(log),
                status: StatusCode::OK,
            })
        }

        fn seen(&self) -> Vec<RequestConfig> {
            self.seen.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl Dispatcher for MockDispatcher {
        async fn dispatch(&self, config: RequestConfig) -> Result<Response> {
            self.seen.lock().push(config.clone());
            if let Some(log) = &self.log {
                log.lock().push("dispatch".to_string());
            }
            Ok(Response::from_parts(
                self.status,
                HeaderMap::new(),
                url::Url::parse("https://mock.invalid/").unwrap(),
                Bytes::new(),
            ))
        }
    }

    fn client_with(dispatcher: Arc<MockDispatcher>) -> HttpClient {
        HttpClient::with_dispatcher(RequestConfig::new(), dispatcher)
    }

    fn log_request(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Arc<dyn crate::RequestInterceptor> {
        let log = Arc::clone(log);
        request_fn(move |config| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(tag.to_string());
                Ok(config)
            }
        })
    }

    fn log_response(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Arc<dyn crate::ResponseInterceptor> {
        let log = Arc::clone(log);
        response_fn(move |response| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(tag.to_string());
                Ok(response)
            }
        })
    }

    #[tokio::test]
    async fn test_interceptor_ordering_laws() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = MockDispatcher::with_log(Arc::clone(&log));
        let client = client_with(dispatcher);

        client.interceptors().request.use_interceptor(log_request(&log, "r1"));
        client.interceptors().request.use_interceptor(log_request(&log, "r2"));
        client.interceptors().response.use_interceptor(log_response(&log, "s1"));
        client.interceptors().response.use_interceptor(log_response(&log, "s2"));

        client.request("https://mock.invalid/x").await.unwrap();

        // Request side runs newest-first, response side in registration
        // order, dispatch in between.
        assert_eq!(*log.lock(), vec!["r2", "r1", "dispatch", "s1", "s2"]);
    }

    #[tokio::test]
    async fn test_url_shorthand_matches_explicit_config() {
        let dispatcher = MockDispatcher::new();
        let client = client_with(Arc::clone(&dispatcher));

        client.request("https://mock.invalid/u").await.unwrap();
        client
            .request(RequestConfig::new().url("https://mock.invalid/u"))
            .await
            .unwrap();

        let seen = dispatcher.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].url, seen[1].url);
        assert_eq!(seen[0].method, seen[1].method);
        assert_eq!(seen[0].method.as_deref(), Some("get"));
    }

    #[tokio::test]
    async fn test_method_defaults_to_get() {
        let dispatcher = MockDispatcher::new();
        let client = client_with(Arc::clone(&dispatcher));

        client.request("https://mock.invalid/").await.unwrap();
        assert_eq!(dispatcher.seen()[0].method.as_deref(), Some("get"));
    }

    #[tokio::test]
    async fn test_defaults_method_survives_merge_and_lowercases() {
        // `method` is request-scoped in the merge, so a defaults-level
        // method only reaches the wire through the resolution step that
        // consults the pre-merge defaults directly.
        let dispatcher = MockDispatcher::new();
        let client = HttpClient::with_dispatcher(
            RequestConfig::new().method("POST"),
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        );

        client.request("https://mock.invalid/").await.unwrap();
        assert_eq!(dispatcher.seen()[0].method.as_deref(), Some("post"));
    }

    #[tokio::test]
    async fn test_call_site_method_lowercased_and_wins() {
        let dispatcher = MockDispatcher::new();
        let client = HttpClient::with_dispatcher(
            RequestConfig::new().method("POST"),
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        );

        client
            .request(RequestConfig::new().url("https://mock.invalid/").method("PUT"))
            .await
            .unwrap();
        assert_eq!(dispatcher.seen()[0].method.as_deref(), Some("put"));
    }

    #[tokio::test]
    async fn test_eject_excludes_future_chains_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = MockDispatcher::with_log(Arc::clone(&log));
        let client = client_with(dispatcher);

        let id = client.interceptors().request.use_interceptor(log_request(&log, "a"));
        client.request("https://mock.invalid/").await.unwrap();
        client.interceptors().request.eject(id);
        client.request("https://mock.invalid/").await.unwrap();

        assert_eq!(*log.lock(), vec!["a", "dispatch", "dispatch"]);
    }

    #[tokio::test]
    async fn test_eject_mid_flight_does_not_affect_assembled_chain() {
        // Request side runs newest-first: "ejector" (registered second)
        // runs before "a". Ejecting "a" from inside the chain must not
        // remove it from the chain already being walked.
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = MockDispatcher::with_log(Arc::clone(&log));
        let client = client_with(dispatcher);

        let a = client.interceptors().request.use_interceptor(log_request(&log, "a"));
        let registry_client = client.clone();
        client.interceptors().request.use_interceptor(request_fn(move |config| {
            let registry_client = registry_client.clone();
            async move {
                registry_client.interceptors().request.eject(a);
                Ok(config)
            }
        }));

        client.request("https://mock.invalid/").await.unwrap();
        assert_eq!(*log.lock(), vec!["a", "dispatch"]);

        // The ejection does bind for the next call.
        client.request("https://mock.invalid/").await.unwrap();
        assert_eq!(*log.lock(), vec!["a", "dispatch", "dispatch"]);
    }

    #[tokio::test]
    async fn test_unhandled_request_rejection_skips_dispatch() {
        let dispatcher = MockDispatcher::new();
        let client = client_with(Arc::clone(&dispatcher));

        client
            .interceptors()
            .request
            .use_interceptor(request_fn(|_config| async move {
                Err(Error::Interceptor("blocked".into()))
            }));

        let err = client.request("https://mock.invalid/").await.unwrap_err();
        assert!(matches!(err, Error::Interceptor(_)));
        assert!(dispatcher.seen().is_empty());
    }

    #[tokio::test]
    async fn test_request_rejection_recovered_downstream() {
        // The recovering interceptor is registered first, so it runs
        // *after* the failing one (reverse registration order) and its
        // rejected handler gets the error.
        let dispatcher = MockDispatcher::new();
        let client = client_with(Arc::clone(&dispatcher));

        client.interceptors().request.use_interceptor(request_fn_with_rejected(
            |config| async move { Ok(config) },
            |_error| async move {
                Ok(RequestConfig::new().url("https://mock.invalid/recovered"))
            },
        ));
        client
            .interceptors()
            .request
            .use_interceptor(request_fn(|_config| async move {
                Err(Error::Interceptor("boom".into()))
            }));

        client.request("https://mock.invalid/original").await.unwrap();
        let seen = dispatcher.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url.as_deref(), Some("https://mock.invalid/recovered"));
    }

    #[tokio::test]
    async fn test_response_rejected_handler_recovers_dispatch_error() {
        struct FailingDispatcher;

        #[async_trait::async_trait]
        impl Dispatcher for FailingDispatcher {
            async fn dispatch(&self, _config: RequestConfig) -> Result<Response> {
                Err(Error::Connection("refused".into()))
            }
        }

        let client =
            HttpClient::with_dispatcher(RequestConfig::new(), Arc::new(FailingDispatcher));
        client.interceptors().response.use_interceptor(response_fn_with_rejected(
            |response| async move { Ok(response) },
            |_error| async move {
                Ok(Response::from_parts(
                    StatusCode::OK,
                    HeaderMap::new(),
                    url::Url::parse("https://mock.invalid/fallback").unwrap(),
                    Bytes::from_static(b"cached"),
                ))
            },
        ));

        let response = client.request("https://mock.invalid/").await.unwrap();
        assert_eq!(response.bytes().as_ref(), b"cached");
    }

    #[tokio::test]
    async fn test_detached_clone_keeps_binding() {
        let dispatcher = MockDispatcher::new();
        let client = HttpClient::with_dispatcher(
            RequestConfig::new().header("X-Origin", "parent"),
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        );

        let handle = client.clone();
        drop(client);

        let task = tokio::spawn(async move { handle.get("https://mock.invalid/", None).await });
        task.await.unwrap().unwrap();

        let seen = dispatcher.seen();
        assert_eq!(seen[0].headers, vec![("X-Origin".into(), "parent".into())]);
        assert_eq!(seen[0].method.as_deref(), Some("get"));
    }

    #[tokio::test]
    async fn test_defaults_mutation_observed_by_later_calls() {
        let dispatcher = MockDispatcher::new();
        let client = client_with(Arc::clone(&dispatcher));

        client.request("https://mock.invalid/").await.unwrap();
        client.update_defaults(|d| d.header("X-Tenant", "acme"));
        client.request("https://mock.invalid/").await.unwrap();

        let seen = dispatcher.seen();
        assert!(seen[0].headers.is_empty());
        assert_eq!(seen[1].headers, vec![("X-Tenant".into(), "acme".into())]);
    }

    #[tokio::test]
    async fn test_create_produces_independent_clients() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = MockDispatcher::with_log(Arc::clone(&log));
        let parent = HttpClient::with_dispatcher(
            RequestConfig::new().base_url("https://parent.invalid"),
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        );

        let child = parent.create(RequestConfig::new().header("X-Child", "1"));

        // Child defaults are the merge of parent defaults and overrides.
        assert_eq!(child.defaults().base_url.as_deref(), Some("https://parent.invalid"));
        assert_eq!(child.defaults().headers, vec![("X-Child".into(), "1".into())]);

        // Later registrations and default mutations do not cross over.
        parent.interceptors().request.use_interceptor(log_request(&log, "parent-only"));
        child.update_defaults(|d| d.header("X-Later", "child"));

        child.request("/x").await.unwrap();
        assert_eq!(*log.lock(), vec!["dispatch"]);
        assert!(parent.defaults().headers.is_empty());

        parent.request("/y").await.unwrap();
        assert_eq!(*log.lock(), vec!["dispatch", "parent-only", "dispatch"]);
    }

    #[tokio::test]
    async fn test_verb_aliases_inject_method_url_and_data() {
        let dispatcher = MockDispatcher::new();
        let client = client_with(Arc::clone(&dispatcher));

        client
            .post(
                "https://mock.invalid/orders",
                &serde_json::json!({"item": "widget"}),
                Some(RequestConfig::new().param("dry_run", "1")),
            )
            .await
            .unwrap();
        client
            .delete("https://mock.invalid/orders/7", None)
            .await
            .unwrap();

        let seen = dispatcher.seen();
        assert_eq!(seen[0].method.as_deref(), Some("post"));
        assert_eq!(seen[0].url.as_deref(), Some("https://mock.invalid/orders"));
        assert_eq!(seen[0].params, vec![("dry_run".into(), "1".into())]);
        let body = seen[0].data.as_ref().unwrap();
        assert_eq!(body.as_bytes().as_ref(), br#"{"item":"widget"}"#);

        assert_eq!(seen[1].method.as_deref(), Some("delete"));
    }

    #[tokio::test]
    async fn test_invalid_json_body_rejects_before_chain() {
        use std::collections::BTreeMap;

        let dispatcher = MockDispatcher::new();
        let client = client_with(Arc::clone(&dispatcher));

        // Non-string map keys cannot be represented in JSON.
        let mut bad = BTreeMap::new();
        bad.insert((1u8, 2u8), "x");

        let err = client
            .post("https://mock.invalid/", &bad, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestBuild(_)));
        assert!(dispatcher.seen().is_empty());
    }

    #[test]
    fn test_get_uri_serializes_params_without_leading_question_mark() {
        let client = HttpClient::default();
        let uri = client.get_uri(RequestConfig::new().url("/x").param("a", "1"));
        assert_eq!(uri, "/x?a=1");

        // An empty url leaves just the query, leading `?` stripped.
        let uri = client.get_uri(RequestConfig::new().param("a", "1"));
        assert_eq!(uri, "a=1");
    }

    #[test]
    fn test_get_uri_merges_defaults_and_honors_custom_serializer() {
        let client = HttpClient::new(RequestConfig::new().param("v", "2"));
        let uri = client.get_uri(
            RequestConfig::new()
                .url("/search")
                .param("q", "rust")
                .params_serializer(|params| {
                    params
                        .iter()
                        .map(|(k, v)| format!("{k}:{v}"))
                        .collect::<Vec<_>>()
                        .join(";")
                }),
        );
        assert_eq!(uri, "/search?v:2;q:rust");
    }
}
