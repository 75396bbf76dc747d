//! Request and response interceptors.
//!
//! An interceptor is a `(fulfilled, rejected)` handler pair. Request-side
//! interceptors observe or transform the effective [`RequestConfig`] before
//! dispatch; response-side interceptors do the same for the [`Response`]
//! after dispatch. A `rejected` handler may recover (return `Ok`) or
//! re-raise; the defaults pass the value or error through untouched.
//!
//! Registration order matters: request-side interceptors run in *reverse*
//! registration order, response-side interceptors in registration order.
//! See [`HttpClient::request`](crate::HttpClient::request).

use crate::{Error, RequestConfig, Response, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

/// Interceptor over the pre-dispatch request configuration.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Observe or transform the configuration flowing toward dispatch.
    async fn fulfilled(&self, config: RequestConfig) -> Result<RequestConfig> {
        Ok(config)
    }

    /// Handle an upstream failure; return `Ok` to resume the chain.
    async fn rejected(&self, error: Error) -> Result<RequestConfig> {
        Err(error)
    }
}

/// Interceptor over the post-dispatch response.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// Observe or transform the response flowing back to the caller.
    async fn fulfilled(&self, response: Response) -> Result<Response> {
        Ok(response)
    }

    /// Handle an upstream failure; return `Ok` to recover.
    async fn rejected(&self, error: Error) -> Result<Response> {
        Err(error)
    }
}

type FulfilledFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<T>> + Send + Sync>;
type RejectedFn<T> = Arc<dyn Fn(Error) -> BoxFuture<'static, Result<T>> + Send + Sync>;

struct FnInterceptor<T> {
    fulfilled: Option<FulfilledFn<T>>,
    rejected: Option<RejectedFn<T>>,
}

#[async_trait]
impl RequestInterceptor for FnInterceptor<RequestConfig> {
    async fn fulfilled(&self, config: RequestConfig) -> Result<RequestConfig> {
        match &self.fulfilled {
            Some(f) => f(config).await,
            None => Ok(config),
        }
    }

    async fn rejected(&self, error: Error) -> Result<RequestConfig> {
        match &self.rejected {
            Some(f) => f(error).await,
            None => Err(error),
        }
    }
}

#[async_trait]
impl ResponseInterceptor for FnInterceptor<Response> {
    async fn fulfilled(&self, response: Response) -> Result<Response> {
        match &self.fulfilled {
            Some(f) => f(response).await,
            None => Ok(response),
        }
    }

    async fn rejected(&self, error: Error) -> Result<Response> {
        match &self.rejected {
            Some(f) => f(error).await,
            None => Err(error),
        }
    }
}

fn boxed<T, F, Fut>(f: F) -> Arc<dyn Fn(T) -> BoxFuture<'static, Result<T>> + Send + Sync>
where
    T: 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move |value| Box::pin(f(value)))
}

/// Build a request interceptor from an async closure.
pub fn request_fn<F, Fut>(fulfilled: F) -> Arc<dyn RequestInterceptor>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RequestConfig>> + Send + 'static,
{
    Arc::new(FnInterceptor::<RequestConfig> {
        fulfilled: Some(boxed(fulfilled)),
        rejected: None,
    })
}

/// Build a request interceptor from fulfilled and rejected closures.
pub fn request_fn_with_rejected<F, Fut, R, RFut>(
    fulfilled: F,
    rejected: R,
) -> Arc<dyn RequestInterceptor>
where
    F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RequestConfig>> + Send + 'static,
    R: Fn(Error) -> RFut + Send + Sync + 'static,
    RFut: Future<Output = Result<RequestConfig>> + Send + 'static,
{
    Arc::new(FnInterceptor::<RequestConfig> {
        fulfilled: Some(boxed(fulfilled)),
        rejected: Some(Arc::new(move |error| Box::pin(rejected(error)))),
    })
}

/// Build a response interceptor from an async closure.
pub fn response_fn<F, Fut>(fulfilled: F) -> Arc<dyn ResponseInterceptor>
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    Arc::new(FnInterceptor::<Response> {
        fulfilled: Some(boxed(fulfilled)),
        rejected: None,
    })
}

/// Build a response interceptor from fulfilled and rejected closures.
pub fn response_fn_with_rejected<F, Fut, R, RFut>(
    fulfilled: F,
    rejected: R,
) -> Arc<dyn ResponseInterceptor>
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
    R: Fn(Error) -> RFut + Send + Sync + 'static,
    RFut: Future<Output = Result<Response>> + Send + 'static,
{
    Arc::new(FnInterceptor::<Response> {
        fulfilled: Some(boxed(fulfilled)),
        rejected: Some(Arc::new(move |error| Box::pin(rejected(error)))),
    })
}

/// Stable handle for ejecting a registered interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

/// Ordered, ejectable interceptor registry.
///
/// Slots are an arena indexed by [`InterceptorId`]; ejection tombstones the
/// slot rather than compacting, so ids stay stable and iteration keeps
/// registration order. Registration and ejection only affect chains
/// assembled afterwards — an in-flight call walks the snapshot it took.
pub struct InterceptorManager<I: ?Sized> {
    slots: RwLock<Vec<Option<Arc<I>>>>,
}

impl<I: ?Sized> InterceptorManager<I> {
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Register an interceptor, returning its id.
    pub fn use_interceptor(&self, interceptor: Arc<I>) -> InterceptorId {
        let mut slots = self.slots.write();
        slots.push(Some(interceptor));
        InterceptorId(slots.len() - 1)
    }

    /// Remove a registered interceptor. Unknown or already-ejected ids are
    /// a no-op.
    pub fn eject(&self, id: InterceptorId) {
        let mut slots = self.slots.write();
        if let Some(slot) = slots.get_mut(id.0) {
            *slot = None;
        }
    }

    /// Remove all registered interceptors.
    pub fn clear(&self) {
        self.slots.write().clear();
    }

    /// Visit live interceptors in registration order.
    pub fn for_each(&self, mut visitor: impl FnMut(&Arc<I>)) {
        for slot in self.slots.read().iter().flatten() {
            visitor(slot);
        }
    }

    /// Number of live interceptors.
    pub fn len(&self) -> usize {
        self.slots.read().iter().flatten().count()
    }

    /// Whether no interceptors are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live interceptors in registration order, for chain assembly.
    pub(crate) fn snapshot(&self) -> Vec<Arc<I>> {
        self.slots.read().iter().flatten().cloned().collect()
    }
}

/// The two registries owned by a client.
pub struct Interceptors {
    /// Pre-dispatch interceptors.
    pub request: InterceptorManager<dyn RequestInterceptor>,
    /// Post-dispatch interceptors.
    pub response: InterceptorManager<dyn ResponseInterceptor>,
}

impl Interceptors {
    pub(crate) fn new() -> Self {
        Self {
            request: InterceptorManager::new(),
            response: InterceptorManager::new(),
        }
    }
}
