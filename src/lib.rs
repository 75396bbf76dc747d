//! # Courier HTTP
//!
//! A config-driven HTTP client: every call is described by a
//! [`RequestConfig`], merged over the client's defaults and run through a
//! user-extensible interceptor pipeline before a pluggable [`Dispatcher`]
//! performs the actual transport I/O.
//!
//! ## Features
//!
//! - **Single call surface**: `request(config)`, URL shorthand, and per-verb
//!   aliases all collapse to one pipeline
//! - **Interceptors**: ordered, ejectable request/response handler pairs
//!   with well-defined ordering and error propagation
//! - **Config merging**: per-call configs layered over instance defaults
//!   with a documented field strategy
//! - **Pluggable dispatch**: swap the bundled reqwest adapter for anything
//!   implementing [`Dispatcher`]
//! - **Cooperative cancellation**: a [`CancelToken`] carried by the config
//!   and honored at the dispatch boundary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_http::{HttpClient, RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> courier_http::Result<()> {
//!     let client = HttpClient::new(
//!         RequestConfig::new().base_url("https://api.example.com"),
//!     );
//!
//!     let response = client.get("/users", None).await?;
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## With Interceptors
//!
//! ```rust,no_run
//! use courier_http::{interceptor, HttpClient, RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> courier_http::Result<()> {
//!     let client = HttpClient::new(RequestConfig::new());
//!
//!     // Request interceptors run most-recently-registered first.
//!     client.interceptors().request.use_interceptor(interceptor::request_fn(
//!         |config| async move { Ok(config.header("X-Trace", "abc")) },
//!     ));
//!
//!     // Response interceptors run in registration order.
//!     client.interceptors().response.use_interceptor(interceptor::response_fn(
//!         |response| async move { response.error_for_status() },
//!     ));
//!
//!     let response = client
//!         .post("https://api.example.com/orders",
//!               &serde_json::json!({"item": "widget", "quantity": 5}),
//!               None)
//!         .await?;
//!
//!     println!("Created: {}", response.status());
//!     Ok(())
//! }
//! ```

mod cancel;
mod client;
mod config;
mod dispatch;
mod error;
pub mod interceptor;
mod merge;
mod response;

pub use cancel::{CancelToken, Canceler};
pub use client::HttpClient;
pub use config::{BasicAuth, Body, ParamsSerializer, RequestArgs, RequestConfig};
pub use dispatch::{Dispatcher, ReqwestDispatcher};
pub use error::{Error, Result};
pub use interceptor::{
    InterceptorId, InterceptorManager, Interceptors, RequestInterceptor, ResponseInterceptor,
};
pub use merge::merge_config;
pub use response::Response;

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use courier_http::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cancel::{CancelToken, Canceler};
    pub use crate::client::HttpClient;
    pub use crate::config::{BasicAuth, Body, RequestArgs, RequestConfig};
    pub use crate::dispatch::{Dispatcher, ReqwestDispatcher};
    pub use crate::error::{Error, Result};
    pub use crate::interceptor::{
        InterceptorId, Interceptors, RequestInterceptor, ResponseInterceptor,
    };
    pub use crate::merge::merge_config;
    pub use crate::response::Response;
    pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
}
