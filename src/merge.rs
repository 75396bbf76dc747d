//! Configuration merging.
//!
//! [`merge_config`] layers a call-site configuration over a base (usually
//! the client defaults). Pure: both inputs are taken by value and a new
//! config is produced. Field strategy:
//!
//! | Fields | Strategy |
//! |---|---|
//! | `url`, `method`, `data` | request-scoped: taken from `overrides` only |
//! | `headers`, `params` | union, base entries first |
//! | `base_url`, `timeout`, `auth`, `params_serializer`, `cancel_token` | `overrides` if set, else `base` |
//!
//! Request-scoped fields describe one call, so a defaults-level value never
//! leaks into a request through the merge. Method defaulting is handled
//! separately during normalization, which consults the pre-merge defaults
//! directly.

use crate::config::RequestConfig;

/// Merge `overrides` over `base` into a new effective configuration.
pub fn merge_config(base: RequestConfig, overrides: RequestConfig) -> RequestConfig {
    let mut headers = base.headers;
    headers.extend(overrides.headers);
    let mut params = base.params;
    params.extend(overrides.params);

    RequestConfig {
        // Request-scoped: the call site alone decides these.
        url: overrides.url,
        method: overrides.method,
        data: overrides.data,
        build_error: overrides.build_error,

        headers,
        params,

        base_url: overrides.base_url.or(base.base_url),
        timeout: overrides.timeout.or(base.timeout),
        auth: overrides.auth.or(base.auth),
        params_serializer: overrides.params_serializer.or(base.params_serializer),
        cancel_token: overrides.cancel_token.or(base.cancel_token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_request_scoped_fields_never_inherited() {
        let base = RequestConfig::new()
            .url("/from-defaults")
            .method("post")
            .text("default body");
        let merged = merge_config(base, RequestConfig::new());

        assert!(merged.url.is_none());
        assert!(merged.method.is_none());
        assert!(merged.data.is_none());
    }

    #[test]
    fn test_headers_union_base_first() {
        let base = RequestConfig::new().header("X-A", "base").header("X-B", "base");
        let overrides = RequestConfig::new().header("X-A", "call");
        let merged = merge_config(base, overrides);

        assert_eq!(
            merged.headers,
            vec![
                ("X-A".into(), "base".into()),
                ("X-B".into(), "base".into()),
                ("X-A".into(), "call".into()),
            ]
        );
    }

    #[test]
    fn test_scalar_fields_override_else_base() {
        let base = RequestConfig::new()
            .base_url("https://base.example")
            .timeout(Duration::from_secs(10));
        let overrides = RequestConfig::new().timeout(Duration::from_secs(1));
        let merged = merge_config(base, overrides);

        assert_eq!(merged.base_url.as_deref(), Some("https://base.example"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_inputs_unchanged_by_value_semantics() {
        let base = RequestConfig::new().header("X-A", "base");
        let kept = base.clone();
        let _ = merge_config(base, RequestConfig::new().header("X-A", "call"));
        assert_eq!(kept.headers, vec![("X-A".to_string(), "base".to_string())]);
    }
}
