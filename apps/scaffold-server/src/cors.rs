use anyhow::Context;
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use apikit_bootstrap::CorsConfig;

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

/// Build the CORS layer from config. A `*` entry in any list maps to the
/// permissive setting; credentials are refused alongside wildcards because
/// browsers reject that combination anyway.
pub fn cors_layer(cfg: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let any_wildcard =
        is_wildcard(&cfg.allow_origins) || is_wildcard(&cfg.allow_methods) || is_wildcard(&cfg.allow_headers);

    let mut layer = CorsLayer::new();

    layer = if is_wildcard(&cfg.allow_origins) {
        layer.allow_origin(AllowOrigin::any())
    } else {
        let origins = cfg
            .allow_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>().with_context(|| format!("invalid CORS origin '{o}'")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        layer.allow_origin(origins)
    };

    layer = if is_wildcard(&cfg.allow_methods) {
        layer.allow_methods(AllowMethods::any())
    } else {
        let methods = cfg
            .allow_methods
            .iter()
            .map(|m| m.parse::<Method>().with_context(|| format!("invalid CORS method '{m}'")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        layer.allow_methods(methods)
    };

    layer = if is_wildcard(&cfg.allow_headers) {
        layer.allow_headers(AllowHeaders::any())
    } else {
        let headers = cfg
            .allow_headers
            .iter()
            .map(|h| h.parse::<HeaderName>().with_context(|| format!("invalid CORS header '{h}'")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        layer.allow_headers(headers)
    };

    if cfg.allow_credentials {
        if any_wildcard {
            tracing::warn!("cors.allow_credentials ignored: wildcard origins/methods/headers in use");
        } else {
            layer = layer.allow_credentials(true);
        }
    }

    Ok(layer)
}
