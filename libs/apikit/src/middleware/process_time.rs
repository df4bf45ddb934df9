//! Response-time header middleware.
//!
//! Stamps every response, error paths included, with the handler's wall
//! time in seconds at a fixed decimal precision.

use std::time::Instant;

use axum::http::header::{HeaderName, HeaderValue};
use axum::{extract::Request, middleware::Next, response::Response};

pub const DEFAULT_HEADER: &str = "x-process-time";
pub const DEFAULT_PRECISION: usize = 4;

#[derive(Clone)]
pub struct ProcessTime {
    header: HeaderName,
    precision: usize,
}

impl Default for ProcessTime {
    fn default() -> Self {
        Self {
            header: HeaderName::from_static(DEFAULT_HEADER),
            precision: DEFAULT_PRECISION,
        }
    }
}

impl ProcessTime {
    /// Header names are validated here so a bad config value fails at
    /// startup, not per request.
    pub fn new(header: &str, precision: usize) -> anyhow::Result<Self> {
        let header = header
            .parse::<HeaderName>()
            .map_err(|e| anyhow::anyhow!("invalid process-time header name '{header}': {e}"))?;
        Ok(Self { header, precision })
    }
}

pub async fn process_time_middleware(cfg: ProcessTime, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut resp = next.run(req).await;
    let elapsed = started.elapsed().as_secs_f64();
    let value = format!("{elapsed:.prec$}", prec = cfg.precision);
    if let Ok(value) = HeaderValue::from_str(&value) {
        resp.headers_mut().insert(cfg.header.clone(), value);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::util::ServiceExt;

    fn app(cfg: ProcessTime) -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route(
                "/boom",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .layer(axum::middleware::from_fn(move |req, next| {
                process_time_middleware(cfg.clone(), req, next)
            }))
    }

    async fn header_value(router: Router, uri: &str) -> String {
        let resp = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        resp.headers()
            .get(DEFAULT_HEADER)
            .expect("header missing")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn header_has_configured_precision() {
        let value = header_value(app(ProcessTime::default()), "/ok").await;
        let (_, frac) = value.split_once('.').expect("no decimal point");
        assert_eq!(frac.len(), DEFAULT_PRECISION);
        assert!(value.parse::<f64>().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn header_present_on_error_responses() {
        let value = header_value(app(ProcessTime::default()), "/boom").await;
        assert!(value.parse::<f64>().is_ok());
    }

    #[tokio::test]
    async fn custom_header_name_and_precision() {
        let cfg = ProcessTime::new("x-took", 2).unwrap();
        let router = app(cfg);
        let resp = router
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let value = resp.headers().get("x-took").unwrap().to_str().unwrap();
        assert_eq!(value.split_once('.').unwrap().1.len(), 2);
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        assert!(ProcessTime::new("bad header\n", 4).is_err());
    }
}
