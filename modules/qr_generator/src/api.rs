use std::sync::Arc;

use apikit::ApiError;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::service::{QrError, QrRequest, QrService};

impl From<QrError> for ApiError {
    fn from(e: QrError) -> Self {
        match e {
            QrError::InvalidColor(_) | QrError::InvalidSize(_) => {
                ApiError::BadRequest(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QrParams {
    pub url: Option<String>,
    pub background_color: Option<String>,
    pub fill_color: Option<String>,
    pub size: Option<u32>,
}

#[derive(Clone)]
pub struct QrState {
    pub service: Arc<QrService>,
    pub default_url: Arc<str>,
}

pub fn routes(state: QrState) -> Router {
    Router::new()
        .route("/qr", get(get_qr).post(post_qr))
        .with_state(state)
}

async fn get_qr(State(state): State<QrState>, Query(params): Query<QrParams>) -> Result<Response, ApiError> {
    render(state, params)
}

async fn post_qr(State(state): State<QrState>, Json(params): Json<QrParams>) -> Result<Response, ApiError> {
    render(state, params)
}

fn render(state: QrState, params: QrParams) -> Result<Response, ApiError> {
    let req = QrRequest {
        data: params.url.unwrap_or_else(|| state.default_url.to_string()),
        background_color: params.background_color,
        fill_color: params.fill_color,
        size: params.size.unwrap_or(10),
    };
    tracing::debug!(data = %req.data, size = req.size, "generating QR code");
    let png = state.service.render_png(&req)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn app() -> Router {
        routes(QrState {
            service: Arc::new(QrService::new(None).unwrap()),
            default_url: Arc::from("https://example.com"),
        })
    }

    #[tokio::test]
    async fn get_returns_a_png() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .uri("/qr?url=https://example.com&size=4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn post_accepts_the_same_fields_as_json() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/qr")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r##"{"url":"https://example.com","fill_color":"#112233"}"##,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn invalid_color_is_a_400_with_json_message() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .uri("/qr?fill_color=red")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["message"].as_str().unwrap().contains("invalid color"));
    }

    #[tokio::test]
    async fn missing_url_falls_back_to_the_configured_default() {
        let resp = app()
            .oneshot(Request::builder().uri("/qr").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
