use std::sync::Arc;

use apikit::ApiError;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::domain::{User, UserError, UserPatch, UserStore};

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound(_) => ApiError::NotFound(e.to_string()),
        }
    }
}

pub fn routes(store: Arc<UserStore>) -> Router {
    Router::new()
        .route(
            "/user/{id}",
            get(get_user).patch(patch_user).delete(delete_user),
        )
        .with_state(store)
}

async fn get_user(
    State(store): State<Arc<UserStore>>,
    Path(id): Path<Uuid>,
) -> Json<User> {
    tracing::debug!(%id, "fetching user");
    Json(store.get(id))
}

async fn patch_user(
    State(store): State<Arc<UserStore>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>, ApiError> {
    let user = store.patch(id, patch)?;
    Ok(Json(user))
}

async fn delete_user(
    State(store): State<Arc<UserStore>>,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    store.delete(id)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
