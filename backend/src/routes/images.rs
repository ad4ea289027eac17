use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{method_not_allowed, AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::image::MAX_UPLOAD_BYTES;
use crate::services::profile::{ProfileService, StoredImage};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/image",
        post(upload_image)
            .fallback(method_not_allowed)
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

/// Store a raw image body as the current user's profile image
async fn upload_image(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<UploadQuery>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<StoredImage>> {
    let bytes = body.map_err(|e| {
        tracing::debug!("Rejected upload body: {}", e);
        AppError::invalid(
            "file",
            "file",
            format!("image exceeds the {} byte limit", MAX_UPLOAD_BYTES),
        )
    })?;

    if bytes.is_empty() {
        return Err(AppError::invalid("file", "required", "No file was uploaded"));
    }

    let filename = query.filename.unwrap_or_else(|| "image".to_string());
    let stored =
        ProfileService::store_profile_image(&state, &user.uid, &filename, bytes.to_vec()).await?;

    tracing::info!(
        "Stored profile image for user {} ({}x{})",
        user.uid,
        stored.width,
        stored.height
    );
    Ok(Json(stored))
}
