use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::db::Profile;
use crate::error::{method_not_allowed, AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::profile::ProfileService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_profile).fallback(method_not_allowed))
        .route("/update", put(update_profile).fallback(method_not_allowed))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Map a body that is not JSON at all to a 400. Shape errors are reported
/// field by field once the value is decoded.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(AppError::invalid(
            "body",
            "invalid_json",
            rejection.body_text(),
        )),
    }
}

/// Current user's profile document
async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Profile>> {
    let profile = ProfileService::get_profile(&state, &user.uid).await?;
    Ok(Json(profile))
}

/// Merge the submitted fields into the current user's profile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let body = json_body(payload)?;
    ProfileService::update_profile(&state, &user.uid, &body).await?;

    Ok(Json(MessageResponse {
        message: "Profile updated successfully",
    }))
}
