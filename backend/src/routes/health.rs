use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, code) = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => ("healthy", StatusCode::OK),
        Err(e) => {
            tracing::error!("Health check database ping failed: {:?}", e);
            ("degraded", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (code, Json(response))
}
