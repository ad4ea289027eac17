pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod validation;

#[cfg(test)]
mod test_util;

use std::sync::Arc;

use axum::{routing::get, Router};
use http::HeaderValue;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use config::Config;
use services::{identity::IdentityVerifier, storage::ObjectStore};

/// Handles shared by every request. Built once at startup by
/// [`services::init::build_state`].
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub identity: IdentityVerifier,
    pub storage: ObjectStore,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let files = ServeDir::new(state.storage.root());

    Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        // Identity of the caller
        .nest("/api/auth", routes::auth::router())
        // Profile document, image upload and social links
        .nest("/api/profile", routes::profile_router())
        // Uploaded objects
        .nest_service("/files", files)
        .with_state(state.clone())
        .layer(axum::middleware::from_fn(
            middleware::security_headers::security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.server.frontend_url))
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::OPTIONS,
        ])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::AUTHORIZATION,
            http::header::ACCEPT,
        ]);

    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin).allow_credentials(true),
        Err(e) => {
            tracing::warn!(
                "Invalid FRONTEND_URL {:?} for CORS, cross-origin requests disabled: {}",
                frontend_url,
                e
            );
            layer
        }
    }
}
