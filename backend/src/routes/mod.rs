pub mod auth;
pub mod health;
pub mod images;
pub mod profile;
pub mod social_links;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// Everything under `/api/profile`.
pub fn profile_router() -> Router<Arc<AppState>> {
    profile::router()
        .merge(images::router())
        .merge(social_links::router())
}
