use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
    routing::get,
    Json, Router,
};

use crate::error::{method_not_allowed, AppError};
use crate::services::identity::VerifiedIdentity;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me).fallback(method_not_allowed))
}

/// Identity behind the bearer token of the current request
async fn me(AuthUser(identity): AuthUser) -> Json<VerifiedIdentity> {
    Json(identity)
}

/// Token from an `Authorization: Bearer <token>` header, if there is one.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;

    if value.len() < 7 || !value[..7].eq_ignore_ascii_case("bearer ") {
        return None;
    }

    let token = value[7..].trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

// ============================================================================
// Auth Extractor
// ============================================================================

/// Extractor for the authenticated user. The user id it carries comes from
/// the verified token only, never from the request body.
pub struct AuthUser(pub VerifiedIdentity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            tracing::debug!("Missing or malformed bearer token");
            AppError::Unauthorized
        })?;

        let identity = state.identity.verify(token).map_err(|e| {
            tracing::debug!("Token verification failed: {:?}", e);
            e
        })?;

        tracing::debug!("Authenticated user: {}", identity.uid);
        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::test_util::{read_json, TestApp};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn me_returns_verified_identity() {
        let app = TestApp::new().await;
        let token = app.token("user-1");

        let response = app
            .router()
            .oneshot(
                Request::get("/api/auth/me")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["uid"], "user-1");
    }

    #[tokio::test]
    async fn me_requires_a_valid_token() {
        let app = TestApp::new().await;

        let response = app
            .router()
            .oneshot(
                Request::get("/api/auth/me")
                    .header("authorization", "Bearer forged")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
