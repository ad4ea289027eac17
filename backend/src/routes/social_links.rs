use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::db::SocialLink;
use crate::error::{method_not_allowed, AppResult};
use crate::routes::auth::AuthUser;
use crate::routes::profile::json_body;
use crate::services::profile::ProfileService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/social-links",
        get(list_links)
            .put(replace_links)
            .fallback(method_not_allowed),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinksResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub social_links: Vec<SocialLink>,
}

async fn list_links(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<SocialLinksResponse>> {
    let social_links = ProfileService::social_links(&state, &user.uid).await?;
    Ok(Json(SocialLinksResponse {
        message: None,
        social_links,
    }))
}

/// Replace the stored list with the submitted one, all or nothing
async fn replace_links(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<SocialLinksResponse>> {
    let body = json_body(payload)?;
    let social_links = ProfileService::replace_social_links(&state, &user.uid, &body).await?;

    Ok(Json(SocialLinksResponse {
        message: Some("Social links updated successfully"),
        social_links,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::db::{Platform, ProfileRepository, SocialLink};
    use crate::test_util::{read_json, TestApp};

    fn put_links(token: &str, body: &str) -> Request<Body> {
        Request::put("/api/profile/social-links")
            .header("authorization", format!("Bearer {}", token))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_links(token: &str) -> Request<Body> {
        Request::get("/api/profile/social-links")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn list_is_empty_for_a_new_user() {
        let app = TestApp::new().await;
        let token = app.token("U");

        let response = app.router().oneshot(get_links(&token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["socialLinks"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn replace_then_list() {
        let app = TestApp::new().await;
        let token = app.token("U");

        let response = app
            .router()
            .oneshot(put_links(
                &token,
                r#"[
                    {"id":"a","platform":"twitter","url":"https://twitter.com/alice"},
                    {"platform":"niconico","url":"https://www.nicovideo.jp/user/42"}
                ]"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["message"], "Social links updated successfully");

        let response = app.router().oneshot(get_links(&token)).await.unwrap();
        let body = read_json(response).await;
        let links = body["socialLinks"].as_array().unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0]["id"], "a");
        assert_eq!(links[1]["platform"], "niconico");
        assert!(!links[1]["id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_bad_element_rejects_the_whole_list() {
        let app = TestApp::new().await;
        let token = app.token("U");

        let existing = vec![SocialLink {
            id: "keep".to_string(),
            platform: Platform::Instagram,
            url: "https://instagram.com/alice".to_string(),
        }];
        ProfileRepository::replace_social_links(&app.state.db, "U", &existing)
            .await
            .unwrap();

        let response = app
            .router()
            .oneshot(put_links(
                &token,
                r#"[
                    {"id":"1","platform":"twitter","url":"https://twitter.com/alice"},
                    {"id":"2","platform":"twitter","url":"https://example.com/alice"}
                ]"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = read_json(response).await;
        assert_eq!(body["details"][0]["field"], "[1].url");
        assert_eq!(body["details"][0]["code"], "platform_mismatch");

        let stored = ProfileRepository::social_links(&app.state.db, "U")
            .await
            .unwrap();
        assert_eq!(stored, existing);
    }

    #[tokio::test]
    async fn body_must_be_an_array() {
        let app = TestApp::new().await;
        let token = app.token("U");

        let response = app
            .router()
            .oneshot(put_links(&token, r#"{"platform":"twitter"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["details"][0]["field"], "body");

        let response = app
            .router()
            .oneshot(put_links(
                &token,
                r#"[["id","twitter","https://twitter.com/alice"]]"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["details"][0]["field"], "[0]");
    }

    #[tokio::test]
    async fn missing_and_mistyped_fields_are_listed_per_element() {
        let app = TestApp::new().await;
        let token = app.token("U");

        let response = app
            .router()
            .oneshot(put_links(
                &token,
                r#"[
                    {"platform":"twitter","url":"https://twitter.com/alice"},
                    {"platform":"twitter"},
                    {"platform":"instagram","url":5}
                ]"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = read_json(response).await;
        let details = body["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["field"], "[1].url");
        assert_eq!(details[0]["code"], "required");
        assert_eq!(details[1]["field"], "[2].url");
        assert_eq!(details[1]["code"], "type");

        assert!(ProfileRepository::social_links(&app.state.db, "U")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_is_not_allowed() {
        let app = TestApp::new().await;

        let response = app
            .router()
            .oneshot(
                Request::delete("/api/profile/social-links")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn links_survive_a_profile_update() {
        let app = TestApp::new().await;
        let token = app.token("U");

        app.router()
            .oneshot(put_links(
                &token,
                r#"[{"id":"a","platform":"tiktok","url":"https://tiktok.com/@alice"}]"#,
            ))
            .await
            .unwrap();

        let response = app
            .router()
            .oneshot(
                Request::put("/api/profile/update")
                    .header("authorization", format!("Bearer {}", token))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"bio":"new bio"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.router().oneshot(get_links(&token)).await.unwrap();
        let body = read_json(response).await;
        assert_eq!(body["socialLinks"][0]["id"], "a");
    }
}
