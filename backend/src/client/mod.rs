//! Client side of the profile editor: the HTTP API client plus the form,
//! image upload and social link helpers that drive it, and the sign-in flows
//! that produce its token.
//!
//! Input is validated here with the same schemas the server uses, so most
//! errors are reported before any request is sent.

pub mod auth;
pub mod error;
pub mod form;
pub mod image_upload;
pub mod social_links;

pub use auth::{
    AuthForm, AuthSession, IdentityProvider, PasswordResetForm, RestIdentityProvider, Session,
    SignInForm, SignUpForm,
};
pub use error::{ClientError, ClientResult};
pub use form::{FormState, ProfileForm};
pub use image_upload::{ImageUploader, UploadedImage};
pub use social_links::SocialLinksManager;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::db::{Profile, SocialLink};
use crate::validation::{ProfileUpdate, SocialLinkInput, ValidationReport};

/// Operations the editor needs from the profile API.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// `None` when the user has not saved a profile yet.
    async fn get_profile(&self) -> ClientResult<Option<Profile>>;

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<()>;

    async fn get_social_links(&self) -> ClientResult<Vec<SocialLink>>;

    /// Replace the stored list; returns it as stored, with ids assigned.
    async fn put_social_links(&self, links: &[SocialLinkInput]) -> ClientResult<Vec<SocialLink>>;

    async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> ClientResult<UploadedImage>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
    #[serde(default)]
    details: ValidationReport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocialLinksBody {
    social_links: Vec<SocialLink>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

/// `reqwest` implementation of [`ProfileApi`] authenticated with a bearer token.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> ClientResult<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("profilectl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn me(&self) -> ClientResult<Identity> {
        let response = self
            .http
            .get(self.url("api/auth/me")?)
            .bearer_auth(&self.token)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }
}

/// Turn a non-success response into the matching [`ClientError`].
async fn check(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: Option<ErrorBody> = serde_json::from_str(&text).ok();

    match (status, body) {
        (StatusCode::UNAUTHORIZED, _) => Err(ClientError::Unauthorized),
        (StatusCode::BAD_REQUEST, Some(body)) if body.code == "IMAGE_DECODE_ERROR" => {
            Err(ClientError::ImageDecode(body.error))
        }
        (StatusCode::BAD_REQUEST, Some(body)) if !body.details.is_empty() => {
            Err(ClientError::Validation(body.details))
        }
        (status, Some(body)) => Err(ClientError::Api {
            status: status.as_u16(),
            message: body.error,
        }),
        (status, None) => Err(ClientError::Api {
            status: status.as_u16(),
            message: text,
        }),
    }
}

#[async_trait]
impl ProfileApi for ApiClient {
    async fn get_profile(&self) -> ClientResult<Option<Profile>> {
        let response = self
            .http
            .get(self.url("api/profile")?)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<()> {
        let response = self
            .http
            .put(self.url("api/profile/update")?)
            .bearer_auth(&self.token)
            .json(update)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn get_social_links(&self) -> ClientResult<Vec<SocialLink>> {
        let response = self
            .http
            .get(self.url("api/profile/social-links")?)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let body: SocialLinksBody = check(response).await?.json().await?;
        Ok(body.social_links)
    }

    async fn put_social_links(&self, links: &[SocialLinkInput]) -> ClientResult<Vec<SocialLink>> {
        let response = self
            .http
            .put(self.url("api/profile/social-links")?)
            .bearer_auth(&self.token)
            .json(links)
            .send()
            .await?;

        let body: SocialLinksBody = check(response).await?.json().await?;
        Ok(body.social_links)
    }

    async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> ClientResult<UploadedImage> {
        let mut url = self.url("api/profile/image")?;
        url.query_pairs_mut().append_pair("filename", filename);

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;

        match check(response).await {
            Ok(response) => response
                .json()
                .await
                .map_err(|e| ClientError::Upload(e.to_string())),
            Err(ClientError::Api { status, message }) => {
                Err(ClientError::Upload(format!("{} ({})", message, status)))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;

    use super::*;

    /// In-process stand-in for the profile API that records every call.
    #[derive(Default)]
    pub struct MockApi {
        pub profile: Mutex<Option<Profile>>,
        pub links: Mutex<Vec<SocialLink>>,
        pub updates: Mutex<Vec<ProfileUpdate>>,
        pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
        pub fail_uploads: bool,
        pub fail_updates: bool,
        /// `update_profile` never completes when set.
        pub hang_updates: bool,
    }

    #[async_trait]
    impl ProfileApi for MockApi {
        async fn get_profile(&self) -> ClientResult<Option<Profile>> {
            Ok(self.profile.lock().unwrap().clone())
        }

        async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<()> {
            if self.hang_updates {
                std::future::pending::<()>().await;
            }
            if self.fail_updates {
                return Err(ClientError::Api {
                    status: 500,
                    message: "profile store unavailable".to_string(),
                });
            }
            self.updates.lock().unwrap().push(update.clone());
            Ok(())
        }

        async fn get_social_links(&self) -> ClientResult<Vec<SocialLink>> {
            Ok(self.links.lock().unwrap().clone())
        }

        async fn put_social_links(
            &self,
            links: &[SocialLinkInput],
        ) -> ClientResult<Vec<SocialLink>> {
            let links = crate::validation::validate_social_links(links.to_vec())?;
            *self.links.lock().unwrap() = links.clone();
            Ok(links)
        }

        async fn upload_image(
            &self,
            filename: &str,
            bytes: Vec<u8>,
        ) -> ClientResult<UploadedImage> {
            if self.fail_uploads {
                return Err(ClientError::Upload("store unavailable".to_string()));
            }
            let image = image::load_from_memory(&bytes)
                .map_err(|e| ClientError::ImageDecode(e.to_string()))?;
            self.uploads
                .lock()
                .unwrap()
                .push((filename.to_string(), bytes));
            Ok(UploadedImage {
                url: format!("https://cdn.example.com/profile-images/{}", filename),
                width: image.width(),
                height: image.height(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestApp;

    async fn serve(app: &TestApp) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app.router();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn talks_to_a_running_server() {
        let app = TestApp::new().await;
        let base = serve(&app).await;
        let client = ApiClient::new(&base, app.token("U")).unwrap();

        assert_eq!(client.me().await.unwrap().uid, "U");
        assert!(client.get_profile().await.unwrap().is_none());

        client
            .update_profile(&ProfileUpdate {
                display_name: Some("Alice".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let profile = client.get_profile().await.unwrap().unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));

        let links = client
            .put_social_links(&[SocialLinkInput {
                id: None,
                platform: "twitter".to_string(),
                url: "https://twitter.com/alice".to_string(),
            }])
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(client.get_social_links().await.unwrap(), links);
    }

    #[tokio::test]
    async fn server_errors_are_mapped() {
        let app = TestApp::new().await;
        let base = serve(&app).await;

        let anonymous = ApiClient::new(&base, "bogus").unwrap();
        assert!(matches!(
            anonymous.get_social_links().await,
            Err(ClientError::Unauthorized)
        ));

        let client = ApiClient::new(&base, app.token("U")).unwrap();
        let err = client
            .update_profile(&ProfileUpdate {
                contact_email: Some("nope".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.report().unwrap().has_field("contactEmail"));

        let err = client
            .upload_image("x.png", b"not an image".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ImageDecode(_)));
    }
}
