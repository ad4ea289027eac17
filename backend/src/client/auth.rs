//! Sign-in, sign-up and password reset against the external identity
//! provider. The profile API only ever sees the ID token a [`Session`] holds.

use std::future::Future;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;
use validator::Validate;

use crate::client::{ApiClient, ClientError, ClientResult, FormState};
use crate::validation::{Credentials, PasswordReset, SignUpData, ValidationReport};

/// A signed-in user as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session>;

    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<Session>;

    /// Ask the provider to mail a reset link to `email`.
    async fn send_password_reset(&self, email: &str) -> ClientResult<()>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountBody {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl From<AccountBody> for Session {
    fn from(body: AccountBody) -> Self {
        Self {
            uid: body.local_id,
            email: body.email,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Identity Toolkit style REST provider (`accounts:signInWithPassword`,
/// `accounts:signUp`, `accounts:sendOobCode`) keyed by an API key.
#[derive(Clone)]
pub struct RestIdentityProvider {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl RestIdentityProvider {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> ClientResult<Self> {
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
            api_key: api_key.into(),
        })
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> ClientResult<reqwest::Response> {
        // "./" keeps "accounts:" from parsing as a URL scheme
        let mut url = self.base_url.join(&format!("./accounts:{}", method))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ProviderErrorBody>(&text) {
            Ok(body) => Err(ClientError::Auth(describe(&body.error.message))),
            Err(_) if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
                Err(ClientError::Auth("identity provider rejected the API key".to_string()))
            }
            Err(_) => Err(ClientError::Api {
                status: status.as_u16(),
                message: text,
            }),
        }
    }
}

/// Provider messages look like `WEAK_PASSWORD : Password should be ...`.
fn describe(message: &str) -> String {
    let code = message.split([' ', ':']).next().unwrap_or(message);
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "invalid email or password".to_string()
        }
        "EMAIL_EXISTS" => "an account with this email already exists".to_string(),
        "USER_DISABLED" => "this account has been disabled".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "too many attempts, try again later".to_string(),
        "WEAK_PASSWORD" => "password is too weak".to_string(),
        _ => message.to_string(),
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
        let response = self
            .call(
                "signInWithPassword",
                json!({"email": email, "password": password, "returnSecureToken": true}),
            )
            .await?;
        let body: AccountBody = response.json().await?;
        tracing::debug!("Signed in as {}", body.local_id);
        Ok(body.into())
    }

    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<Session> {
        let response = self
            .call(
                "signUp",
                json!({"email": email, "password": password, "returnSecureToken": true}),
            )
            .await?;
        let body: AccountBody = response.json().await?;
        tracing::debug!("Created account {}", body.local_id);
        Ok(body.into())
    }

    async fn send_password_reset(&self, email: &str) -> ClientResult<()> {
        self.call(
            "sendOobCode",
            json!({"requestType": "PASSWORD_RESET", "email": email}),
        )
        .await?;
        Ok(())
    }
}

/// Credential form shared by the sign-in, sign-up and reset flows.
/// Submission runs `Idle -> Validating -> Submitting -> Success | Error`.
#[derive(Debug)]
pub struct AuthForm<T> {
    pub data: T,
    state: FormState,
    errors: ValidationReport,
}

pub type SignInForm = AuthForm<Credentials>;
pub type SignUpForm = AuthForm<SignUpData>;
pub type PasswordResetForm = AuthForm<PasswordReset>;

impl<T: Default> Default for AuthForm<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> AuthForm<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            state: FormState::Idle,
            errors: ValidationReport::default(),
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn errors(&self) -> &ValidationReport {
        &self.errors
    }
}

impl<T: Validate + Clone> AuthForm<T> {
    async fn run<R, F, Fut>(&mut self, submit: F) -> ClientResult<R>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = ClientResult<R>>,
    {
        if self.state == FormState::Submitting {
            return Err(ClientError::Busy);
        }

        self.state = FormState::Validating;
        if let Err(errors) = self.data.validate() {
            let report = ValidationReport::from(errors);
            self.errors = report.clone();
            return self.fail(ClientError::Validation(report));
        }
        self.errors = ValidationReport::default();

        self.state = FormState::Submitting;
        match submit(self.data.clone()).await {
            Ok(value) => {
                self.state = FormState::Success;
                Ok(value)
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail<R>(&mut self, err: ClientError) -> ClientResult<R> {
        tracing::debug!("Auth form submission failed: {}", err);
        self.state = FormState::Error(err.to_string());
        Err(err)
    }
}

impl AuthForm<Credentials> {
    pub async fn submit<P: IdentityProvider + ?Sized>(&mut self, provider: &P) -> ClientResult<Session> {
        self.run(|data| async move { provider.sign_in(&data.email, &data.password).await })
            .await
    }
}

impl AuthForm<SignUpData> {
    pub async fn submit<P: IdentityProvider + ?Sized>(&mut self, provider: &P) -> ClientResult<Session> {
        self.run(|data| async move { provider.sign_up(&data.email, &data.password).await })
            .await
    }
}

impl AuthForm<PasswordReset> {
    pub async fn submit<P: IdentityProvider + ?Sized>(&mut self, provider: &P) -> ClientResult<()> {
        self.run(|data| async move { provider.send_password_reset(&data.email).await })
            .await
    }
}

/// The signed-in user, if any.
#[derive(Debug, Default)]
pub struct AuthSession {
    current: Option<Session>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    pub fn sign_in(&mut self, session: Session) {
        self.current = Some(session);
    }

    pub fn sign_out(&mut self) -> Option<Session> {
        self.current.take()
    }

    /// Profile API client authenticated as the signed-in user.
    pub fn api_client(&self, base_url: &str) -> ClientResult<ApiClient> {
        let session = self.current.as_ref().ok_or(ClientError::Unauthorized)?;
        ApiClient::new(base_url, session.id_token.clone())
    }
}
