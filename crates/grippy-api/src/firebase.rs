use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const IDENTITY_API_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_API_BASE: &str = "https://securetoken.googleapis.com/v1";

#[derive(Error, Debug)]
pub enum FirebaseError {
    /// Credential or account problem, message is what Firebase sent back
    #[error("{0}")]
    Auth(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FirebaseError>;

/// Pull `error.message` out of a Google API error body
pub fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}

pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static("Grippy/0.1.0"),
    );

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

/// Tokens returned by a successful sign-in or sign-up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub local_id: String,
    #[serde(default)]
    pub email: String,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Seconds, sent as a string
    #[serde(default)]
    pub expires_in: String,
}

impl AuthTokens {
    pub fn expires_in_secs(&self) -> u64 {
        self.expires_in.parse().unwrap_or(3600)
    }
}

/// Secure Token API response; unlike sign-in this one is snake_case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshedTokens {
    pub user_id: String,
    pub id_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: String,
}

impl RefreshedTokens {
    pub fn expires_in_secs(&self) -> u64 {
        self.expires_in.parse().unwrap_or(3600)
    }
}

/// Email/password accounts via the Identity Toolkit REST API, plus ID token
/// refresh via the Secure Token API
pub struct IdentityClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    token_url: String,
}

impl IdentityClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_urls(
            api_key,
            IDENTITY_API_BASE.to_string(),
            SECURE_TOKEN_API_BASE.to_string(),
        )
    }

    /// For the auth emulator, which serves both APIs under one host
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let token_url = match base_url.strip_suffix("/identitytoolkit.googleapis.com/v1") {
            Some(host) => format!("{}/securetoken.googleapis.com/v1", host),
            None => SECURE_TOKEN_API_BASE.to_string(),
        };
        Self::with_base_urls(api_key, base_url, token_url)
    }

    pub fn with_base_urls(api_key: String, base_url: String, token_url: String) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: token_url.trim_end_matches('/').to_string(),
        })
    }

    /// Trade a refresh token for a new ID token
    pub async fn refresh_id_token(&self, refresh_token: &str) -> Result<RefreshedTokens> {
        let url = format!("{}/token", self.token_url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text).unwrap_or_else(|| format!("Status {}", status));
            return Err(FirebaseError::Auth(message));
        }

        Ok(serde_json::from_str(&text)?)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthTokens> {
        self.password_request("accounts:signUp", email, password).await
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthTokens> {
        self.password_request("accounts:signInWithPassword", email, password)
            .await
    }

    async fn password_request(&self, endpoint: &str, email: &str, password: &str) -> Result<AuthTokens> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("POST {} for {}", url, email);

        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text).unwrap_or_else(|| format!("Status {}", status));
            return Err(FirebaseError::Auth(message));
        }

        Ok(serde_json::from_str(&text)?)
    }
}
