//! HTTPS client for the hosted identity service.
//!
//! Endpoints are JSON over HTTPS: `POST /v1/auth/sign-in`,
//! `POST /v1/auth/sign-up`, `POST /v1/auth/reset`,
//! `POST /v1/auth/sign-out`. Failures map onto the [`AuthError`]
//! taxonomy; the password-reset endpoint never reveals whether the
//! account exists.

use serde::{Deserialize, Serialize};
use url::Url;

use toodo_proto::user::{Principal, UserId};

use super::{AuthClient, AuthError, Session};

/// [`AuthClient`] implementation backed by the hosted identity service.
pub struct RestAuthClient {
    /// Base URL for the auth endpoints (no trailing slash).
    base_url: String,
    http: reqwest::Client,
}

impl RestAuthClient {
    /// Create a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self, AuthError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AuthError::Internal(format!("invalid auth url {base_url}: {e}")))?;
        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/auth/{path}", self.base_url)
    }

    async fn post_credentials(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(&CredentialsBody { email, password })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(map_auth_status(status, &message));
        }

        let body: SessionResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Internal(format!("malformed session response: {e}")))?;
        Ok(Session {
            principal: Principal {
                uid: UserId::new(body.uid),
                email: body.email,
                created_at: body.created_at,
                last_sign_in: body.last_sign_in,
            },
            access_token: body.access_token,
        })
    }
}

impl AuthClient for RestAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.post_credentials("sign-in", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.post_credentials("sign-up", email, password).await
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.endpoint("reset"))
            .json(&ResetBody { email })
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        // 404 means "no such account" — not revealed to the caller.
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(map_auth_status(status, &message))
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.endpoint("sign-out"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(map_auth_status(status, &message))
    }
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ResetBody<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    uid: String,
    email: String,
    created_at: u64,
    last_sign_in: u64,
    access_token: String,
}

fn map_reqwest_error(err: reqwest::Error) -> AuthError {
    AuthError::Network(err.to_string())
}

/// Map an HTTP status from the auth endpoints to the [`AuthError`] taxonomy.
fn map_auth_status(status: reqwest::StatusCode, message: &str) -> AuthError {
    match status.as_u16() {
        400 | 401 => AuthError::InvalidCredentials,
        409 => AuthError::AccountExists,
        422 => AuthError::WeakPassword,
        _ => AuthError::Internal(format!("auth service returned {status}: {message}")),
    }
}
