//! Auth session handling for `TooDo`.
//!
//! [`AuthSession`] wraps an [`AuthClient`] (the hosted identity service or
//! an in-memory fake) and exposes the current [`Principal`] as an
//! observable value: `subscribe()` hands out a `tokio::sync::watch`
//! receiver whose current value is readable immediately, followed by every
//! sign-in / sign-out transition.
//!
//! Sign-out clears the local session unconditionally — a backend failure
//! is logged and still returned to the caller, but the observer always
//! transitions to `None`.

pub mod memory;
pub mod remote;

use parking_lot::RwLock;
use tokio::sync::watch;

use toodo_proto::user::Principal;

/// Errors surfaced by the identity service.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// The email/password pair was rejected.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    AccountExists,
    /// The password does not meet the service's minimum requirements.
    #[error("password does not meet the minimum requirements")]
    WeakPassword,
    /// The service could not be reached.
    #[error("network error: {0}")]
    Network(String),
    /// Any other failure in the identity service.
    #[error("auth service error: {0}")]
    Internal(String),
}

/// A successful authentication: the principal plus the access token the
/// document store expects.
#[derive(Debug, Clone)]
pub struct Session {
    /// The authenticated account.
    pub principal: Principal,
    /// Opaque bearer token for the document store and sign-out call.
    pub access_token: String,
}

/// The operations the hosted identity service is consumed through.
pub trait AuthClient: Send + Sync {
    /// Sign in with email and password.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Session, AuthError>> + Send;

    /// Create an account and sign it in.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Session, AuthError>> + Send;

    /// Ask the service to email a password-reset link. Whether the account
    /// exists is not revealed to the caller.
    fn send_password_reset(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<(), AuthError>> + Send;

    /// Invalidate the session server-side.
    fn sign_out(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<(), AuthError>> + Send;
}

/// Owns the auth client and the observable sign-in state.
pub struct AuthSession<A: AuthClient> {
    client: A,
    state: watch::Sender<Option<Principal>>,
    token: RwLock<Option<String>>,
}

impl<A: AuthClient> AuthSession<A> {
    /// Create a signed-out session around the given client.
    pub fn new(client: A) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            client,
            state,
            token: RwLock::new(None),
        }
    }

    /// The current principal, if signed in.
    #[must_use]
    pub fn current(&self) -> Option<Principal> {
        self.state.borrow().clone()
    }

    /// Subscribe to sign-in state. The current value is readable
    /// immediately via `borrow()`; `changed()` resolves on transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.state.subscribe()
    }

    /// The access token of the current session, if signed in.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Sign in and publish the new principal to observers.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] from the client; the observed state is
    /// unchanged on failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let session = self.client.sign_in(email, password).await?;
        self.install(session)
    }

    /// Create an account, sign it in, and publish the new principal.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] from the client; the observed state is
    /// unchanged on failure.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let session = self.client.sign_up(email, password).await?;
        self.install(session)
    }

    /// Ask the service to email a password-reset link.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] from the client.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.client.send_password_reset(email).await
    }

    /// Sign out. The server call may fail; local session state is cleared
    /// and the `None` transition published regardless, and the error is
    /// still returned. No retry.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] from the server-side invalidation.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.token.write().take();
        let result = match token {
            Some(token) => self.client.sign_out(&token).await,
            None => Ok(()),
        };
        self.state.send_replace(None);
        if let Err(ref e) = result {
            tracing::warn!(error = %e, "sign-out failed; local session cleared anyway");
        }
        result
    }

    fn install(&self, session: Session) -> Result<Principal, AuthError> {
        *self.token.write() = Some(session.access_token);
        let principal = session.principal.clone();
        self.state.send_replace(Some(session.principal));
        Ok(principal)
    }
}
