//! In-memory identity service for tests and offline demo mode.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use toodo_proto::user::{Principal, UserId};

use super::{AuthClient, AuthError, Session};

/// Minimum password length the hosted service enforces.
pub const MIN_PASSWORD_LENGTH: usize = 6;

struct Account {
    password: String,
    principal: Principal,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    next_uid: u32,
    fail_sign_out: bool,
}

/// Deterministic in-process implementation of [`AuthClient`].
///
/// Accounts are seeded with [`with_account`](Self::with_account) and get
/// sequential uids (`user-1`, `user-2`, ...).
#[derive(Default)]
pub struct InMemoryAuthClient {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryAuthClient {
    /// Create an empty client with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account. Builder-style so tests read as one expression.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.insert_account(email, password);
        self
    }

    /// Make subsequent `sign_out` calls fail, for the clear-anyway policy.
    pub fn fail_sign_out(&self) {
        self.inner.lock().fail_sign_out = true;
    }

    fn insert_account(&self, email: &str, password: &str) -> Principal {
        let mut inner = self.inner.lock();
        inner.next_uid += 1;
        let now = now_ms();
        let principal = Principal {
            uid: UserId::new(format!("user-{}", inner.next_uid)),
            email: email.to_string(),
            created_at: now,
            last_sign_in: now,
        };
        inner.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                principal: principal.clone(),
            },
        );
        principal
    }
}

fn now_ms() -> u64 {
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}

fn token_for(principal: &Principal) -> String {
    format!("token-{}", principal.uid)
}

impl AuthClient for InMemoryAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let mut inner = self.inner.lock();
        let account = inner
            .accounts
            .get_mut(email)
            .ok_or(AuthError::InvalidCredentials)?;
        if account.password != password {
            return Err(AuthError::InvalidCredentials);
        }
        account.principal.last_sign_in = now_ms();
        Ok(Session {
            access_token: token_for(&account.principal),
            principal: account.principal.clone(),
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if self.inner.lock().accounts.contains_key(email) {
            return Err(AuthError::AccountExists);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }
        let principal = self.insert_account(email, password);
        Ok(Session {
            access_token: token_for(&principal),
            principal,
        })
    }

    async fn send_password_reset(&self, _email: &str) -> Result<(), AuthError> {
        // Whether the account exists is deliberately not revealed.
        Ok(())
    }

    async fn sign_out(&self, _token: &str) -> Result<(), AuthError> {
        if self.inner.lock().fail_sign_out {
            return Err(AuthError::Internal("injected sign-out failure".to_string()));
        }
        Ok(())
    }
}
