use std::sync::Arc;

use base64::Engine;
use chrono::Duration;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::model::{Credentials, NewUser, Role, Session, SessionContext, UserId, UserRecord};
use super::password::PasswordHasher;
use crate::error::{AuthError, AuthResult};
use crate::storage::{CredentialStore, SessionStore};

pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

fn gen_token() -> AuthResult<String> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| AuthError::internal(format!("token generation failed: {e}")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Loggable, non-reversible hint of a token.
pub(crate) fn token_hint(token: &str) -> &str {
    token.get(..6).unwrap_or(token)
}

/// Login, registration, logout and session lookup over the two store contracts.
///
/// Holds no state of its own beyond handles; every operation is safe to call concurrently
/// and relies on the stores for atomicity.
#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(users: Arc<dyn CredentialStore>, sessions: Arc<dyn SessionStore>, hasher: PasswordHasher) -> Self {
        Self { users, sessions, hasher, clock: Arc::new(SystemClock), ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> { &self.clock }
    pub fn ttl(&self) -> Duration { self.ttl }

    /// Create a `User`-role account. Does not open a session.
    pub fn register(&self, user: NewUser) -> AuthResult<UserId> {
        if user.is_empty() {
            return Err(AuthError::bad_request("empty user"));
        }
        if self.users.exists(&user.email)? {
            warn!(email = %user.email, "registration for existing email");
            return Err(AuthError::AlreadyExists);
        }
        // A concurrent registration may slip in between exists() and insert(); the store's
        // uniqueness constraint turns that into AlreadyExists.
        self.provision(user, Role::User)
    }

    /// Hash and insert with an explicit role, skipping the existence pre-check.
    pub fn provision(&self, user: NewUser, role: Role) -> AuthResult<UserId> {
        let password = self.hasher.hash_new(user.password.as_bytes())?;
        let id = self.users.insert(UserRecord { email: user.email, name: user.name, password, role })?;
        debug!(id, %role, "user provisioned");
        Ok(id)
    }

    pub fn login(&self, credentials: &Credentials) -> AuthResult<(Session, UserId)> {
        let user = self.users.find_by_email(&credentials.email)?;
        if !self.hasher.verify(credentials.password.as_bytes(), &user.password) {
            warn!(user_id = user.id, "wrong password");
            return Err(AuthError::WrongCredentials);
        }

        let now = self.clock.now();
        let session = Session {
            token: gen_token()?,
            expires_at: now
                .checked_add_signed(self.ttl)
                .ok_or_else(|| AuthError::internal("session expiry past the representable date range"))?,
            user_id: user.id,
            role: user.role,
        };
        let remaining = (session.expires_at - now)
            .to_std()
            .map_err(|e| AuthError::internal(format!("session ttl out of range: {e}")))?;
        self.sessions.put(&session.token, &session.context(), remaining)?;
        debug!(user_id = user.id, token = token_hint(&session.token), expires_at = %session.expires_at, "session issued");
        Ok((session, user.id))
    }

    pub fn logout(&self, token: &str) -> AuthResult<()> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        self.sessions.delete(token)?;
        debug!(token = token_hint(token), "session revoked");
        Ok(())
    }

    /// Resolve a token to its identity. Expired and never-issued tokens are both `NotFound`;
    /// the session store alone decides expiry.
    pub fn retrieve_session_context(&self, token: &str) -> AuthResult<SessionContext> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let ctx = self.sessions.get(token)?;
        debug!(user_id = ctx.user_id, role = %ctx.role, "session resolved");
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = gen_token().unwrap();
        let b = gen_token().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn token_hint_is_a_short_prefix() {
        assert_eq!(token_hint("abcdefghij"), "abcdef");
        assert_eq!(token_hint("abc"), "abc");
    }
}
