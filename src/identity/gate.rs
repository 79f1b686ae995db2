use chrono::{DateTime, Utc};
use tracing::debug;

use super::model::{Role, SessionContext};
use super::session::{token_hint, SessionManager};
use crate::error::{AuthError, AuthResult};

/// The client-held credential: the session token plus whatever expiry the carrier declares.
/// Cookies arriving on a request carry no expiry, so `expires` is usually `None` there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub token: String,
    pub expires: Option<DateTime<Utc>>,
}

impl SessionCookie {
    pub fn new(token: impl Into<String>) -> Self { Self { token: token.into(), expires: None } }

    pub fn expiring(token: impl Into<String>, expires: DateTime<Utc>) -> Self {
        Self { token: token.into(), expires: Some(expires) }
    }
}

/// Authentication only: turns a carrier into an identity or rejects. Role requirements are
/// checked afterwards by each operation through [`require_role`].
#[derive(Clone)]
pub struct AuthorizationGate {
    sessions: SessionManager,
}

impl AuthorizationGate {
    pub fn new(sessions: SessionManager) -> Self { Self { sessions } }

    pub fn authenticate(&self, carrier: Option<&SessionCookie>) -> AuthResult<SessionContext> {
        let Some(cookie) = carrier else {
            return Err(AuthError::Unauthorized);
        };
        if let Some(expires) = cookie.expires {
            if expires <= self.sessions.clock().now() {
                debug!(token = token_hint(&cookie.token), "carrier already expired");
                return Err(AuthError::Unauthorized);
            }
        }
        let ctx = self.sessions.retrieve_session_context(&cookie.token)?;
        if ctx.user_id == 0 {
            return Err(AuthError::Unauthorized);
        }
        Ok(ctx)
    }
}

/// Capability check for role-gated operations.
pub fn require_role(identity: &SessionContext, required: Role) -> AuthResult<()> {
    if identity.role.satisfies(required) {
        Ok(())
    } else {
        debug!(user_id = identity.user_id, role = %identity.role, %required, "capability denied");
        Err(AuthError::Forbidden)
    }
}
