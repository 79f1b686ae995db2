//!
//! catalog-auth storage contracts
//! ------------------------------
//! The authentication core talks to two external collaborators through the traits below:
//!
//! - a credential store (relational in production) holding user rows keyed by email, and
//! - a session store (keyed, expiring) holding one `SessionContext` per live token.
//!
//! Each method is one store round-trip and one atomic unit; the core holds no locks of its
//! own and never retries. In-memory implementations live in `users` and `kv`.
//!
//! Email uniqueness is the credential store's invariant: `insert` must refuse a duplicate
//! with `AuthError::AlreadyExists` even when a prior `exists` check said the email was free.

use std::time::Duration;

use crate::error::AuthResult;
use crate::identity::{SessionContext, User, UserId, UserRecord};

pub mod kv;
pub mod users;

pub use kv::KvStore;
pub use users::InMemoryUserStore;

pub trait CredentialStore: Send + Sync {
    /// `AuthError::NotFound` when no user has this email.
    fn find_by_email(&self, email: &str) -> AuthResult<User>;
    fn exists(&self, email: &str) -> AuthResult<bool>;
    /// Insert and return the store-assigned id.
    fn insert(&self, user: UserRecord) -> AuthResult<UserId>;
}

pub trait SessionStore: Send + Sync {
    fn put(&self, token: &str, ctx: &SessionContext, ttl: Duration) -> AuthResult<()>;
    /// Deleting an absent token succeeds.
    fn delete(&self, token: &str) -> AuthResult<()>;
    /// Absent and expired tokens both yield `AuthError::NotFound`.
    fn get(&self, token: &str) -> AuthResult<SessionContext>;
}
