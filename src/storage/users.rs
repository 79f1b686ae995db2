use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::CredentialStore;
use crate::error::{AuthError, AuthResult};
use crate::identity::{Role, User, UserId, UserRecord};

#[derive(Default)]
struct UserTable {
    last_id: UserId,
    by_email: HashMap<String, User>,
}

/// Credential store kept in process memory. Email uniqueness is enforced inside `insert`
/// under a single write lock, mirroring a unique constraint on a relational table.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    inner: Arc<RwLock<UserTable>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.inner.read().by_email.len() }
    pub fn is_empty(&self) -> bool { self.inner.read().by_email.is_empty() }

    /// Out-of-band role change, as an administrator would do directly against the table.
    /// Sessions already issued keep the role they captured at login.
    pub fn set_role(&self, id: UserId, role: Role) -> AuthResult<()> {
        let mut w = self.inner.write();
        let user = w.by_email.values_mut().find(|u| u.id == id).ok_or(AuthError::NotFound)?;
        user.role = role;
        Ok(())
    }
}

impl CredentialStore for InMemoryUserStore {
    fn find_by_email(&self, email: &str) -> AuthResult<User> {
        let found = self.inner.read().by_email.get(email).cloned();
        match found {
            Some(u) => Ok(u),
            None => {
                debug!(email, "user lookup missed");
                Err(AuthError::NotFound)
            }
        }
    }

    fn exists(&self, email: &str) -> AuthResult<bool> {
        Ok(self.inner.read().by_email.contains_key(email))
    }

    fn insert(&self, user: UserRecord) -> AuthResult<UserId> {
        if user.email.is_empty() || user.password.is_empty() {
            return Err(AuthError::bad_request("email and password are required"));
        }
        let mut w = self.inner.write();
        if w.by_email.contains_key(&user.email) {
            return Err(AuthError::AlreadyExists);
        }
        w.last_id += 1;
        let id = w.last_id;
        let UserRecord { email, name, password, role } = user;
        w.by_email.insert(email.clone(), User { id, email, name, password, role });
        debug!(id, "user inserted");
        Ok(id)
    }
}
