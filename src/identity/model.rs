use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned user identifier. Zero is never assigned and acts as the "no user" sentinel.
pub type UserId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
}

impl Role {
    /// Whether a caller holding `self` may perform an operation that requires `required`.
    pub fn satisfies(self, required: Role) -> bool {
        match (self, required) {
            (Role::Moderator, Role::User | Role::Moderator) => true,
            (Role::User, Role::User) => true,
            (Role::User, Role::Moderator) => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Moderator => f.write_str("moderator"),
        }
    }
}

/// `salt ‖ KDF(password, salt)`. Opaque outside the hasher.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordRecord(pub Vec<u8>);

impl PasswordRecord {
    pub fn as_bytes(&self) -> &[u8] { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordRecord(<{} bytes>)", self.0.len())
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

/// Registration input. Profile fields beyond `name` are accepted on the wire and dropped.
#[derive(Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl NewUser {
    pub fn is_empty(&self) -> bool {
        self.email.is_empty() && self.password.is_empty() && self.name.is_none()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials { email: self.email.clone(), password: self.password.clone() }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser").field("email", &self.email).field("name", &self.name).finish_non_exhaustive()
    }
}

/// A user row as handed to the credential store for insertion; the store assigns the id.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub email: String,
    pub name: Option<String>,
    pub password: PasswordRecord,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub password: PasswordRecord,
    pub role: Role,
}

/// One active login. Never updated in place; its lifetime is fixed at issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
    pub role: Role,
}

impl Session {
    pub fn context(&self) -> SessionContext {
        SessionContext { user_id: self.user_id, role: self.role }
    }
}

/// The only payload persisted per session, and the identity handed to downstream handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: UserId,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderator_satisfies_every_role() {
        assert!(Role::Moderator.satisfies(Role::Moderator));
        assert!(Role::Moderator.satisfies(Role::User));
        assert!(Role::User.satisfies(Role::User));
        assert!(!Role::User.satisfies(Role::Moderator));
    }

    #[test]
    fn session_context_json_shape() {
        let ctx = SessionContext { user_id: 7, role: Role::Moderator };
        let v = serde_json::to_value(ctx).unwrap();
        assert_eq!(v, serde_json::json!({"user_id": 7, "role": "moderator"}));
        let back: SessionContext = serde_json::from_value(v).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn debug_never_prints_password_material() {
        let creds = Credentials { email: "a@b.com".into(), password: "hunter2".into() };
        assert!(!format!("{creds:?}").contains("hunter2"));
        let rec = PasswordRecord(vec![1, 2, 3]);
        assert_eq!(format!("{rec:?}"), "PasswordRecord(<3 bytes>)");
    }

    #[test]
    fn new_user_ignores_unknown_profile_fields() {
        let u: NewUser = serde_json::from_str(r#"{"email":"a@b.com","password":"pw","name":"Ann","imagePath":"x.png"}"#).unwrap();
        assert_eq!(u.name.as_deref(), Some("Ann"));
        assert!(!u.is_empty());
        let empty: NewUser = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
