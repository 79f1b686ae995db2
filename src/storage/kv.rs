use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use super::SessionStore;
use crate::error::{AuthError, AuthResult};
use crate::identity::{Clock, SessionContext, SystemClock};

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    /// None means the key never expires.
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// In-memory keyed store with per-key TTL. Expiry is judged against the injected clock, so
/// an expired key is indistinguishable from a missing one on `get`.
#[derive(Clone)]
pub struct KvStore {
    map: Arc<RwLock<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl Default for KvStore {
    fn default() -> Self { Self::new(Arc::new(SystemClock)) }
}

impl KvStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { map: Arc::new(RwLock::new(HashMap::new())), clock }
    }

    /// Set a key with optional TTL, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: Vec<u8>, ttl: Option<Duration>) -> AuthResult<()> {
        let expires_at = match ttl {
            Some(d) => {
                let d = chrono::Duration::from_std(d).map_err(|e| AuthError::internal(format!("ttl out of range: {e}")))?;
                let at = self
                    .clock
                    .now()
                    .checked_add_signed(d)
                    .ok_or_else(|| AuthError::internal("ttl past the representable date range"))?;
                Some(at)
            }
            None => None,
        };
        self.map.write().insert(key.into(), Entry { value, expires_at });
        Ok(())
    }

    /// Get a key. If expired, removes it and returns None.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = self.clock.now();
        {
            let r = self.map.read();
            match r.get(key) {
                None => return None,
                Some(ent) if !ent.is_expired(now) => return Some(ent.value.clone()),
                Some(_) => {}
            }
        }
        let mut w = self.map.write();
        // Re-check under the write lock: the key may have been replaced meanwhile.
        if w.get(key).is_some_and(|ent| ent.is_expired(now)) {
            w.remove(key);
            return None;
        }
        w.get(key).map(|ent| ent.value.clone())
    }

    pub fn delete(&self, key: &str) -> bool { self.map.write().remove(key).is_some() }
    pub fn len(&self) -> usize { self.map.read().len() }
    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }

    /// Remove expired keys. Returns number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut w = self.map.write();
        let before = w.len();
        w.retain(|_, ent| !ent.is_expired(now));
        before - w.len()
    }
}

impl SessionStore for KvStore {
    fn put(&self, token: &str, ctx: &SessionContext, ttl: Duration) -> AuthResult<()> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let bytes = serde_json::to_vec(ctx).map_err(|e| AuthError::internal(format!("encode session context: {e}")))?;
        self.set(token, bytes, Some(ttl))?;
        debug!(user_id = ctx.user_id, ttl_secs = ttl.as_secs(), "session stored");
        Ok(())
    }

    fn delete(&self, token: &str) -> AuthResult<()> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let existed = KvStore::delete(self, token);
        debug!(existed, "session deleted");
        Ok(())
    }

    fn get(&self, token: &str) -> AuthResult<SessionContext> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let bytes = KvStore::get(self, token).ok_or(AuthError::NotFound)?;
        serde_json::from_slice(&bytes).map_err(|e| AuthError::internal(format!("decode session context: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ManualClock, Role};

    fn store() -> (KvStore, ManualClock) {
        let clock = ManualClock::default();
        (KvStore::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn ttl_expiry_hides_and_removes_key() {
        let (kv, clock) = store();
        kv.set("k", b"v".to_vec(), Some(Duration::from_secs(10))).unwrap();
        assert_eq!(kv.get("k").as_deref(), Some(&b"v"[..]));
        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(kv.get("k"), None);
        assert_eq!(kv.len(), 0);
    }

    #[test]
    fn keys_without_ttl_never_expire() {
        let (kv, clock) = store();
        kv.set("k", b"v".to_vec(), None).unwrap();
        clock.advance(chrono::Duration::days(365));
        assert!(kv.get("k").is_some());
    }

    #[test]
    fn ttl_past_date_range_is_an_error() {
        let (kv, _) = store();
        let err = kv.set("k", vec![1], Some(Duration::from_secs(10_000_000_000_000))).unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
        assert!(kv.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let (kv, clock) = store();
        kv.set("short", vec![1], Some(Duration::from_secs(1))).unwrap();
        kv.set("long", vec![2], Some(Duration::from_secs(100))).unwrap();
        kv.set("forever", vec![3], None).unwrap();
        clock.advance(chrono::Duration::seconds(5));
        assert_eq!(kv.sweep(), 1);
        assert_eq!(kv.len(), 2);
        assert!(kv.get("long").is_some());
    }

    #[test]
    fn session_store_round_trip_and_absence() {
        let (kv, clock) = store();
        let ctx = SessionContext { user_id: 3, role: Role::Moderator };
        SessionStore::put(&kv, "tok", &ctx, Duration::from_secs(60)).unwrap();
        assert_eq!(SessionStore::get(&kv, "tok").unwrap(), ctx);
        assert_eq!(SessionStore::get(&kv, "other"), Err(AuthError::NotFound));

        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(SessionStore::get(&kv, "tok"), Err(AuthError::NotFound));
    }

    #[test]
    fn session_store_delete_is_idempotent() {
        let (kv, _) = store();
        let ctx = SessionContext { user_id: 1, role: Role::User };
        SessionStore::put(&kv, "tok", &ctx, Duration::from_secs(60)).unwrap();
        assert!(SessionStore::delete(&kv, "tok").is_ok());
        assert!(SessionStore::delete(&kv, "tok").is_ok());
        assert_eq!(SessionStore::get(&kv, "tok"), Err(AuthError::NotFound));
    }

    #[test]
    fn session_store_rejects_empty_token() {
        let (kv, _) = store();
        let ctx = SessionContext::default();
        assert_eq!(SessionStore::put(&kv, "", &ctx, Duration::from_secs(1)), Err(AuthError::InvalidToken));
        assert_eq!(SessionStore::get(&kv, ""), Err(AuthError::InvalidToken));
        assert_eq!(SessionStore::delete(&kv, ""), Err(AuthError::InvalidToken));
    }
}
