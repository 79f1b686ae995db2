//! Salted Argon2id password records.
//!
//! A record is `salt ‖ Argon2id(password, salt)` with an 8-byte salt. The algorithm and version
//! are fixed; only the cost parameters are tunable through [`HashParams`].

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use super::model::PasswordRecord;
use crate::error::{AuthError, AuthResult};

pub const SALT_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashParams {
    pub time_cost: u32,
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub parallelism: u32,
    pub output_len: usize,
}

impl Default for HashParams {
    fn default() -> Self {
        Self { time_cost: 1, memory_kib: 64 * 1024, parallelism: 4, output_len: 32 }
    }
}

impl HashParams {
    /// Cheap parameters for tests that do not exercise the cost settings themselves.
    pub fn for_testing() -> Self {
        Self { time_cost: 1, memory_kib: 256, parallelism: 4, output_len: 32 }
    }

    fn to_argon2(self) -> AuthResult<Params> {
        Params::new(self.memory_kib, self.time_cost, self.parallelism, Some(self.output_len))
            .map_err(|e| AuthError::internal(format!("invalid argon2 parameters: {e}")))
    }
}

#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    params: HashParams,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").field("params", &self.params).finish()
    }
}

impl PasswordHasher {
    pub fn new(params: HashParams) -> AuthResult<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
        Ok(Self { argon2, params })
    }

    pub fn params(&self) -> HashParams { self.params }

    /// Fresh salt from the OS CSPRNG.
    pub fn generate_salt() -> AuthResult<[u8; SALT_LEN]> {
        let mut salt = [0u8; SALT_LEN];
        getrandom::getrandom(&mut salt).map_err(|e| AuthError::internal(format!("salt generation failed: {e}")))?;
        Ok(salt)
    }

    /// Derive `salt ‖ key`. Only fails if the salt length is outside what Argon2 accepts.
    pub fn hash(&self, password: &[u8], salt: &[u8]) -> AuthResult<PasswordRecord> {
        let mut out = Vec::with_capacity(salt.len() + self.params.output_len);
        out.extend_from_slice(salt);
        out.resize(salt.len() + self.params.output_len, 0);
        self.argon2
            .hash_password_into(password, salt, &mut out[salt.len()..])
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;
        Ok(PasswordRecord(out))
    }

    /// Hash with a freshly generated salt.
    pub fn hash_new(&self, password: &[u8]) -> AuthResult<PasswordRecord> {
        let salt = Self::generate_salt()?;
        self.hash(password, &salt)
    }

    /// Re-derive from the record's salt prefix and compare in constant time.
    pub fn verify(&self, password: &[u8], stored: &PasswordRecord) -> bool {
        let stored = stored.as_bytes();
        if stored.len() <= SALT_LEN {
            tracing::error!(len = stored.len(), "malformed password record");
            return false;
        }
        let (salt, _) = stored.split_at(SALT_LEN);
        match self.hash(password, salt) {
            Ok(candidate) => constant_time_eq(candidate.as_bytes(), stored),
            Err(e) => {
                tracing::error!(error = %e, "password verification could not hash");
                false
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher { PasswordHasher::new(HashParams::for_testing()).unwrap() }

    #[test]
    fn verify_accepts_own_hash() {
        let h = hasher();
        for pw in ["pw", "", "correct horse battery staple", "пароль"] {
            let salt = PasswordHasher::generate_salt().unwrap();
            let rec = h.hash(pw.as_bytes(), &salt).unwrap();
            assert!(h.verify(pw.as_bytes(), &rec), "password {pw:?} should verify");
        }
    }

    #[test]
    fn verify_rejects_other_password() {
        let h = hasher();
        let rec = h.hash_new(b"pw").unwrap();
        assert!(!h.verify(b"pw2", &rec));
        assert!(!h.verify(b"", &rec));
    }

    #[test]
    fn record_layout_is_salt_then_key() {
        let h = hasher();
        let salt = [7u8; SALT_LEN];
        let rec = h.hash(b"pw", &salt).unwrap();
        assert_eq!(rec.as_bytes().len(), SALT_LEN + 32);
        assert_eq!(&rec.as_bytes()[..SALT_LEN], &salt);
        // Deterministic for a fixed salt.
        assert_eq!(rec, h.hash(b"pw", &salt).unwrap());
    }

    #[test]
    fn fresh_salts_give_distinct_records() {
        let h = hasher();
        let a = h.hash_new(b"same").unwrap();
        let b = h.hash_new(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn truncated_record_never_verifies() {
        let h = hasher();
        assert!(!h.verify(b"pw", &PasswordRecord(vec![1, 2, 3])));
        assert!(!h.verify(b"pw", &PasswordRecord(Vec::new())));
    }

    #[test]
    fn default_params_match_reference_costs() {
        let p = HashParams::default();
        assert_eq!((p.time_cost, p.memory_kib, p.parallelism, p.output_len), (1, 65536, 4, 32));
        assert!(PasswordHasher::new(p).is_ok());
    }

    #[test]
    fn rejects_params_argon2_refuses() {
        let bad = HashParams { memory_kib: 1, ..HashParams::for_testing() };
        assert!(matches!(PasswordHasher::new(bad), Err(AuthError::Internal(_))));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
    }
}
