//! Runtime configuration, read from `CATALOG_*` environment variables with built-in defaults.

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::identity::{HashParams, PasswordHasher, DEFAULT_SESSION_TTL_SECS};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub http_addr: SocketAddr,
    pub session_ttl_secs: i64,
    pub hash: HashParams,
    /// Seconds between background purges of expired sessions; 0 disables the sweeper.
    pub sweep_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 7878)),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            hash: HashParams::default(),
            sweep_interval_secs: 5,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| anyhow!("{key}={raw:?}: {e}")),
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let cfg = Self {
            http_addr: parse_or(&lookup, "CATALOG_HTTP_ADDR", d.http_addr)?,
            session_ttl_secs: parse_or(&lookup, "CATALOG_SESSION_TTL_SECS", d.session_ttl_secs)?,
            hash: HashParams {
                time_cost: parse_or(&lookup, "CATALOG_HASH_TIME_COST", d.hash.time_cost)?,
                memory_kib: parse_or(&lookup, "CATALOG_HASH_MEMORY_KIB", d.hash.memory_kib)?,
                parallelism: parse_or(&lookup, "CATALOG_HASH_PARALLELISM", d.hash.parallelism)?,
                output_len: d.hash.output_len,
            },
            sweep_interval_secs: parse_or(&lookup, "CATALOG_SWEEP_INTERVAL_SECS", d.sweep_interval_secs)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_ttl_secs <= 0 {
            bail!("session_ttl_secs must be positive, got {}", self.session_ttl_secs);
        }
        let ttl = self.session_ttl()?;
        if chrono::Utc::now().checked_add_signed(ttl).is_none() {
            bail!("session_ttl_secs={} puts session expiry past the representable date range", self.session_ttl_secs);
        }
        PasswordHasher::new(self.hash).context("hash parameters")?;
        Ok(())
    }

    pub fn session_ttl(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_seconds(self.session_ttl_secs)
            .ok_or_else(|| anyhow!("session_ttl_secs={} is out of range", self.session_ttl_secs))
    }
}
