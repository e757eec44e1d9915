//! Key-value configuration storage backed by SQLite.
//!
//! Shares a database with [`SessionStore`](crate::session::SessionStore), so
//! pass the same path to both. Backend settings resolve with the precedence
//! explicit override, then stored value, then environment, then default.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;

use crate::api::rest::ApiConfig;
use crate::cart::{RefreshFailurePolicy, StoreConfig};
use crate::consts::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};

/// Backend base URL.
pub const KEY_API_URL: &str = "api_url";
/// Consumer key for basic auth.
pub const KEY_CONSUMER_KEY: &str = "consumer_key";
/// Consumer secret for basic auth.
pub const KEY_CONSUMER_SECRET: &str = "consumer_secret";
/// Request timeout in whole seconds.
pub const KEY_TIMEOUT_SECS: &str = "timeout_secs";
/// `reset` or `keep`, see [`RefreshFailurePolicy`].
pub const KEY_REFRESH_FAILURE: &str = "refresh_failure";

/// Every key `config set` accepts.
pub const KNOWN_KEYS: &[&str] = &[
    KEY_API_URL,
    KEY_CONSUMER_KEY,
    KEY_CONSUMER_SECRET,
    KEY_TIMEOUT_SECS,
    KEY_REFRESH_FAILURE,
];

pub const ENV_API_URL: &str = "STOREFRONT_API_URL";
pub const ENV_CONSUMER_KEY: &str = "STOREFRONT_CONSUMER_KEY";
pub const ENV_CONSUMER_SECRET: &str = "STOREFRONT_CONSUMER_SECRET";

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a config value (upsert). Unknown keys and malformed values are
    /// refused so a typo cannot silently fall back to a default.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        validate(key, value)?;
        self.conn().execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Resolve backend settings. `api_url` overrides whatever is stored.
    pub fn api_config(&self, api_url: Option<&str>) -> Result<ApiConfig> {
        let base_url = match api_url {
            Some(url) => url.to_string(),
            None => self
                .lookup(KEY_API_URL, ENV_API_URL)?
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        };
        let timeout = match self.get(KEY_TIMEOUT_SECS)? {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(ApiConfig {
            base_url,
            consumer_key: self.lookup(KEY_CONSUMER_KEY, ENV_CONSUMER_KEY)?,
            consumer_secret: self.lookup(KEY_CONSUMER_SECRET, ENV_CONSUMER_SECRET)?,
            timeout: Duration::from_secs(timeout),
        })
    }

    /// Resolve cart store policies.
    pub fn store_config(&self) -> Result<StoreConfig> {
        let on_refresh_failure = match self.get(KEY_REFRESH_FAILURE)? {
            Some(raw) => raw.parse()?,
            None => RefreshFailurePolicy::default(),
        };
        Ok(StoreConfig { on_refresh_failure })
    }

    /// Stored value, falling back to a non-empty environment variable.
    fn lookup(&self, key: &str, env_var: &str) -> Result<Option<String>> {
        if let Some(value) = self.get(key)? {
            return Ok(Some(value));
        }
        if let Ok(value) = std::env::var(env_var)
            && !value.is_empty()
        {
            return Ok(Some(value));
        }
        Ok(None)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate(key: &str, value: &str) -> Result<()> {
    match key {
        KEY_TIMEOUT_SECS => parse_timeout(value).map(|_| ()),
        KEY_REFRESH_FAILURE => value.parse::<RefreshFailurePolicy>().map(|_| ()),
        KEY_API_URL if !(value.starts_with("http://") || value.starts_with("https://")) => {
            bail!("api_url must start with http:// or https://")
        }
        k if KNOWN_KEYS.contains(&k) => Ok(()),
        other => bail!("unknown config key: {other}"),
    }
}

fn parse_timeout(raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => bail!("timeout_secs must be a positive integer, got {raw:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_config() -> Config {
        Config::open(":memory:").unwrap()
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let config = mem_config();
        assert!(config.get(KEY_API_URL).unwrap().is_none());
    }

    #[test]
    fn set_and_get() {
        let config = mem_config();
        config.set(KEY_API_URL, "https://shop.example/api").unwrap();
        assert_eq!(
            config.get(KEY_API_URL).unwrap().unwrap(),
            "https://shop.example/api"
        );
    }

    #[test]
    fn set_overwrites_existing() {
        let config = mem_config();
        config.set(KEY_CONSUMER_KEY, "old").unwrap();
        config.set(KEY_CONSUMER_KEY, "new").unwrap();
        assert_eq!(config.get(KEY_CONSUMER_KEY).unwrap().unwrap(), "new");
    }

    #[test]
    fn remove_deletes_key() {
        let config = mem_config();
        config.set(KEY_CONSUMER_SECRET, "shh").unwrap();
        config.remove(KEY_CONSUMER_SECRET).unwrap();
        assert!(config.get(KEY_CONSUMER_SECRET).unwrap().is_none());
    }

    #[test]
    fn remove_nonexistent_is_ok() {
        let config = mem_config();
        config.remove("nonexistent").unwrap();
    }

    #[test]
    fn set_rejects_unknown_key() {
        let config = mem_config();
        let err = config.set("colour", "blue").unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
    }

    #[test]
    fn set_rejects_bad_values() {
        let config = mem_config();
        assert!(config.set(KEY_TIMEOUT_SECS, "0").is_err());
        assert!(config.set(KEY_TIMEOUT_SECS, "soon").is_err());
        assert!(config.set(KEY_REFRESH_FAILURE, "maybe").is_err());
        assert!(config.set(KEY_API_URL, "ftp://shop").is_err());
        assert!(config.get(KEY_TIMEOUT_SECS).unwrap().is_none());
    }

    #[test]
    fn api_config_defaults() {
        let config = mem_config();
        let api = config.api_config(None).unwrap();
        assert_eq!(api.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if std::env::var(ENV_API_URL).is_err() {
            assert_eq!(api.base_url, DEFAULT_API_URL);
        }
    }

    #[test]
    fn api_config_prefers_override_then_stored() {
        let config = mem_config();
        config.set(KEY_API_URL, "https://stored.example").unwrap();
        config.set(KEY_CONSUMER_KEY, "ck").unwrap();
        config.set(KEY_CONSUMER_SECRET, "cs").unwrap();
        config.set(KEY_TIMEOUT_SECS, "5").unwrap();

        let stored = config.api_config(None).unwrap();
        assert_eq!(stored.base_url, "https://stored.example");
        assert_eq!(stored.consumer_key.as_deref(), Some("ck"));
        assert_eq!(stored.consumer_secret.as_deref(), Some("cs"));
        assert_eq!(stored.timeout, Duration::from_secs(5));

        let overridden = config.api_config(Some("http://flag.example")).unwrap();
        assert_eq!(overridden.base_url, "http://flag.example");
    }

    #[test]
    fn store_config_reads_policy() {
        let config = mem_config();
        assert_eq!(
            config.store_config().unwrap().on_refresh_failure,
            RefreshFailurePolicy::ResetToEmpty
        );
        config.set(KEY_REFRESH_FAILURE, "keep").unwrap();
        assert_eq!(
            config.store_config().unwrap().on_refresh_failure,
            RefreshFailurePolicy::KeepStale
        );
    }

    #[test]
    fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config-test.db");
        let path_str = path.to_str().unwrap();

        {
            let config = Config::open(path_str).unwrap();
            config.set(KEY_API_URL, "https://persisted.example").unwrap();
        }

        {
            let config = Config::open(path_str).unwrap();
            assert_eq!(
                config.get(KEY_API_URL).unwrap().unwrap(),
                "https://persisted.example"
            );
        }
    }
}
